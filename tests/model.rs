//! Reading solver models back

mod common;

use alloy2smt_rs::ast::{Expr, Field, Module, Sig};
use alloy2smt_rs::engine::evaluator::{set_elements, tuple_atoms, Scope};
use alloy2smt_rs::instance::Instance;
use alloy2smt_rs::parser::{parse_check_sat, parse_model, parse_unsat_core, parse_values, CheckSat};
use alloy2smt_rs::smt::{Expression, Sort};
use alloy2smt_rs::translator::{Options, Translator};
use alloy2smt_rs::{Error, ErrorCategory};

use common::init_logging;

const CVC4_MODEL: &str = r#"
(model
; cardinality of Atom is 2
(declare-sort Atom 0)
; rep: @uc_Atom_0
; rep: @uc_Atom_1
(define-fun this/Person () (Set (Tuple Atom)) (union (singleton (mkTuple @uc_Atom_0)) (singleton (mkTuple @uc_Atom_1))))
(define-fun this/Person/likes () (Set (Tuple Atom Atom)) (singleton (mkTuple @uc_Atom_0 @uc_Atom_1)))
(define-fun |{"filename": "/tmp/a.als", "line": 3, "column": 1}| () Bool true)
)
"#;

fn people() -> (Module, Sig, Field) {
    let person = Sig::top_level("this/Person");
    let mut module = Module::new();
    module.add_sig(person.clone());
    let likes = Field::new(&person, "likes", Expr::from(&person).set_of());
    module.add_field(likes.clone());
    (module, person, likes)
}

#[test]
fn parse_and_evaluate_round_trip() {
    init_logging();
    let model = parse_model(CVC4_MODEL).unwrap();
    assert_eq!(model.functions().len(), 2, "named formulas are skipped");

    let scope = Scope::from_model(&model);
    let person = model.function("this/Person").unwrap().declaration().variable();
    let value = person.evaluate(&scope).unwrap();
    let atoms: Vec<Expression> = set_elements(&value)
        .unwrap()
        .iter()
        .flat_map(|tuple| tuple_atoms(tuple).unwrap())
        .collect();
    assert_eq!(
        atoms,
        vec![
            Expression::uninterpreted("@uc_Atom_0", Sort::atom()).unwrap(),
            Expression::uninterpreted("@uc_Atom_1", Sort::atom()).unwrap(),
        ]
    );
}

#[test]
fn instance_from_translation_and_model() {
    let (module, _, _) = people();
    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let model = parse_model(CVC4_MODEL).unwrap();
    let instance = Instance::from_model(&translation, &model).unwrap();

    assert_eq!(instance.signature("this/Person").unwrap().atoms, vec!["@uc_Atom_0", "@uc_Atom_1"]);
    assert_eq!(
        instance.field("this/Person", "likes").unwrap().tuples,
        vec![vec!["@uc_Atom_0".to_string(), "@uc_Atom_1".to_string()]]
    );
    let shown = instance.to_string();
    assert!(shown.contains("this/Person.likes = {(@uc_Atom_0, @uc_Atom_1)}"), "{}", shown);
}

#[test]
fn z3_style_constants_are_recognised() {
    let model = parse_model(
        "((define-fun this/Person () (Set (Tuple Atom)) (singleton (mkTuple Atom!val!0))))",
    )
    .unwrap();
    let scope = Scope::from_model(&model);
    let value = model.function("this/Person").unwrap().declaration().variable().evaluate(&scope).unwrap();
    assert_eq!(set_elements(&value).unwrap().len(), 1);
}

#[test]
fn malformed_models_are_rejected() {
    let (module, _, _) = people();
    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let model = parse_model(
        "(model
           (define-fun this/Person () (Set (Tuple Atom)) (singleton (mkTuple @uc_Atom_0)))
           (define-fun this/Person/likes () (Set (Tuple Atom Atom))
             (product this/Person this/Person)))",
    )
    .unwrap();
    let error = Instance::from_model(&translation, &model).unwrap_err();
    assert!(matches!(error, Error::MalformedModel(_)), "{}", error);
    assert_eq!(error.category(), ErrorCategory::Evaluation);
}

#[test]
fn parser_error_kinds() {
    assert!(matches!(
        parse_model("(model (define-fun f () Int (frobnicate 1 2)))"),
        Err(Error::UnsupportedOperator(_))
    ));
    assert!(matches!(
        parse_model("(model (define-fun f () Real 1))"),
        Err(Error::UnsupportedSort(_))
    ));
    assert!(matches!(
        parse_model("(model (define-fun f () Atom nowhere))"),
        Err(Error::UndefinedVariable(_))
    ));
    assert!(matches!(parse_model("(model (define-fun"), Err(Error::Parse(_))));
}

#[test]
fn other_replies() {
    assert_eq!(parse_check_sat("sat\n").unwrap(), CheckSat::Sat);
    assert_eq!(parse_check_sat("unknown").unwrap(), CheckSat::Unknown);
    assert!(parse_check_sat("(error \"x\")").is_err());

    let core = parse_unsat_core("(|{\"filename\": \"a.als\", \"line\": 3, \"column\": 1}| fact_2)").unwrap();
    assert_eq!(core.0.len(), 2);
    assert!(core.contains("fact_2"));

    let model = parse_model("(model (define-fun x () Int 4))").unwrap();
    let values = parse_values("((x 4) ((+ x 1) 5))", &model).unwrap();
    let x = model.function("x").unwrap().declaration().variable();
    assert_eq!(values.get(&x), Some(&Expression::int(4)));
}
