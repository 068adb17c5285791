//! End-to-end translation of small modules

mod common;

use alloy2smt_rs::ast::{Command, Decl, Expr, ExprVar, Fact, Field, FieldDecl, Func, Module, Multiplicity, Pos, Sig, SigKind};
use alloy2smt_rs::smt::{position_label, script, Expression, FunctionDeclaration, Sort, VariableDeclaration};
use alloy2smt_rs::translator::{Options, Translator};
use alloy2smt_rs::{Error, ErrorCategory};

use common::init_logging;

fn family() -> (Module, Sig, Sig, Field) {
    let person = Sig::builder("this/Person", SigKind::TopLevel).abstract_sig().build();
    let man = Sig::extending("this/Man", &person);
    let woman = Sig::extending("this/Woman", &person);
    let mut module = Module::new();
    module.add_sig(person.clone());
    module.add_sig(man.clone());
    module.add_sig(woman.clone());
    let spouse = Field::new(&person, "spouse", Expr::from(&person).lone_of());
    module.add_field(spouse.clone());
    // no p: Person | p in p.spouse
    let p = ExprVar::unary("p");
    module.add_fact(
        "noSelfMarriage",
        Expr::forall(
            vec![Decl::one_of(p.clone(), Expr::from(&person))],
            Expr::from(&p).in_set(Expr::from(&p).join(Expr::from(&spouse))).not(),
        ),
    );
    (module, person, man, spouse)
}

fn comments(module: &Module) -> Vec<String> {
    Translator::new(Options::default())
        .translate(module)
        .unwrap()
        .program()
        .assertions()
        .iter()
        .map(|a| a.comment().to_string())
        .collect()
}

#[test]
fn sort_checking_rejects_ill_sorted_terms() {
    let a = FunctionDeclaration::constant("this/A", Sort::unary_atom_relation());
    let r = FunctionDeclaration::constant("this/r", Sort::relation(vec![Sort::atom(), Sort::atom()]));

    assert!(matches!(a.variable().union(r.variable()), Err(Error::SortMismatch(_))));
    assert!(matches!(Expression::int(1).and(Expression::bool(true)), Err(Error::SortMismatch(_))));
    assert!(matches!(a.variable().closure(), Err(Error::SortMismatch(_))));
    assert!(matches!(a.variable().join(a.variable()), Err(Error::SortMismatch(_))));
    assert!(Error::SortMismatch(String::new()).category() == ErrorCategory::Definition);

    let joined = a.variable().join(r.variable()).unwrap();
    assert_eq!(joined.sort(), Sort::unary_atom_relation());
}

#[test]
fn substitution_replaces_free_occurrences_only() {
    let s = FunctionDeclaration::constant("this/S", Sort::unary_atom_relation());
    let x = VariableDeclaration::new("x", Sort::Tuple(vec![Sort::atom()]));
    let y = VariableDeclaration::new("y", Sort::Tuple(vec![Sort::atom()]));
    let free = x.variable().member(s.variable()).unwrap();
    let bound = Expression::exists(vec![x.clone()], free.clone()).unwrap();
    let both = free.clone().and(bound.clone()).unwrap();

    let replaced = both.substitute(&x, &y.variable()).unwrap();
    let expected = y.variable().member(s.variable()).unwrap().and(bound).unwrap();
    assert_eq!(replaced, expected);

    // a binder for `y` would capture the replacement
    let capturing = Expression::exists(vec![y.clone()], free.and(y.variable().member(s.variable()).unwrap()).unwrap()).unwrap();
    assert!(matches!(
        capturing.substitute(&x, &y.variable()),
        Err(Error::VariableCapture { .. })
    ));
}

#[test]
fn hierarchy_and_fields_are_constrained() {
    init_logging();
    let (module, _, _, _) = family();
    let comments = comments(&module);
    assert!(comments.iter().any(|c| c == "spouse multiplicity"));
    assert!(comments.iter().any(|c| c == "spouse subset"));
    assert!(comments.iter().any(|c| c == "noSelfMarriage"));
    assert!(comments.len() >= 6, "{:?}", comments);
}

#[test]
fn field_lowering_is_reproducible() {
    let (module, _, _, _) = family();
    let first = Translator::new(Options::default()).translate(&module).unwrap();
    let second = Translator::new(Options::default()).translate(&module).unwrap();
    assert_eq!(first.program().to_string(), second.program().to_string());
}

#[test]
fn printed_program_declares_everything_it_uses() {
    let (module, person, man, spouse) = family();
    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let text = translation.program().to_string();
    assert!(text.starts_with("(declare-sort Atom 0)\n(declare-sort UInt 0)\n"));
    assert!(text.contains("(declare-fun this/Person () (Set (Tuple Atom)))"));
    assert!(text.contains("(declare-fun this/Person/spouse () (Set (Tuple Atom Atom)))"));
    assert_eq!(translation.signature(&man).unwrap().name(), "this/Man");
    assert_eq!(translation.signature(&person).unwrap().name(), "this/Person");
    assert_eq!(translation.field(&spouse).unwrap().name(), "this/Person/spouse");
}

#[test]
fn disjoint_fields_and_commands() {
    let node = Sig::top_level("this/Node");
    let mut module = Module::new();
    module.add_sig(node.clone());
    module.add_field_decl(FieldDecl::new(&node, &["left", "right"], Expr::from(&node).lone_of()).disjoint());
    let left = module.fields().next().unwrap().clone();
    module.add_command(Command::check(
        "acyclic",
        Expr::from(&node).in_set(Expr::from(&node).join(Expr::from(&left).closure())).not(),
    ));

    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let program = translation.program();
    assert!(program.assertions().iter().any(|a| a.comment() == "left and right are disjoint"));
    assert_eq!(translation.commands().len(), 1);

    // a check negates its assertion and leaves the base program alone
    let full = translation.command_program("acyclic").unwrap();
    assert_eq!(full.assertions().len(), program.assertions().len() + 1);
    let last = full.assertions().last().unwrap();
    assert_eq!(last.comment(), "acyclic");
    assert!(last.expression().to_string().starts_with("(not "));
    assert!(full.to_string().contains("tclosure"));
}

#[test]
fn recursion_is_rejected() {
    let a = Sig::top_level("this/A");
    let loop_pred = Func::declared("this/loop", Vec::new(), Vec::new());
    let loop_pred = loop_pred
        .clone()
        .with_body(Expr::call(&loop_pred, Vec::new()).or(Expr::from(&a).some()));
    let mut module = Module::new();
    module.add_sig(a);
    module.add_function(loop_pred.clone());
    module.add_fact("loops", Expr::call(&loop_pred, Vec::new()));

    let result = Translator::new(Options::default()).translate(&module);
    assert_eq!(result.err(), Some(Error::RecursiveCall("this/loop".to_string())));
}

#[test]
fn set_quantifiers_are_bounded() {
    let a = Sig::top_level("this/A");
    let s = ExprVar::unary("s");
    let mut module = Module::new();
    module.add_sig(a.clone());
    module.add_fact(
        "someSubset",
        Expr::exists(
            vec![Decl::new(vec![s.clone()], Multiplicity::Some, Expr::from(&a))],
            Expr::from(&s).in_set(Expr::from(&a)),
        ),
    );
    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let fact = translation.program().assertions().last().unwrap();
    let text = fact.expression().to_string();
    assert!(text.starts_with("(exists ((s_"), "{}", text);
    assert!(text.contains("(subset s_"), "{}", text);
}

/// Every `:named` symbol in `text`, in order
fn named_symbols(text: &str) -> Vec<&str> {
    text.match_indices(":named ")
        .map(|(i, _)| {
            let rest = &text[i + ":named ".len()..];
            let end = rest.find("|)").map(|e| e + 1).unwrap_or(rest.len());
            &rest[..end]
        })
        .collect()
}

#[test]
fn named_formulas_are_declared_once() {
    let pos = Pos::new("a.als", 3, 5);
    let a = Sig::builder("this/A", SigKind::TopLevel)
        .multiplicity(Multiplicity::Some)
        .pos(pos.clone())
        .build();
    let mut module = Module::new();
    module.add_sig(a.clone());
    module.add_field_decl(
        FieldDecl::from_fields(vec![Field::with_pos(&a, "f", Expr::from(&a).set_of(), pos.clone())]).disjoint_values(),
    );
    for label in ["first", "second"] {
        module.add_fact_at(Fact {
            label: label.to_string(),
            expr: Expr::from(&a).some(),
            pos: pos.clone(),
        });
    }
    let mut show = Command::run("show", Expr::from(&a).some());
    show.pos = pos.clone();
    module.add_command(show);

    let translation = Translator::new(Options::default()).translate(&module).unwrap();
    let label = position_label("a.als", 3, 5);

    let base = script(translation.program(), true);
    let names = named_symbols(&base);
    assert_eq!(names, vec![format!("|{}|", label)], "{}", base);

    // signature and field constraints are derived and never named
    let named: Vec<&str> = translation
        .program()
        .assertions()
        .iter()
        .filter(|a| a.label().is_some())
        .map(|a| a.comment())
        .collect();
    assert_eq!(named, vec!["first"]);

    let full = script(&translation.command_program("show").unwrap(), true);
    assert_eq!(named_symbols(&full).len(), 1, "{}", full);
}
