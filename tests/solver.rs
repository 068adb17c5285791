//! Solver orchestration against a scripted backend

mod common;

use std::time::Duration;

use alloy2smt_rs::ast::{Command, Expr, Fact, Field, Module, Pos, Sig};
use alloy2smt_rs::engine::{MockSolver, SolverResponse};
use alloy2smt_rs::smt::position_label;
use alloy2smt_rs::solver::{Options, Solver};

use common::init_logging;

fn module() -> Module {
    let person = Sig::top_level("this/Person");
    let mut module = Module::new();
    module.add_sig(person.clone());
    let best_friend = Field::new(&person, "bestFriend", Expr::from(&person).one_of());
    module.add_field(best_friend.clone());
    module.add_fact_at(Fact {
        label: "noSelfFriend".to_string(),
        expr: Expr::from(&best_friend).in_set(Expr::from(&person).product(Expr::from(&person))),
        pos: Pos::new("people.als", 4, 1),
    });
    module.add_command(Command::run("show", Expr::from(&person).some()));
    module
}

#[test]
fn sat_model_becomes_an_instance() {
    init_logging();
    let mut backend = MockSolver::with_responses([SolverResponse::Sat(
        "(model
           (declare-sort Atom 0)
           (define-fun this/Person () (Set (Tuple Atom)) (union (singleton (mkTuple @uc_Atom_0)) (singleton (mkTuple @uc_Atom_1))))
           (define-fun this/Person/bestFriend () (Set (Tuple Atom Atom))
             (union (singleton (mkTuple @uc_Atom_0 @uc_Atom_1)) (singleton (mkTuple @uc_Atom_1 @uc_Atom_0)))))"
            .to_string(),
    )]);

    let solution = Solver::new(Options::default())
        .solve_with(&mut backend, &module(), Some("show"))
        .unwrap();

    let instance = solution.instance().expect("should be sat");
    assert_eq!(instance.atoms(), vec!["@uc_Atom_0", "@uc_Atom_1"]);
    assert_eq!(instance.field("this/Person", "bestFriend").unwrap().tuples.len(), 2);
    assert!(backend.scripts()[0].starts_with("(set-logic ALL)"));
}

#[test]
fn unsat_core_names_source_positions() {
    let label = position_label("people.als", 4, 1);
    let mut backend = MockSolver::with_responses([SolverResponse::Unsat(Some(format!("(|{}|)", label)))]);
    let options = Options {
        produce_unsat_cores: true,
        timeout: Some(Duration::from_secs(30)),
        ..Options::default()
    };

    let solution = Solver::new(options).solve_with(&mut backend, &module(), Some("show")).unwrap();

    assert!(solution.is_unsat());
    assert!(solution.core().unwrap().contains(&label));
    let script = &backend.scripts()[0];
    assert!(script.contains(":named |{\"filename\": \"people.als\", \"line\": 4, \"column\": 1}|"), "{}", script);
}

#[test]
fn unknown_and_timeout_are_inconclusive() {
    let mut backend = MockSolver::with_responses([SolverResponse::Unknown, SolverResponse::Timeout]);
    let solver = Solver::new(Options::default());
    assert!(solver.solve_with(&mut backend, &module(), None).unwrap().is_unknown());
    assert!(solver.solve_with(&mut backend, &module(), None).unwrap().is_unknown());
    assert_eq!(backend.scripts().len(), 2);
    assert_eq!(backend.scripts()[0], backend.scripts()[1]);
}
