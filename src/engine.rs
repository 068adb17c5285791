//! SMT solver interface
//!
//! The translator only produces SMT-LIB text. Anything that can take a script
//! ending in `(check-sat)` and answer with a model or a core plugs in through
//! [`SmtSolver`].

pub mod evaluator;
pub mod process;

pub use process::ProcessSolver;

use std::collections::VecDeque;
use std::time::Duration;

use crate::Result;

/// What a solver reported for one script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverResponse {
    /// Satisfiable, with the reply to `(get-model)`
    Sat(String),
    /// Unsatisfiable, with the reply to `(get-unsat-core)` when cores were requested
    Unsat(Option<String>),
    /// The solver gave up
    Unknown,
    /// The time limit was reached
    Timeout,
}

/// Trait for SMT solver backends
///
/// A call is blocking. Implementations own the solver process and are
/// expected to ask for the model or the unsat core themselves after
/// `(check-sat)`, returning the raw reply text.
pub trait SmtSolver {
    /// Runs `script` and reports the outcome
    fn check(&mut self, script: &str, timeout: Option<Duration>) -> Result<SolverResponse>;
}

impl<S: SmtSolver + ?Sized> SmtSolver for &mut S {
    fn check(&mut self, script: &str, timeout: Option<Duration>) -> Result<SolverResponse> {
        (**self).check(script, timeout)
    }
}

/// Mock solver for testing
///
/// Replays canned responses in order and records every script it was given.
/// Once the responses run out it answers [`SolverResponse::Unknown`].
#[derive(Debug, Default)]
pub struct MockSolver {
    responses: VecDeque<SolverResponse>,
    scripts: Vec<String>,
    timeouts: Vec<Option<Duration>>,
}

impl MockSolver {
    /// Creates a mock with no canned responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock that replays `responses`
    pub fn with_responses(responses: impl IntoIterator<Item = SolverResponse>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Queues one more response
    pub fn push_response(&mut self, response: SolverResponse) {
        self.responses.push_back(response);
    }

    /// Scripts received so far
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Time limits received so far
    pub fn timeouts(&self) -> &[Option<Duration>] {
        &self.timeouts
    }
}

impl SmtSolver for MockSolver {
    fn check(&mut self, script: &str, timeout: Option<Duration>) -> Result<SolverResponse> {
        self.scripts.push(script.to_string());
        self.timeouts.push(timeout);
        Ok(self.responses.pop_front().unwrap_or(SolverResponse::Unknown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_solver_replays_in_order() {
        let mut solver = MockSolver::with_responses([
            SolverResponse::Unsat(None),
            SolverResponse::Sat("(model)".to_string()),
        ]);

        assert_eq!(solver.check("a", None).unwrap(), SolverResponse::Unsat(None));
        assert_eq!(
            solver.check("b", Some(Duration::from_secs(1))).unwrap(),
            SolverResponse::Sat("(model)".to_string())
        );
        assert_eq!(solver.scripts(), &["a".to_string(), "b".to_string()]);
        assert_eq!(solver.timeouts(), &[None, Some(Duration::from_secs(1))]);
    }

    #[test]
    fn mock_solver_empty() {
        let mut solver = MockSolver::new();

        // Exhausted mocks give up
        assert_eq!(solver.check("", None).unwrap(), SolverResponse::Unknown);
    }

    #[test]
    fn mock_solver_through_reference() {
        let mut solver = MockSolver::new();
        solver.push_response(SolverResponse::Timeout);
        let mut borrowed = &mut solver;
        assert_eq!(borrowed.check("x", None).unwrap(), SolverResponse::Timeout);
        assert_eq!(solver.scripts().len(), 1);
    }
}
