//! Main solver API
//!
//! The solver translates a module to SMT-LIB, hands the script to an SMT
//! backend and reads the instance back from the model.

use std::time::{Duration, Instant};

use log::{debug, info};

use crate::ast::Module;
use crate::engine::{ProcessSolver, SmtSolver, SolverResponse};
use crate::instance::Instance;
use crate::parser::{parse_model, parse_unsat_core};
use crate::smt::{self, Program, UnsatCore};
use crate::translator::{self, Translation, Translator};
use crate::{Error, Result};

/// Binary run by [`Solver::solve`]
pub const DEFAULT_SOLVER: &str = "cvc4";

/// Solver options
#[derive(Debug, Clone)]
pub struct Options {
    /// Translation options
    pub translator: translator::Options,
    /// Time limit handed to the backend (None = no limit)
    pub timeout: Option<Duration>,
    /// Name assertions and ask for an unsat core on unsat results
    pub produce_unsat_cores: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            translator: translator::Options::default(),
            timeout: None,
            produce_unsat_cores: false,
        }
    }
}

/// Main solver
///
/// Translates a module and checks it with an SMT backend, [`DEFAULT_SOLVER`]
/// unless another one is passed to [`Solver::solve_with`].
pub struct Solver {
    options: Options,
}

impl Solver {
    /// Creates a new solver with the given options
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Returns the options of this solver
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Solves `module` with the default backend
    ///
    /// With `command = None` only the facts are checked; otherwise the
    /// command with that label is added.
    pub fn solve(&self, module: &Module, command: Option<&str>) -> Result<Solution> {
        let mut backend = ProcessSolver::new(DEFAULT_SOLVER);
        self.solve_with(&mut backend, module, command)
    }

    /// Solves `module` with a custom backend
    pub fn solve_with<S: SmtSolver>(
        &self,
        backend: &mut S,
        module: &Module,
        command: Option<&str>,
    ) -> Result<Solution> {
        // Step 1: Translate the module
        let translation_start = Instant::now();
        let translation = Translator::new(self.options.translator.clone()).translate(module)?;
        let program = select_program(&translation, command)?;
        let script = smt::script(&program, self.options.produce_unsat_cores);
        let translation_time = translation_start.elapsed();
        debug!("script has {} bytes", script.len());

        // Step 2: Run the backend
        let solving_start = Instant::now();
        let response = backend.check(&script, self.options.timeout)?;
        let solving_time = solving_start.elapsed();

        let stats = Statistics {
            translation_time,
            solving_time,
            num_functions: program.functions().len(),
            num_assertions: program.assertions().len(),
        };

        // Step 3: Read the outcome back
        match response {
            SolverResponse::Sat(model) => {
                let model = parse_model(&model)?;
                let instance = Instance::from_model(&translation, &model)?;
                info!("sat in {} ms", stats.total_time());
                Ok(Solution::Sat { instance, stats })
            }
            SolverResponse::Unsat(core) => {
                let core = core.as_deref().map(parse_unsat_core).transpose()?;
                info!("unsat in {} ms", stats.total_time());
                Ok(Solution::Unsat { core, stats })
            }
            SolverResponse::Unknown | SolverResponse::Timeout => {
                info!("inconclusive after {} ms", stats.total_time());
                Ok(Solution::Unknown { stats })
            }
        }
    }
}

fn select_program(translation: &Translation, command: Option<&str>) -> Result<Program> {
    match command {
        None => Ok(translation.program().clone()),
        Some(label) => translation
            .command_program(label)
            .ok_or_else(|| Error::UnresolvedName(format!("command {}", label))),
    }
}

/// Outcome of solving a module
#[derive(Debug)]
pub enum Solution {
    /// The module is satisfiable
    Sat {
        /// Satisfying instance
        instance: Instance,
        /// Solving statistics
        stats: Statistics,
    },
    /// The module is unsatisfiable
    Unsat {
        /// Labels of the assertions in the core, when cores were requested
        core: Option<UnsatCore>,
        /// Solving statistics
        stats: Statistics,
    },
    /// The backend gave up or ran out of time
    Unknown {
        /// Solving statistics
        stats: Statistics,
    },
}

impl Solution {
    /// Returns true if the module is satisfiable
    pub fn is_sat(&self) -> bool {
        matches!(self, Solution::Sat { .. })
    }

    /// Returns true if the module is unsatisfiable
    pub fn is_unsat(&self) -> bool {
        matches!(self, Solution::Unsat { .. })
    }

    /// Returns true if the result is inconclusive
    pub fn is_unknown(&self) -> bool {
        matches!(self, Solution::Unknown { .. })
    }

    /// Returns the instance if the solution is SAT
    pub fn instance(&self) -> Option<&Instance> {
        match self {
            Solution::Sat { instance, .. } => Some(instance),
            _ => None,
        }
    }

    /// Returns the unsat core, if one was reported
    pub fn core(&self) -> Option<&UnsatCore> {
        match self {
            Solution::Unsat { core, .. } => core.as_ref(),
            _ => None,
        }
    }

    /// Returns the statistics
    pub fn statistics(&self) -> &Statistics {
        match self {
            Solution::Sat { stats, .. } => stats,
            Solution::Unsat { stats, .. } => stats,
            Solution::Unknown { stats } => stats,
        }
    }
}

/// Statistics collected during solving
#[derive(Debug, Clone)]
pub struct Statistics {
    translation_time: Duration,
    solving_time: Duration,
    num_functions: usize,
    num_assertions: usize,
}

impl Statistics {
    /// Returns translation time in milliseconds
    pub fn translation_time(&self) -> u64 {
        self.translation_time.as_millis() as u64
    }

    /// Returns solving time in milliseconds
    pub fn solving_time(&self) -> u64 {
        self.solving_time.as_millis() as u64
    }

    /// Returns total time in milliseconds
    pub fn total_time(&self) -> u64 {
        self.translation_time() + self.solving_time()
    }

    /// Returns the number of declared and defined functions in the script
    pub fn num_functions(&self) -> usize {
        self.num_functions
    }

    /// Returns the number of assertions in the script
    pub fn num_assertions(&self) -> usize {
        self.num_assertions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Command, Expr, Sig};
    use crate::engine::MockSolver;

    fn module() -> Module {
        let person = Sig::top_level("this/Person");
        let mut module = Module::new();
        module.add_sig(person.clone());
        module.add_command(Command::run("somePerson", Expr::from(&person).some()));
        module
    }

    #[test]
    fn solver_basic_sat() {
        let mut backend = MockSolver::with_responses([SolverResponse::Sat(
            "(model (define-fun this/Person () (Set (Tuple Atom)) (singleton (mkTuple @uc_Atom_0))))"
                .to_string(),
        )]);

        let solver = Solver::new(Options::default());
        let solution = solver
            .solve_with(&mut backend, &module(), Some("somePerson"))
            .unwrap();

        assert!(solution.is_sat());
        let instance = solution.instance().unwrap();
        assert_eq!(instance.signature("this/Person").unwrap().atoms, vec!["@uc_Atom_0"]);
        assert!(backend.scripts()[0].contains("(assert"));
        assert!(backend.scripts()[0].ends_with("(check-sat)\n"));
    }

    #[test]
    fn solver_basic_unsat_with_core() {
        let mut backend = MockSolver::with_responses([SolverResponse::Unsat(Some("(a0 a1)".to_string()))]);
        let options = Options {
            produce_unsat_cores: true,
            ..Options::default()
        };

        let solution = Solver::new(options).solve_with(&mut backend, &module(), None).unwrap();

        assert!(solution.is_unsat());
        assert!(solution.core().unwrap().contains("a1"));
        assert!(backend.scripts()[0].contains(":produce-unsat-cores true"));
    }

    #[test]
    fn timeout_is_inconclusive() {
        let mut backend = MockSolver::with_responses([SolverResponse::Timeout]);
        let options = Options {
            timeout: Some(Duration::from_millis(5000)),
            ..Options::default()
        };

        let solution = Solver::new(options).solve_with(&mut backend, &module(), None).unwrap();

        assert!(solution.is_unknown());
        assert!(!solution.is_sat() && !solution.is_unsat());
        assert_eq!(backend.timeouts(), &[Some(Duration::from_millis(5000))]);
    }

    #[test]
    fn unknown_command_is_rejected() {
        let mut backend = MockSolver::new();
        let result = Solver::new(Options::default()).solve_with(&mut backend, &module(), Some("nope"));
        assert!(matches!(result, Err(Error::UnresolvedName(_))));
        assert!(backend.scripts().is_empty());
    }

    #[test]
    fn solver_statistics() {
        let mut backend = MockSolver::with_responses([SolverResponse::Unknown]);
        let solution = Solver::new(Options::default())
            .solve_with(&mut backend, &module(), Some("somePerson"))
            .unwrap();

        let stats = solution.statistics();
        assert!(stats.total_time() >= stats.solving_time());
        assert!(stats.num_functions() > 0);
        assert!(stats.num_assertions() > 0);
    }
}
