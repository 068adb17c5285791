//! # alloy2smt-rs
//!
//! Translates relational first-order specifications (Alloy-style signatures,
//! fields, facts and commands) into SMT problems over finite sets of tuples,
//! and reconstructs instances from the models an SMT solver reports.
//!
//! The pipeline has three halves:
//!
//! 1. [`translator`] lowers an [`ast::Module`] into an [`smt::Program`], built
//!    from the sort-checked term algebra in [`smt`].
//! 2. [`smt::printer`] renders the program as SMT-LIB text for an external
//!    solver (plugged in through [`engine::SmtSolver`]).
//! 3. [`parser`] reads the solver's model back into the term algebra and
//!    [`instance`] evaluates it into concrete atoms and tuples.
//!
//! ## Example
//!
//! ```rust,ignore
//! use alloy2smt_rs::ast::{Expr, Module, Sig};
//! use alloy2smt_rs::translator::{Options, Translator};
//!
//! let person = Sig::top_level("this/Person");
//! let mut module = Module::new();
//! module.add_sig(person.clone());
//! module.add_fact("nonEmpty", Expr::from(&person).some());
//!
//! let translation = Translator::new(Options::default()).translate(&module)?;
//! println!("{}", translation.program());
//! ```

#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]

/// Relational input AST (signatures, fields, relational expressions)
pub mod ast;

/// SMT term algebra: sorts, expressions, declarations and programs
pub mod smt;

/// Relational to first-order translation
pub mod translator;

/// Solver output parsing (models, values, unsat cores)
pub mod parser;

/// Solver boundary and model evaluation
pub mod engine;

/// Instances reconstructed from solver models
pub mod instance;

/// Main solver API
pub mod solver;

/// Error types
pub mod error {
    //! Error types for alloy2smt-rs

    use thiserror::Error;

    /// Errors that can occur while translating, parsing or evaluating
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum Error {
        /// Operand sorts do not fit the operator
        #[error("sort mismatch: {0}")]
        SortMismatch(String),

        /// A function was applied to the wrong number of arguments
        #[error("function '{function}' expects {expected} arguments but {actual} were passed")]
        ArityMismatch {
            /// Function name
            function: String,
            /// Declared number of inputs
            expected: usize,
            /// Number of arguments supplied
            actual: usize,
        },

        /// A signature, field, variable or function could not be resolved
        #[error("unresolved name: {0}")]
        UnresolvedName(String),

        /// A solver model refers to a name that was never defined
        #[error("the variable '{0}' is undefined")]
        UndefinedVariable(String),

        /// An operator symbol is not part of the supported fragment
        #[error("unsupported operator: {0}")]
        UnsupportedOperator(String),

        /// A sort is not part of the supported fragment
        #[error("unknown sort '{0}'")]
        UnsupportedSort(String),

        /// A user function reaches itself through calls
        #[error("recursive call to function '{0}' cannot be inlined")]
        RecursiveCall(String),

        /// Substitution would capture a variable under a binder
        #[error("variable '{variable}' would be captured in '{expression}'")]
        VariableCapture {
            /// Name of the captured variable
            variable: String,
            /// Expression where the capture happens
            expression: String,
        },

        /// Solver text is not well formed
        #[error("parse error: {0}")]
        Parse(String),

        /// A term could not be evaluated against the model
        #[error("evaluation error: {0}")]
        Evaluation(String),

        /// A model function body is outside the recognised normal form
        #[error("malformed model: {0}")]
        MalformedModel(String),

        /// The solver process could not be run or talked to
        #[error("solver error: {0}")]
        Solver(String),
    }

    /// Broad classes of [`Error`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ErrorCategory {
        /// Malformed input or lowering bug; aborts the whole call
        Definition,
        /// Only the current instance-reconstruction step fails
        Evaluation,
        /// The external solver failed
        Solver,
    }

    impl Error {
        /// Returns the category of this error
        pub fn category(&self) -> ErrorCategory {
            match self {
                Error::Evaluation(_) | Error::MalformedModel(_) => ErrorCategory::Evaluation,
                Error::Solver(_) => ErrorCategory::Solver,
                _ => ErrorCategory::Definition,
            }
        }
    }

    /// Result type for alloy2smt-rs operations
    pub type Result<T> = std::result::Result<T, Error>;
}

// Re-export commonly used types
pub use error::{Error, ErrorCategory, Result};
