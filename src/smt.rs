//! SMT term algebra
//!
//! Sorts, expressions, declarations, environments and programs. Every
//! expression constructor checks the sorts of its operands, so a value of type
//! [`Expression`] is always well sorted.

pub mod decl;
pub mod environment;
pub mod expr;
pub mod printer;
pub mod program;
pub mod sort;

pub use decl::{FunctionDeclaration, FunctionDefinition, VariableDeclaration};
pub use environment::Environment;
pub use expr::{
    BinaryOp, Constant, Expression, MultiArityOp, QuantifierOp, UnaryOp, Variable,
};
pub use printer::{quote_symbol, sanitize_symbol, script};
pub use program::{
    position_label, Assertion, FunctionItem, Program, SmtModel, SmtValues, SortDeclaration,
    UnsatCore, NAMED_FORMULA_MARKER,
};
pub use sort::Sort;
