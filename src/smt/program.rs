//! Programs, assertions and solver-side models

use std::sync::Arc;

use super::decl::{FunctionDeclaration, FunctionDefinition};
use super::expr::Expression;
use super::sort::Sort;
use crate::error::{Error, Result};

/// Marker carried by labels of named formulas
///
/// Solvers echo named formulas back as model definitions; names containing
/// this marker are bookkeeping and not model values.
pub const NAMED_FORMULA_MARKER: &str = "\"filename\":";

/// Label naming a source position, e.g. for unsat-core reporting
pub fn position_label(filename: &str, line: usize, column: usize) -> String {
    format!(
        "{{\"filename\": \"{}\", \"line\": {}, \"column\": {}}}",
        filename.replace('\\', "/").replace('"', "'"),
        line,
        column
    )
}

/// `(declare-sort name arity)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortDeclaration {
    /// Sort name
    pub name: String,
    /// Number of sort parameters
    pub arity: usize,
}

impl SortDeclaration {
    /// Declaration of a nullary sort
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arity: 0,
        }
    }
}

/// A boolean formula destined for the solver
///
/// The comment and label are for traceability only. The label names the
/// assertion in unsat cores.
#[derive(Clone, Debug, PartialEq)]
pub struct Assertion {
    comment: String,
    expression: Expression,
    label: Option<String>,
}

impl Assertion {
    /// Creates an unlabelled assertion
    ///
    /// # Errors
    /// Returns a sort mismatch unless `expression` is boolean
    pub fn new(comment: impl Into<String>, expression: Expression) -> Result<Self> {
        let sort = expression.sort();
        if sort != Sort::Bool {
            return Err(Error::SortMismatch(format!(
                "assertion must be Bool, got {}",
                sort
            )));
        }
        Ok(Self {
            comment: comment.into(),
            expression,
            label: None,
        })
    }

    /// Attaches an unsat-core label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns the comment
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the asserted formula
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Returns the unsat-core label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// A function declared or defined by a program
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionItem {
    /// Uninterpreted function
    Declared(Arc<FunctionDeclaration>),
    /// Function with a body
    Defined(Arc<FunctionDefinition>),
}

impl FunctionItem {
    /// Returns the function name
    pub fn name(&self) -> &str {
        match self {
            FunctionItem::Declared(decl) => decl.name(),
            FunctionItem::Defined(def) => def.name(),
        }
    }

    /// Returns the declaration
    pub fn declaration(&self) -> &Arc<FunctionDeclaration> {
        match self {
            FunctionItem::Declared(decl) => decl,
            FunctionItem::Defined(def) => def.declaration(),
        }
    }
}

/// An ordered translation unit
///
/// Append-only while it is being built.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    sorts: Vec<SortDeclaration>,
    functions: Vec<FunctionItem>,
    assertions: Vec<Assertion>,
}

impl Program {
    /// Creates an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort declaration
    pub fn add_sort(&mut self, sort: SortDeclaration) {
        self.sorts.push(sort);
    }

    /// Appends a function declaration
    pub fn add_function(&mut self, function: Arc<FunctionDeclaration>) {
        self.functions.push(FunctionItem::Declared(function));
    }

    /// Appends a function definition
    pub fn add_definition(&mut self, definition: Arc<FunctionDefinition>) {
        self.functions.push(FunctionItem::Defined(definition));
    }

    /// Appends an assertion
    pub fn add_assertion(&mut self, assertion: Assertion) {
        self.assertions.push(assertion);
    }

    /// Sort declarations in order
    pub fn sorts(&self) -> &[SortDeclaration] {
        &self.sorts
    }

    /// Function declarations and definitions in order
    pub fn functions(&self) -> &[FunctionItem] {
        &self.functions
    }

    /// Assertions in order
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// Looks a function up by name
    pub fn function(&self, name: &str) -> Option<&FunctionItem> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Returns this program followed by the items of `delta`
    pub fn merged(&self, delta: &Program) -> Program {
        let mut merged = self.clone();
        merged.sorts.extend(delta.sorts.iter().cloned());
        merged.functions.extend(delta.functions.iter().cloned());
        merged.assertions.extend(delta.assertions.iter().cloned());
        merged
    }
}

/// A model reported by the solver
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmtModel {
    sorts: Vec<SortDeclaration>,
    functions: Vec<Arc<FunctionDefinition>>,
}

impl SmtModel {
    /// Creates an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort declaration
    pub fn add_sort(&mut self, sort: SortDeclaration) {
        self.sorts.push(sort);
    }

    /// Appends a function definition
    pub fn add_function(&mut self, function: Arc<FunctionDefinition>) {
        self.functions.push(function);
    }

    /// Declared sorts
    pub fn sorts(&self) -> &[SortDeclaration] {
        &self.sorts
    }

    /// Function definitions in the order the solver reported them
    pub fn functions(&self) -> &[Arc<FunctionDefinition>] {
        &self.functions
    }

    /// Looks a definition up by name
    pub fn function(&self, name: &str) -> Option<&Arc<FunctionDefinition>> {
        self.functions.iter().find(|f| f.name() == name)
    }
}

/// Reply to `(get-value ...)`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SmtValues(pub Vec<(Expression, Expression)>);

impl SmtValues {
    /// Returns the value reported for `expr`
    pub fn get(&self, expr: &Expression) -> Option<&Expression> {
        self.0.iter().find(|(e, _)| e == expr).map(|(_, v)| v)
    }
}

/// Reply to `(get-unsat-core)`: labels of the assertions in the core
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnsatCore(pub Vec<String>);

impl UnsatCore {
    /// Returns true if the core names `label`
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assertion_must_be_boolean() {
        assert!(Assertion::new("ok", Expression::bool(true)).is_ok());
        assert!(matches!(
            Assertion::new("bad", Expression::int(1)),
            Err(Error::SortMismatch(_))
        ));
    }

    #[test]
    fn position_labels_carry_the_marker() {
        let label = position_label("model.als", 3, 7);
        assert_eq!(label, r#"{"filename": "model.als", "line": 3, "column": 7}"#);
        assert!(label.contains(NAMED_FORMULA_MARKER));
    }

    #[test]
    fn merged_appends_delta() {
        let mut base = Program::new();
        base.add_sort(SortDeclaration::new("Atom"));
        base.add_assertion(Assertion::new("a", Expression::bool(true)).unwrap());
        let mut delta = Program::new();
        delta.add_assertion(Assertion::new("b", Expression::bool(false)).unwrap());
        let merged = base.merged(&delta);
        assert_eq!(merged.sorts().len(), 1);
        assert_eq!(merged.assertions().len(), 2);
        assert_eq!(merged.assertions()[1].comment(), "b");
        assert_eq!(base.assertions().len(), 1);
    }
}
