//! AST types for relational specifications
//!
//! This module contains the already-resolved relational input: signatures,
//! fields, quantified variables and the expressions built over them.
//! Signatures, fields and variables have identity equality, like the handles
//! a front-end resolver hands out.

pub mod expr;
pub mod module;

pub use expr::{BinaryOp, ConstantExpr, Decl, Expr, ListOp, Multiplicity, Quantifier, UnaryOp};
pub use module::{Command, Fact, FieldDecl, Func, Module};

use std::fmt;
use std::sync::Arc;

/// Source position attached to declarations and facts
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Pos {
    /// File name
    pub filename: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl Pos {
    /// Creates a position
    pub fn new(filename: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }
}

/// Column type of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Relational atoms
    Atom,
    /// Integers
    Int,
}

/// How a signature relates to the rest of the hierarchy
#[derive(Clone, Debug, PartialEq)]
pub enum SigKind {
    /// Top-level signature
    TopLevel,
    /// `sig S extends P`
    Extends(Sig),
    /// `sig S in P1 + P2`
    Subset(Vec<Sig>),
    /// The built-in integer signature
    Int,
}

/// A signature - a named set of atoms
///
/// Two signatures are equal if and only if they are the same object.
#[derive(Clone)]
pub struct Sig {
    inner: Arc<SigInner>,
}

struct SigInner {
    label: String,
    kind: SigKind,
    is_abstract: bool,
    multiplicity: Option<Multiplicity>,
    pos: Pos,
    this: ExprVar,
}

/// Builder for signatures with attributes
pub struct SigBuilder {
    label: String,
    kind: SigKind,
    is_abstract: bool,
    multiplicity: Option<Multiplicity>,
    pos: Pos,
}

impl SigBuilder {
    /// Marks the signature abstract
    pub fn abstract_sig(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Sets the signature multiplicity (`one`, `lone` or `some`)
    ///
    /// # Panics
    /// Panics for `set` or `no`
    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        assert!(
            matches!(multiplicity, Multiplicity::One | Multiplicity::Lone | Multiplicity::Some),
            "signature multiplicity must be one, lone or some, got {:?}",
            multiplicity
        );
        self.multiplicity = Some(multiplicity);
        self
    }

    /// Sets the source position
    pub fn pos(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    /// Creates the signature
    pub fn build(self) -> Sig {
        let column = match &self.kind {
            SigKind::Int => Column::Int,
            SigKind::Extends(parent) => parent.column(),
            SigKind::Subset(parents) => parents.first().map_or(Column::Atom, Sig::column),
            SigKind::TopLevel => Column::Atom,
        };
        Sig {
            inner: Arc::new(SigInner {
                this: ExprVar::new("this", vec![column]),
                label: self.label,
                kind: self.kind,
                is_abstract: self.is_abstract,
                multiplicity: self.multiplicity,
                pos: self.pos,
            }),
        }
    }
}

impl Sig {
    /// Starts building a signature of the given kind
    pub fn builder(label: impl Into<String>, kind: SigKind) -> SigBuilder {
        SigBuilder {
            label: label.into(),
            kind,
            is_abstract: false,
            multiplicity: None,
            pos: Pos::default(),
        }
    }

    /// Creates a top-level signature
    pub fn top_level(label: impl Into<String>) -> Self {
        Self::builder(label, SigKind::TopLevel).build()
    }

    /// Creates `sig label extends parent`
    pub fn extending(label: impl Into<String>, parent: &Sig) -> Self {
        Self::builder(label, SigKind::Extends(parent.clone())).build()
    }

    /// Creates `sig label in parents`
    ///
    /// # Panics
    /// Panics if `parents` is empty
    pub fn subset(label: impl Into<String>, parents: Vec<Sig>) -> Self {
        assert!(!parents.is_empty(), "subset signature needs a parent");
        Self::builder(label, SigKind::Subset(parents)).build()
    }

    /// Creates the built-in integer signature
    pub fn int() -> Self {
        Self::builder("Int", SigKind::Int).build()
    }

    /// Returns the label
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns the kind
    pub fn kind(&self) -> &SigKind {
        &self.inner.kind
    }

    /// Returns true for abstract signatures
    pub fn is_abstract(&self) -> bool {
        self.inner.is_abstract
    }

    /// Returns the multiplicity, if any
    pub fn multiplicity(&self) -> Option<Multiplicity> {
        self.inner.multiplicity
    }

    /// Returns the source position
    pub fn pos(&self) -> &Pos {
        &self.inner.pos
    }

    /// Returns true for the built-in `Int` signature
    pub fn is_builtin_int(&self) -> bool {
        matches!(self.inner.kind, SigKind::Int)
    }

    /// Returns the column type of this signature's atoms
    pub fn column(&self) -> Column {
        self.inner.this.columns()[0]
    }

    /// Returns the `this` variable used by field bounds of this signature
    pub fn this(&self) -> &ExprVar {
        &self.inner.this
    }
}

impl PartialEq for Sig {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Sig {}

impl std::hash::Hash for Sig {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({})", self.label())
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A field - a relation attached to a signature
///
/// Fields have identity equality like signatures.
#[derive(Clone)]
pub struct Field {
    inner: Arc<FieldInner>,
}

struct FieldInner {
    sig: Sig,
    label: String,
    bound: Expr,
    pos: Pos,
}

impl Field {
    /// Creates a field of `sig` whose value for each atom lies in `bound`
    ///
    /// `bound` may refer to `sig.this()` and may carry a multiplicity marker
    /// (`one`, `lone`, `some`, `set`).
    ///
    /// # Panics
    /// Panics if `bound` is a formula
    pub fn new(sig: &Sig, label: impl Into<String>, bound: Expr) -> Self {
        Self::with_pos(sig, label, bound, Pos::default())
    }

    /// Creates a field with a source position
    pub fn with_pos(sig: &Sig, label: impl Into<String>, bound: Expr, pos: Pos) -> Self {
        assert!(!bound.is_formula(), "field bound must be a relational expression");
        Self {
            inner: Arc::new(FieldInner {
                sig: sig.clone(),
                label: label.into(),
                bound,
                pos,
            }),
        }
    }

    /// Returns the owning signature
    pub fn sig(&self) -> &Sig {
        &self.inner.sig
    }

    /// Returns the label
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Returns the bound expression
    pub fn bound(&self) -> &Expr {
        &self.inner.bound
    }

    /// Returns the source position
    pub fn pos(&self) -> &Pos {
        &self.inner.pos
    }

    /// Returns the column types: the owner column followed by the bound's
    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![self.sig().column()];
        columns.extend(self.bound().columns());
        columns
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Field {}

impl std::hash::Hash for Field {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({}.{})", self.sig().label(), self.label())
    }
}

/// A variable bound by a quantifier, `let`, or function parameter list
///
/// Variables have identity equality: two variables with the same name are
/// different unless one is a clone of the other.
#[derive(Clone)]
pub struct ExprVar {
    inner: Arc<ExprVarInner>,
}

struct ExprVarInner {
    name: String,
    columns: Vec<Column>,
}

impl ExprVar {
    /// Creates a variable with the given column types
    ///
    /// # Panics
    /// Panics if `columns` is empty
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        assert!(!columns.is_empty(), "variable needs at least one column");
        Self {
            inner: Arc::new(ExprVarInner {
                name: name.into(),
                columns,
            }),
        }
    }

    /// Creates a unary atom variable
    pub fn unary(name: impl Into<String>) -> Self {
        Self::new(name, vec![Column::Atom])
    }

    /// Creates a variable ranging over the tuples of `bound`
    pub fn of(name: impl Into<String>, bound: &Expr) -> Self {
        Self::new(name, bound.columns())
    }

    /// Returns the name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the column types
    pub fn columns(&self) -> &[Column] {
        &self.inner.columns
    }

    /// Returns the arity
    pub fn arity(&self) -> usize {
        self.inner.columns.len()
    }
}

impl PartialEq for ExprVar {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ExprVar {}

impl std::hash::Hash for ExprVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.inner).hash(state);
    }
}

impl fmt::Debug for ExprVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprVar({}/{})", self.name(), self.arity())
    }
}

impl From<&Sig> for Expr {
    fn from(sig: &Sig) -> Self {
        Expr::Sig(sig.clone())
    }
}

impl From<Sig> for Expr {
    fn from(sig: Sig) -> Self {
        Expr::Sig(sig)
    }
}

impl From<&Field> for Expr {
    fn from(field: &Field) -> Self {
        Expr::Field(field.clone())
    }
}

impl From<&ExprVar> for Expr {
    fn from(var: &ExprVar) -> Self {
        Expr::Var(var.clone())
    }
}

impl From<ExprVar> for Expr {
    fn from(var: ExprVar) -> Self {
        Expr::Var(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sig_identity() {
        let a = Sig::top_level("this/A");
        let b = Sig::top_level("this/A");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn sig_columns() {
        let int = Sig::int();
        let small = Sig::subset("this/Small", vec![int.clone()]);
        assert_eq!(int.column(), Column::Int);
        assert_eq!(small.column(), Column::Int);
        assert_eq!(Sig::top_level("this/A").column(), Column::Atom);
    }

    #[test]
    fn sig_builder() {
        let parent = Sig::builder("this/P", SigKind::TopLevel)
            .abstract_sig()
            .multiplicity(Multiplicity::Some)
            .pos(Pos::new("m.als", 1, 5))
            .build();
        assert!(parent.is_abstract());
        assert_eq!(parent.multiplicity(), Some(Multiplicity::Some));
        assert_eq!(parent.pos().line, 1);
    }

    #[test]
    #[should_panic(expected = "signature multiplicity")]
    fn set_multiplicity_panics() {
        let _ = Sig::builder("this/P", SigKind::TopLevel).multiplicity(Multiplicity::Set);
    }

    #[test]
    fn field_columns() {
        let person = Sig::top_level("this/Person");
        let age = Field::new(&person, "age", Expr::from(&Sig::int()).one_of());
        assert_eq!(age.columns(), vec![Column::Atom, Column::Int]);
        let knows = Field::new(&person, "knows", Expr::from(&person).set_of());
        assert_eq!(knows.columns(), vec![Column::Atom, Column::Atom]);
    }

    #[test]
    fn variable_identity() {
        let x = ExprVar::unary("x");
        let y = ExprVar::unary("x");
        assert_eq!(x, x.clone());
        assert_ne!(x, y);
    }
}
