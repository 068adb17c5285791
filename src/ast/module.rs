//! Top-level declarations: field groups, functions, facts, commands

use std::sync::Arc;

use super::{Column, Expr, ExprVar, Field, Pos, Sig};

/// Fields declared together with one bound: `disj f, g: disj e`
#[derive(Clone, Debug)]
pub struct FieldDecl {
    fields: Vec<Field>,
    disjoint: bool,
    disjoint_values: bool,
}

impl FieldDecl {
    /// Declares one field per label on `sig`, all sharing `bound`
    ///
    /// # Panics
    /// Panics if `labels` is empty
    pub fn new(sig: &Sig, labels: &[&str], bound: Expr) -> Self {
        assert!(!labels.is_empty(), "field declaration needs a label");
        let fields = labels
            .iter()
            .map(|label| Field::new(sig, *label, bound.clone()))
            .collect();
        Self {
            fields,
            disjoint: false,
            disjoint_values: false,
        }
    }

    /// Groups already-built fields
    pub fn from_fields(fields: Vec<Field>) -> Self {
        Self {
            fields,
            disjoint: false,
            disjoint_values: false,
        }
    }

    /// `disj f, g: e` - the fields are pairwise disjoint
    pub fn disjoint(mut self) -> Self {
        self.disjoint = true;
        self
    }

    /// `f: disj e` - values of different atoms are disjoint
    pub fn disjoint_values(mut self) -> Self {
        self.disjoint_values = true;
        self
    }

    /// Returns the fields
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns true if the fields are pairwise disjoint
    pub fn is_disjoint(&self) -> bool {
        self.disjoint
    }

    /// Returns true if values of different atoms are disjoint
    pub fn has_disjoint_values(&self) -> bool {
        self.disjoint_values
    }
}

/// A user function or predicate
///
/// Predicates return no columns. A function without a body can only be
/// called if it is a built-in.
#[derive(Clone, Debug)]
pub struct Func {
    name: String,
    params: Vec<ExprVar>,
    returns: Vec<Column>,
    body: Option<Expr>,
    pos: Pos,
}

impl Func {
    /// Creates a predicate
    pub fn pred(name: impl Into<String>, params: Vec<ExprVar>, body: Expr) -> Self {
        Self {
            name: name.into(),
            params,
            returns: Vec::new(),
            body: Some(body),
            pos: Pos::default(),
        }
    }

    /// Creates a function returning `body`'s columns
    pub fn fun(name: impl Into<String>, params: Vec<ExprVar>, body: Expr) -> Self {
        let returns = body.columns();
        Self {
            name: name.into(),
            params,
            returns,
            body: Some(body),
            pos: Pos::default(),
        }
    }

    /// Creates a function whose body is not known yet
    ///
    /// Useful for recursive definitions, whose body calls the function itself.
    pub fn declared(name: impl Into<String>, params: Vec<ExprVar>, returns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            body: None,
            pos: Pos::default(),
        }
    }

    /// Sets the body
    pub fn with_body(mut self, body: Expr) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the source position
    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = pos;
        self
    }

    /// Returns the name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameters
    pub fn params(&self) -> &[ExprVar] {
        &self.params
    }

    /// Returns the result columns; empty for predicates
    pub fn returns(&self) -> &[Column] {
        &self.returns
    }

    /// Returns the body
    pub fn body(&self) -> Option<&Expr> {
        self.body.as_ref()
    }

    /// Returns the source position
    pub fn pos(&self) -> &Pos {
        &self.pos
    }
}

/// A named fact
#[derive(Clone, Debug)]
pub struct Fact {
    /// Fact label
    pub label: String,
    /// The constraint
    pub expr: Expr,
    /// Source position
    pub pos: Pos,
}

/// A `run` or `check` command
#[derive(Clone, Debug)]
pub struct Command {
    /// Command label
    pub label: String,
    /// Formula to run, or assertion to check
    pub formula: Expr,
    /// True for `check`
    pub check: bool,
    /// Source position
    pub pos: Pos,
}

impl Command {
    /// `run label { formula }`
    pub fn run(label: impl Into<String>, formula: Expr) -> Self {
        Self {
            label: label.into(),
            formula,
            check: false,
            pos: Pos::default(),
        }
    }

    /// `check label { formula }`
    pub fn check(label: impl Into<String>, formula: Expr) -> Self {
        Self {
            label: label.into(),
            formula,
            check: true,
            pos: Pos::default(),
        }
    }
}

/// A resolved module: everything the translator consumes
#[derive(Clone, Debug, Default)]
pub struct Module {
    sigs: Vec<Sig>,
    field_decls: Vec<FieldDecl>,
    facts: Vec<Fact>,
    functions: Vec<Arc<Func>>,
    commands: Vec<Command>,
}

impl Module {
    /// Creates an empty module
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signature; parents must be added before their children
    pub fn add_sig(&mut self, sig: Sig) {
        self.sigs.push(sig);
    }

    /// Adds a single field
    pub fn add_field(&mut self, field: Field) {
        self.field_decls.push(FieldDecl::from_fields(vec![field]));
    }

    /// Adds a field group
    pub fn add_field_decl(&mut self, decl: FieldDecl) {
        self.field_decls.push(decl);
    }

    /// Adds a fact
    pub fn add_fact(&mut self, label: impl Into<String>, expr: Expr) {
        self.facts.push(Fact {
            label: label.into(),
            expr,
            pos: Pos::default(),
        });
    }

    /// Adds a fact with its position
    pub fn add_fact_at(&mut self, fact: Fact) {
        self.facts.push(fact);
    }

    /// Adds a function or predicate
    pub fn add_function(&mut self, func: Func) {
        self.functions.push(Arc::new(func));
    }

    /// Adds a command
    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Signatures in declaration order
    pub fn sigs(&self) -> &[Sig] {
        &self.sigs
    }

    /// Field groups in declaration order
    pub fn field_decls(&self) -> &[FieldDecl] {
        &self.field_decls
    }

    /// All fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.field_decls.iter().flat_map(|d| d.fields().iter())
    }

    /// Facts in declaration order
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Functions and predicates
    pub fn functions(&self) -> &[Arc<Func>] {
        &self.functions
    }

    /// Looks a function up by name
    pub fn function(&self, name: &str) -> Option<&Arc<Func>> {
        self.functions.iter().find(|f| f.name() == name)
    }

    /// Commands in declaration order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_decl_shares_bound() {
        let a = Sig::top_level("this/A");
        let decl = FieldDecl::new(&a, &["f", "g"], Expr::from(&a).set_of()).disjoint();
        assert_eq!(decl.fields().len(), 2);
        assert!(decl.is_disjoint());
        assert!(!decl.has_disjoint_values());
        assert_eq!(decl.fields()[0].bound(), decl.fields()[1].bound());
        assert_ne!(decl.fields()[0], decl.fields()[1]);
    }

    #[test]
    fn module_lookup() {
        let mut module = Module::new();
        let a = Sig::top_level("this/A");
        module.add_sig(a.clone());
        module.add_field(Field::new(&a, "f", Expr::from(&a)));
        module.add_function(Func::pred("this/p", Vec::new(), Expr::from(&a).some()));
        assert_eq!(module.fields().count(), 1);
        assert!(module.function("this/p").is_some());
        assert!(module.function("this/q").is_none());
        assert!(module.function("this/p").map_or(false, |f| f.returns().is_empty()));
    }
}
