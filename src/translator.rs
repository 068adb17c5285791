//! Relational to first-order translation
//!
//! Lowers a resolved [`Module`] into an SMT [`Program`] over finite sets of
//! tuples. One [`Translator`] is one translation session: it owns the program
//! being assembled, the signature and field maps, the fresh-name counter and
//! the memoised integer constants, so independent sessions never interfere.

mod arithmetic;
mod exprs;
mod fields;
mod signatures;

use std::sync::Arc;

use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{Column, Command, Field, Func, Module, Pos, Sig};
use crate::error::Result;
use crate::smt::{
    position_label, Assertion, Expression, FunctionDeclaration, Program, Sort, SortDeclaration,
    VariableDeclaration, NAMED_FORMULA_MARKER,
};

/// Name of the value function `UInt -> Int`
pub const INT_VALUE_NAME: &str = "intValue";

/// Name of the identity relation over atoms
pub const ATOM_IDEN_NAME: &str = "atomIden";

/// Name of the universe of uninterpreted integers
pub const INTEGERS_NAME: &str = "integers";

/// Translation options
#[derive(Debug, Clone)]
pub struct Options {
    /// Require integer-valued relations to be exactly one element
    ///
    /// Arithmetic results are then declared as single `UInt` tuples and
    /// axiomatised by one existential equation instead of two inclusions.
    pub integer_singletons_only: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            integer_singletons_only: true,
        }
    }
}

/// The result of translating one module
#[derive(Debug, Clone)]
pub struct Translation {
    program: Program,
    signatures: Vec<(Sig, Arc<FunctionDeclaration>)>,
    fields: Vec<(Field, Arc<FunctionDeclaration>)>,
    commands: Vec<(Command, Program)>,
}

impl Translation {
    /// The program for the module's signatures, fields and facts
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Signatures and the functions declared for them, in declaration order
    pub fn signatures(&self) -> &[(Sig, Arc<FunctionDeclaration>)] {
        &self.signatures
    }

    /// Fields and the functions declared for them, in declaration order
    pub fn fields(&self) -> &[(Field, Arc<FunctionDeclaration>)] {
        &self.fields
    }

    /// Returns the function declared for `sig`
    pub fn signature(&self, sig: &Sig) -> Option<&Arc<FunctionDeclaration>> {
        self.signatures.iter().find(|(s, _)| s == sig).map(|(_, d)| d)
    }

    /// Returns the function declared for `field`
    pub fn field(&self, field: &Field) -> Option<&Arc<FunctionDeclaration>> {
        self.fields.iter().find(|(f, _)| f == field).map(|(_, d)| d)
    }

    /// Commands with the program items each adds to [`Translation::program`]
    pub fn commands(&self) -> &[(Command, Program)] {
        &self.commands
    }

    /// The complete program of the command labelled `label`
    pub fn command_program(&self, label: &str) -> Option<Program> {
        self.commands
            .iter()
            .find(|(c, _)| c.label == label)
            .map(|(_, delta)| self.program.merged(delta))
    }
}

/// A translation session
pub struct Translator {
    options: Options,
    program: Program,
    sig_map: FxHashMap<Sig, Arc<FunctionDeclaration>>,
    signatures: Vec<(Sig, Arc<FunctionDeclaration>)>,
    field_map: FxHashMap<Field, Arc<FunctionDeclaration>>,
    fields: Vec<(Field, Arc<FunctionDeclaration>)>,
    functions: FxHashMap<String, Arc<Func>>,
    int_value: Arc<FunctionDeclaration>,
    int_constants: FxHashMap<i32, Arc<FunctionDeclaration>>,
    atom_iden: Option<Arc<FunctionDeclaration>>,
    integers: Option<Arc<FunctionDeclaration>>,
    inlining: Vec<String>,
    labels: FxHashSet<String>,
    fresh: usize,
}

/// Lazily declared symbols, saved and restored around each command
struct LazyState {
    int_constants: FxHashMap<i32, Arc<FunctionDeclaration>>,
    atom_iden: Option<Arc<FunctionDeclaration>>,
    integers: Option<Arc<FunctionDeclaration>>,
}

/// Sort of a relation with the given column types
pub fn relation_sort(columns: &[Column]) -> Sort {
    Sort::relation(columns.iter().map(|c| column_sort(*c)).collect())
}

/// Sort of one column
pub fn column_sort(column: Column) -> Sort {
    match column {
        Column::Atom => Sort::atom(),
        Column::Int => Sort::UninterpretedInt,
    }
}

impl Translator {
    /// Starts a session and declares the preamble sorts and value function
    pub fn new(options: Options) -> Self {
        let int_value = FunctionDeclaration::new(
            INT_VALUE_NAME,
            vec![Sort::UninterpretedInt],
            Sort::Int,
        );
        let mut translator = Self {
            options,
            program: Program::new(),
            sig_map: FxHashMap::default(),
            signatures: Vec::new(),
            field_map: FxHashMap::default(),
            fields: Vec::new(),
            functions: FxHashMap::default(),
            int_value,
            int_constants: FxHashMap::default(),
            atom_iden: None,
            integers: None,
            inlining: Vec::new(),
            labels: FxHashSet::default(),
            fresh: 0,
        };
        translator.preamble();
        translator
    }

    fn preamble(&mut self) {
        self.program.add_sort(SortDeclaration::new(crate::smt::sort::ATOM_SORT_NAME));
        self.program
            .add_sort(SortDeclaration::new(crate::smt::sort::UNINTERPRETED_INT_NAME));
        self.program.add_function(Arc::clone(&self.int_value));
    }

    fn injectivity_axiom(&self) -> Result<Assertion> {
        let x = VariableDeclaration::new("x", Sort::UninterpretedInt);
        let y = VariableDeclaration::new("y", Sort::UninterpretedInt);
        let distinct = x.variable().equals(y.variable())?.not()?;
        let values_distinct = self
            .int_value
            .call(vec![x.variable()])?
            .equals(self.int_value.call(vec![y.variable()])?)?
            .not()?;
        Assertion::new(
            format!("{} is injective", INT_VALUE_NAME),
            Expression::forall(vec![x, y], distinct.implies(values_distinct)?)?,
        )
    }

    /// Returns the options of this session
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The program assembled so far
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The value function `UInt -> Int`
    pub fn int_value(&self) -> &Arc<FunctionDeclaration> {
        &self.int_value
    }

    /// Returns a name unique within this session
    pub fn fresh_name(&mut self, prefix: &str) -> String {
        self.fresh += 1;
        format!("{}_{}", prefix, self.fresh)
    }

    /// Translates a whole module
    ///
    /// Signatures first, then fields, facts and finally one program delta per
    /// command. Any error aborts the translation.
    pub fn translate(mut self, module: &Module) -> Result<Translation> {
        let injectivity = self.injectivity_axiom()?;
        self.program.add_assertion(injectivity);
        for func in module.functions() {
            self.functions.insert(func.name().to_string(), Arc::clone(func));
        }

        self.translate_signatures(module.sigs())?;
        self.translate_fields(module.field_decls())?;

        for fact in module.facts() {
            debug!("translating fact {}", fact.label);
            let formula = self.translate_formula(&fact.expr)?;
            let assertion = Assertion::new(fact.label.clone(), formula)?;
            self.add_assertion_at(assertion, &fact.pos);
        }

        let mut commands = Vec::with_capacity(module.commands().len());
        for command in module.commands() {
            let delta = self.translate_command(command)?;
            commands.push((command.clone(), delta));
        }

        debug!(
            "translated {} signatures, {} fields, {} assertions",
            self.signatures.len(),
            self.fields.len(),
            self.program.assertions().len()
        );

        Ok(Translation {
            program: self.program,
            signatures: self.signatures,
            fields: self.fields,
            commands,
        })
    }

    fn translate_command(&mut self, command: &Command) -> Result<Program> {
        debug!(
            "translating {} command {}",
            if command.check { "check" } else { "run" },
            command.label
        );
        let saved = self.save_lazy_state();
        let base = std::mem::take(&mut self.program);
        let result = self.translate_formula(&command.formula).and_then(|formula| {
            let formula = if command.check { formula.not()? } else { formula };
            Assertion::new(command.label.clone(), formula)
        });
        let mut delta = std::mem::replace(&mut self.program, base);
        self.restore_lazy_state(saved);
        let assertion = result?;
        // commands never share a script, so only the base labels matter
        match label_for(&command.pos).filter(|label| !self.labels.contains(label)) {
            Some(label) => delta.add_assertion(assertion.with_label(label)),
            None => delta.add_assertion(assertion),
        }
        Ok(delta)
    }

    fn save_lazy_state(&self) -> LazyState {
        LazyState {
            int_constants: self.int_constants.clone(),
            atom_iden: self.atom_iden.clone(),
            integers: self.integers.clone(),
        }
    }

    fn restore_lazy_state(&mut self, state: LazyState) {
        self.int_constants = state.int_constants;
        self.atom_iden = state.atom_iden;
        self.integers = state.integers;
    }

    /// Adds a fact, naming it after its position the first time that
    /// position is seen
    ///
    /// Only facts and commands are named. Signature and field constraints are
    /// derived and stay unnamed.
    fn add_assertion_at(&mut self, assertion: Assertion, pos: &Pos) {
        match label_for(pos) {
            Some(label) if self.labels.insert(label.clone()) => {
                self.program.add_assertion(assertion.with_label(label))
            }
            Some(label) => {
                debug!("{} already names an assertion, leaving {} unnamed", label, assertion.comment());
                self.program.add_assertion(assertion)
            }
            None => self.program.add_assertion(assertion),
        }
    }

    /// Returns the `UInt` constant for `n`, declaring it on first use
    pub fn int_constant(&mut self, n: i32) -> Result<Arc<FunctionDeclaration>> {
        if let Some(constant) = self.int_constants.get(&n) {
            return Ok(Arc::clone(constant));
        }
        let constant = FunctionDeclaration::constant(format!("u_{}", n), Sort::UninterpretedInt);
        self.program.add_function(Arc::clone(&constant));
        let axiom = self
            .int_value
            .call(vec![constant.variable()])?
            .equals(Expression::int(i64::from(n)))?;
        self.program
            .add_assertion(Assertion::new(format!("{} = {}", constant.name(), n), axiom)?);
        self.int_constants.insert(n, Arc::clone(&constant));
        Ok(constant)
    }

    /// `{(u_n)}`
    pub fn int_relation(&mut self, n: i32) -> Result<Expression> {
        let constant = self.int_constant(n)?;
        Expression::mk_tuple(vec![constant.variable()])?.singleton()
    }

    /// The identity relation over atoms, declared on first use
    pub fn atom_iden(&mut self) -> Result<Expression> {
        if let Some(iden) = &self.atom_iden {
            return Ok(iden.variable());
        }
        let iden = FunctionDeclaration::constant(
            ATOM_IDEN_NAME,
            Sort::relation(vec![Sort::atom(), Sort::atom()]),
        );
        self.program.add_function(Arc::clone(&iden));
        let a = VariableDeclaration::new(self.fresh_name("a"), Sort::atom());
        let b = VariableDeclaration::new(self.fresh_name("b"), Sort::atom());
        let pair = Expression::mk_tuple(vec![a.variable(), b.variable()])?;
        let body = pair
            .member(iden.variable())?
            .equals(a.variable().equals(b.variable())?)?;
        let axiom = Expression::forall(vec![a, b], body)?;
        self.program
            .add_assertion(Assertion::new(format!("{} axiom", ATOM_IDEN_NAME), axiom)?);
        self.atom_iden = Some(Arc::clone(&iden));
        Ok(iden.variable())
    }

    /// The universe of uninterpreted integers, declared on first use
    pub fn integers(&mut self) -> Result<Expression> {
        if let Some(integers) = &self.integers {
            return Ok(integers.variable());
        }
        let integers = FunctionDeclaration::constant(INTEGERS_NAME, Sort::unary_int_relation());
        self.program.add_function(Arc::clone(&integers));
        let x = VariableDeclaration::new(self.fresh_name("x"), Sort::UninterpretedInt);
        let body = Expression::mk_tuple(vec![x.variable()])?.member(integers.variable())?;
        let axiom = Expression::forall(vec![x], body)?;
        self.program
            .add_assertion(Assertion::new(format!("{} axiom", INTEGERS_NAME), axiom)?);
        self.integers = Some(Arc::clone(&integers));
        Ok(integers.variable())
    }
}

/// Unsat-core label for a source position, if it is known
fn label_for(pos: &Pos) -> Option<String> {
    if pos.filename.is_empty() {
        return None;
    }
    let label = position_label(&pos.filename, pos.line, pos.column);
    debug_assert!(label.contains(NAMED_FORMULA_MARKER));
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble() {
        let translator = Translator::new(Options::default());
        let program = translator.program();
        assert_eq!(program.sorts().len(), 2);
        assert_eq!(program.sorts()[0].name, "Atom");
        assert_eq!(program.sorts()[1].name, "UInt");
        assert!(program.function(INT_VALUE_NAME).is_some());
        assert!(program.assertions().is_empty());
    }

    #[test]
    fn int_constants_are_memoised() {
        let mut translator = Translator::new(Options::default());
        let a = translator.int_constant(3).unwrap();
        let b = translator.int_constant(3).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(translator.program().functions().len(), 2);
        assert_eq!(translator.program().assertions().len(), 1);
        assert_eq!(a.name(), "u_3");
    }

    #[test]
    fn fresh_names_restart_per_session() {
        let mut first = Translator::new(Options::default());
        let mut second = Translator::new(Options::default());
        assert_eq!(first.fresh_name("x"), second.fresh_name("x"));
        assert_ne!(first.fresh_name("x"), first.fresh_name("x"));
    }

    #[test]
    fn labels_only_for_known_positions() {
        assert!(label_for(&Pos::default()).is_none());
        assert!(label_for(&Pos::new("a.als", 1, 1)).is_some());
    }
}
