//! Evaluation of terms against a solver model
//!
//! A model is a list of function definitions. Evaluating a term inlines
//! those definitions and folds everything that has become closed, until the
//! value is a literal or a set in normal form:
//!
//! ```text
//! set   := (as emptyset S) | (singleton tuple) | (union set set)
//! tuple := (mkTuple constant ...)
//! ```
//!
//! [`set_elements`] and [`tuple_atoms`] read that normal form back out.

use std::sync::Arc;

use log::trace;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::smt::{
    BinaryOp, Constant, Expression, FunctionDefinition, MultiArityOp, SmtModel, Sort, UnaryOp, Variable,
};

#[derive(Debug, Clone)]
enum Binding {
    Definition(Arc<FunctionDefinition>),
    Value(Expression),
}

/// Names visible while evaluating
///
/// The root scope holds the model's definitions. Each call of a definition
/// evaluates its body in a child of the root where the parameters are bound
/// to the (already evaluated) arguments.
#[derive(Debug, Default)]
pub struct Scope<'a> {
    bindings: FxHashMap<String, Binding>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Creates an empty root scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root scope with every definition of `model`
    pub fn from_model(model: &SmtModel) -> Self {
        let mut scope = Self::new();
        for function in model.functions() {
            scope.define(Arc::clone(function));
        }
        scope
    }

    /// Creates a nested scope
    pub fn child(&'a self) -> Scope<'a> {
        Scope {
            bindings: FxHashMap::default(),
            parent: Some(self),
        }
    }

    /// Adds a definition, shadowing any outer binding of the same name
    pub fn define(&mut self, function: Arc<FunctionDefinition>) {
        self.bindings
            .insert(function.name().to_string(), Binding::Definition(function));
    }

    /// Binds `name` to an evaluated value
    pub fn bind(&mut self, name: impl Into<String>, value: Expression) {
        self.bindings.insert(name.into(), Binding::Value(value));
    }

    /// Looks up a definition by name
    pub fn definition(&self, name: &str) -> Option<&Arc<FunctionDefinition>> {
        match self.lookup(name)? {
            Binding::Definition(function) => Some(function),
            Binding::Value(_) => None,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.bindings
            .get(name)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }

    fn root(&self) -> &Scope<'a> {
        let mut scope = self;
        while let Some(parent) = scope.parent {
            scope = parent;
        }
        scope
    }
}

impl Expression {
    /// Evaluates this term under `scope`
    ///
    /// # Errors
    /// [`Error::Evaluation`] for unbound names and quantifiers, which the
    /// evaluator does not expand; [`Error::ArityMismatch`] for calls with the
    /// wrong number of arguments.
    pub fn evaluate(&self, scope: &Scope<'_>) -> Result<Expression> {
        match self {
            Expression::Constant(_) | Expression::EmptySet(_) | Expression::UnivSet(_) => Ok(self.clone()),
            Expression::Variable(variable) => evaluate_variable(variable, scope),
            Expression::Unary { op, expr } => evaluate_unary(*op, expr.evaluate(scope)?),
            Expression::Binary { op, left, right } => {
                evaluate_binary(*op, left.evaluate(scope)?, right.evaluate(scope)?)
            }
            Expression::Ite {
                condition,
                then,
                otherwise,
            } => {
                let condition = condition.evaluate(scope)?;
                match condition.as_bool() {
                    Some(true) => then.evaluate(scope),
                    Some(false) => otherwise.evaluate(scope),
                    None => Expression::ite(condition, then.evaluate(scope)?, otherwise.evaluate(scope)?),
                }
            }
            Expression::MultiArity { op, exprs } => {
                let operands = exprs
                    .iter()
                    .map(|e| e.evaluate(scope))
                    .collect::<Result<Vec<_>>>()?;
                evaluate_multi(*op, operands)
            }
            Expression::Quantified { .. } => Err(Error::Evaluation(format!(
                "cannot evaluate quantified term {}",
                self
            ))),
            Expression::Call {
                function,
                arguments,
            } => {
                let definition = scope.definition(function.name()).ok_or_else(|| {
                    Error::Evaluation(format!("no definition for '{}'", function.name()))
                })?;
                let arguments = arguments
                    .iter()
                    .map(|a| a.evaluate(scope))
                    .collect::<Result<Vec<_>>>()?;
                apply(definition, arguments, scope)
            }
        }
    }
}

fn evaluate_variable(variable: &Variable, scope: &Scope<'_>) -> Result<Expression> {
    match scope.lookup(variable.name()) {
        Some(Binding::Value(value)) => Ok(value.clone()),
        Some(Binding::Definition(definition)) if definition.is_value() => {
            apply(definition, Vec::new(), scope)
        }
        Some(Binding::Definition(definition)) => Err(Error::Evaluation(format!(
            "function '{}' used without arguments",
            definition.name()
        ))),
        None => Err(Error::Evaluation(format!(
            "no value for '{}'",
            variable.name()
        ))),
    }
}

fn apply(definition: &FunctionDefinition, arguments: Vec<Expression>, scope: &Scope<'_>) -> Result<Expression> {
    if definition.inputs().len() != arguments.len() {
        return Err(Error::ArityMismatch {
            function: definition.name().to_string(),
            expected: definition.inputs().len(),
            actual: arguments.len(),
        });
    }
    trace!("evaluating {}", definition.name());
    let root = scope.root();
    let mut body_scope = root.child();
    for (input, argument) in definition.inputs().iter().zip(arguments) {
        body_scope.bind(input.name(), argument);
    }
    definition.body().evaluate(&body_scope)
}

fn evaluate_unary(op: UnaryOp, value: Expression) -> Result<Expression> {
    match op {
        UnaryOp::Not => match value.as_bool() {
            Some(b) => Ok(Expression::bool(!b)),
            None => value.not(),
        },
        UnaryOp::Card if is_value(&value) => {
            let count = set_elements(&value)?.len();
            i64::try_from(count)
                .map(Expression::int)
                .map_err(|_| Error::Evaluation(format!("cardinality {} out of range", count)))
        }
        _ => Expression::unary(op, value),
    }
}

fn evaluate_binary(op: BinaryOp, left: Expression, right: Expression) -> Result<Expression> {
    match op {
        BinaryOp::And => match (left.as_bool(), right.as_bool()) {
            (Some(false), _) | (_, Some(false)) => Ok(Expression::bool(false)),
            (Some(true), _) => Ok(right),
            (_, Some(true)) => Ok(left),
            _ => left.and(right),
        },
        BinaryOp::Or => match (left.as_bool(), right.as_bool()) {
            (Some(true), _) | (_, Some(true)) => Ok(Expression::bool(true)),
            (Some(false), _) => Ok(right),
            (_, Some(false)) => Ok(left),
            _ => left.or(right),
        },
        BinaryOp::Implies => match (left.as_bool(), right.as_bool()) {
            (Some(false), _) | (_, Some(true)) => Ok(Expression::bool(true)),
            (Some(true), _) => Ok(right),
            _ => left.implies(right),
        },
        BinaryOp::Eq if is_value(&left) && is_value(&right) => Ok(Expression::bool(same_value(&left, &right)?)),
        _ if op.is_arithmetic() || op.is_comparison() => match (left.as_int(), right.as_int()) {
            (Some(a), Some(b)) => fold_int(op, a, b),
            _ => Expression::binary(op, left, right),
        },
        BinaryOp::Member if is_value(&left) && is_value(&right) => {
            let elements = set_elements(&right)?;
            Ok(Expression::bool(elements.contains(&left)))
        }
        BinaryOp::Subset if is_value(&left) && is_value(&right) => {
            let superset = set_elements(&right)?;
            let subset = set_elements(&left)?;
            Ok(Expression::bool(subset.iter().all(|e| superset.contains(e))))
        }
        BinaryOp::Intersection | BinaryOp::SetMinus if is_value(&left) && is_value(&right) => {
            let sort = left.sort();
            let other = set_elements(&right)?;
            let keep = op == BinaryOp::Intersection;
            let elements = set_elements(&left)?
                .into_iter()
                .filter(|e| other.contains(e) == keep)
                .collect();
            set_of(sort, elements)
        }
        _ => Expression::binary(op, left, right),
    }
}

fn evaluate_multi(op: MultiArityOp, operands: Vec<Expression>) -> Result<Expression> {
    match op {
        MultiArityOp::And | MultiArityOp::Or => {
            let absorbing = op == MultiArityOp::Or;
            if operands.iter().any(|o| o.as_bool() == Some(absorbing)) {
                return Ok(Expression::bool(absorbing));
            }
            let open: Vec<Expression> = operands.into_iter().filter(|o| o.as_bool().is_none()).collect();
            match op {
                MultiArityOp::And => Expression::and_all(open),
                _ => Expression::or_all(open),
            }
        }
        MultiArityOp::MkTuple => Expression::mk_tuple(operands),
    }
}

/// Integer operations with SMT-LIB semantics (euclidean `div` and `mod`)
fn fold_int(op: BinaryOp, a: i64, b: i64) -> Result<Expression> {
    let overflow = || Error::Evaluation(format!("integer overflow in ({} {} {})", op.symbol(), a, b));
    let value = match op {
        BinaryOp::Gt => return Ok(Expression::bool(a > b)),
        BinaryOp::Gte => return Ok(Expression::bool(a >= b)),
        BinaryOp::Lt => return Ok(Expression::bool(a < b)),
        BinaryOp::Lte => return Ok(Expression::bool(a <= b)),
        BinaryOp::Plus => a.checked_add(b).ok_or_else(overflow)?,
        BinaryOp::Minus => a.checked_sub(b).ok_or_else(overflow)?,
        BinaryOp::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
        BinaryOp::Divide | BinaryOp::Mod if b == 0 => {
            return Err(Error::Evaluation(format!("({} {} 0) is unspecified", op.symbol(), a)))
        }
        BinaryOp::Divide => a.checked_div_euclid(b).ok_or_else(overflow)?,
        BinaryOp::Mod => a.checked_rem_euclid(b).ok_or_else(overflow)?,
        _ => return Err(Error::UnsupportedOperator(op.symbol().to_string())),
    };
    Ok(Expression::int(value))
}

/// Returns true for literals, closed tuples and sets in normal form
fn is_value(expr: &Expression) -> bool {
    match expr {
        Expression::Constant(_) | Expression::EmptySet(_) => true,
        Expression::MultiArity {
            op: MultiArityOp::MkTuple,
            exprs,
        } => exprs.iter().all(|e| matches!(e, Expression::Constant(_))),
        Expression::Unary {
            op: UnaryOp::Singleton,
            expr,
        } => is_value(expr),
        Expression::Binary {
            op: BinaryOp::Union,
            left,
            right,
        } => is_value(left) && is_value(right),
        _ => false,
    }
}

fn same_value(left: &Expression, right: &Expression) -> Result<bool> {
    if left.sort().is_set() {
        let l = set_elements(left)?;
        let r = set_elements(right)?;
        Ok(l.iter().all(|e| r.contains(e)) && r.iter().all(|e| l.contains(e)))
    } else {
        Ok(left == right)
    }
}

fn set_of(sort: Sort, elements: Vec<Expression>) -> Result<Expression> {
    let mut singletons = elements.into_iter().map(Expression::singleton);
    let Some(first) = singletons.next() else {
        return Expression::empty_set(sort);
    };
    singletons.try_fold(first?, |set, singleton| set.union(singleton?))
}

/// Elements of a set in normal form, in order of appearance, without repeats
///
/// # Errors
/// [`Error::MalformedModel`] for anything but `union`, `singleton` and
/// `emptyset` nodes
pub fn set_elements(expr: &Expression) -> Result<Vec<Expression>> {
    fn collect(expr: &Expression, out: &mut Vec<Expression>) -> Result<()> {
        match expr {
            Expression::EmptySet(_) => Ok(()),
            Expression::Unary {
                op: UnaryOp::Singleton,
                expr,
            } => {
                if !out.contains(&**expr) {
                    out.push((**expr).clone());
                }
                Ok(())
            }
            Expression::Binary {
                op: BinaryOp::Union,
                left,
                right,
            } => {
                collect(left, out)?;
                collect(right, out)
            }
            other => Err(Error::MalformedModel(format!("{} is not a set value", other))),
        }
    }
    let mut elements = Vec::new();
    collect(expr, &mut elements)?;
    Ok(elements)
}

/// Names of the atoms of a `mkTuple` of uninterpreted constants
///
/// # Errors
/// [`Error::MalformedModel`] for any other shape
pub fn tuple_atoms(expr: &Expression) -> Result<Vec<Expression>> {
    match expr {
        Expression::MultiArity {
            op: MultiArityOp::MkTuple,
            exprs,
        } if exprs
            .iter()
            .all(|e| matches!(e, Expression::Constant(Constant::Uninterpreted { .. }))) =>
        {
            Ok(exprs.clone())
        }
        other => Err(Error::MalformedModel(format!("{} is not a tuple of atoms", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_model;
    use crate::smt::VariableDeclaration;

    fn atom(name: &str) -> Expression {
        Expression::uninterpreted(name, Sort::atom()).unwrap()
    }

    fn unary_set(atoms: &[&str]) -> Expression {
        let elements = atoms
            .iter()
            .map(|a| Expression::mk_tuple(vec![atom(a)]).unwrap())
            .collect();
        set_of(Sort::unary_atom_relation(), elements).unwrap()
    }

    #[test]
    fn normal_form_flattens_in_order() {
        let set = unary_set(&["atom1", "atom2"]);
        let elements = set_elements(&set).unwrap();
        let atoms: Vec<Expression> = elements
            .iter()
            .flat_map(|t| tuple_atoms(t).unwrap())
            .collect();
        assert_eq!(atoms, vec![atom("atom1"), atom("atom2")]);
    }

    #[test]
    fn empty_set_flattens_to_nothing() {
        let empty = Expression::empty_set(Sort::unary_atom_relation()).unwrap();
        assert!(set_elements(&empty).unwrap().is_empty());
    }

    #[test]
    fn residual_shapes_are_malformed() {
        let r = Expression::univ_set(Sort::unary_atom_relation()).unwrap();
        assert!(matches!(set_elements(&r), Err(Error::MalformedModel(_))));
        let pair = Expression::mk_tuple(vec![Expression::int(1)]).unwrap();
        assert!(matches!(tuple_atoms(&pair), Err(Error::MalformedModel(_))));
    }

    #[test]
    fn folds_ite_over_constant_equality() {
        let model = parse_model(
            "(model
               (define-fun f ((x Atom)) Int (ite (= x @uc_Atom_0) 7 (ite (= x @uc_Atom_1) 8 9)))
               (define-fun a () Atom @uc_Atom_1))",
        )
        .unwrap();
        let scope = Scope::from_model(&model);
        let f = model.function("f").unwrap().declaration().clone();
        let a = model.function("a").unwrap().declaration().variable();
        let value = Expression::call(f, vec![a]).unwrap().evaluate(&scope).unwrap();
        assert_eq!(value, Expression::int(8));
    }

    #[test]
    fn folds_arithmetic_and_sets() {
        let scope = Scope::new();
        let sum = Expression::binary(BinaryOp::Plus, Expression::int(-7), Expression::int(3)).unwrap();
        let modulo = Expression::binary(BinaryOp::Mod, sum, Expression::int(3)).unwrap();
        assert_eq!(modulo.evaluate(&scope).unwrap(), Expression::int(2));

        let ab = unary_set(&["a", "b"]);
        let ba = unary_set(&["b", "a"]);
        assert_eq!(ab.clone().equals(ba).unwrap().evaluate(&scope).unwrap(), Expression::bool(true));
        assert_eq!(ab.card().unwrap().evaluate(&scope).unwrap(), Expression::int(2));
    }

    #[test]
    fn unbound_names_and_quantifiers_fail() {
        let scope = Scope::new();
        let x = VariableDeclaration::new("x", Sort::Int);
        assert!(matches!(x.variable().evaluate(&scope), Err(Error::Evaluation(_))));
        let q = Expression::forall(vec![x.clone()], x.variable().equals(x.variable()).unwrap()).unwrap();
        assert!(matches!(q.evaluate(&scope), Err(Error::Evaluation(_))));
    }

    #[test]
    fn parameters_do_not_leak_into_callees() {
        let x = VariableDeclaration::new("x", Sort::Int);
        let g = FunctionDefinition::new("g", Vec::new(), Sort::Int, x.variable()).unwrap();
        let body = Expression::binary(BinaryOp::Plus, x.variable(), g.declaration().variable()).unwrap();
        let f = FunctionDefinition::new("f", vec![x.clone()], Sort::Int, body).unwrap();
        let mut scope = Scope::new();
        scope.define(Arc::clone(&g));
        scope.define(Arc::clone(&f));

        let call = Expression::call(Arc::clone(f.declaration()), vec![Expression::int(1)]).unwrap();
        // `g` sees the root scope, where `x` is unbound
        assert!(matches!(call.evaluate(&scope), Err(Error::Evaluation(_))));
    }
}
