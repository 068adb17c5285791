//! Shared helpers for the integration tests
//!
//! `ToyModel` is a tiny finite-domain checker: quantifiers over `UInt`
//! are expanded over a fixed list of integer atoms, then the library's
//! evaluator decides the quantifier-free rest.

#![allow(dead_code)]

use std::sync::Arc;

use alloy2smt_rs::engine::evaluator::Scope;
use alloy2smt_rs::smt::{
    BinaryOp, Expression, FunctionDefinition, MultiArityOp, QuantifierOp, Sort, UnaryOp,
    VariableDeclaration,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `UInt` atoms `@uc_UInt_0 .. @uc_UInt_{n-1}` whose value is their index
pub struct ToyModel {
    integers: Vec<Expression>,
    definitions: Vec<Arc<FunctionDefinition>>,
}

impl ToyModel {
    pub fn new(size: usize, int_value: &str) -> Self {
        let integers: Vec<Expression> = (0..size)
            .map(|i| Expression::uninterpreted(format!("@uc_UInt_{}", i), Sort::UninterpretedInt).unwrap())
            .collect();

        // intValue(x) = ite(x = u0, 0, ite(x = u1, 1, ...))
        let x = VariableDeclaration::new("BOUND_VARIABLE_1", Sort::UninterpretedInt);
        let mut body = Expression::int(0);
        for (i, atom) in integers.iter().enumerate().rev() {
            let condition = x.variable().equals(atom.clone()).unwrap();
            body = Expression::ite(condition, Expression::int(i as i64), body).unwrap();
        }
        let int_value = FunctionDefinition::new(int_value, vec![x], Sort::Int, body).unwrap();

        Self {
            integers,
            definitions: vec![int_value],
        }
    }

    /// The atom whose value is `n`
    pub fn int(&self, n: usize) -> Expression {
        self.integers[n].clone()
    }

    /// `{(a) | a in values}`
    pub fn int_set(&self, values: &[usize]) -> Expression {
        let mut set = Expression::empty_set(Sort::unary_int_relation()).unwrap();
        for &v in values {
            let element = Expression::mk_tuple(vec![self.int(v)]).unwrap().singleton().unwrap();
            set = set.union(element).unwrap();
        }
        set
    }

    pub fn define(&mut self, name: &str, value: Expression) {
        self.definitions.push(FunctionDefinition::constant(name, value));
    }

    pub fn scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for definition in &self.definitions {
            scope.define(Arc::clone(definition));
        }
        scope
    }

    /// Decides a closed formula
    pub fn holds(&self, formula: &Expression) -> bool {
        let scope = self.scope();
        self.holds_in(formula, &scope)
    }

    fn holds_in(&self, formula: &Expression, scope: &Scope<'_>) -> bool {
        match formula {
            Expression::Quantified { op, variables, body } => {
                let (first, rest) = variables.split_first().expect("quantifier without variables");
                let inner = if rest.is_empty() {
                    (**body).clone()
                } else {
                    Expression::quantified(*op, rest.to_vec(), (**body).clone()).unwrap()
                };
                let mut instances = self
                    .candidates(first.sort())
                    .into_iter()
                    .map(|value| inner.substitute(first, &value).unwrap());
                match op {
                    QuantifierOp::Forall => instances.all(|f| self.holds_in(&f, scope)),
                    QuantifierOp::Exists => instances.any(|f| self.holds_in(&f, scope)),
                }
            }
            Expression::MultiArity {
                op: MultiArityOp::And,
                exprs,
            } => exprs.iter().all(|e| self.holds_in(e, scope)),
            Expression::MultiArity {
                op: MultiArityOp::Or,
                exprs,
            } => exprs.iter().any(|e| self.holds_in(e, scope)),
            Expression::Binary { op, left, right } if *op == BinaryOp::And => {
                self.holds_in(left, scope) && self.holds_in(right, scope)
            }
            Expression::Binary { op, left, right } if *op == BinaryOp::Or => {
                self.holds_in(left, scope) || self.holds_in(right, scope)
            }
            Expression::Binary { op, left, right } if *op == BinaryOp::Implies => {
                !self.holds_in(left, scope) || self.holds_in(right, scope)
            }
            Expression::Unary { op, expr } if *op == UnaryOp::Not => !self.holds_in(expr, scope),
            other => other
                .evaluate(scope)
                .unwrap_or_else(|e| panic!("cannot evaluate {}: {}", other, e))
                .as_bool()
                .unwrap_or_else(|| panic!("{} did not reduce to a boolean", other)),
        }
    }

    fn candidates(&self, sort: &Sort) -> Vec<Expression> {
        match sort {
            Sort::UninterpretedInt => self.integers.clone(),
            Sort::Tuple(columns) if columns.as_slice() == [Sort::UninterpretedInt] => self
                .integers
                .iter()
                .map(|i| Expression::mk_tuple(vec![i.clone()]).unwrap())
                .collect(),
            other => panic!("the toy model cannot enumerate {}", other),
        }
    }
}
