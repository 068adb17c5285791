//! Expression and formula lowering
//!
//! Relational expressions become set-valued terms, formulas become boolean
//! terms. An [`Environment`] maps the source names of bound variables to the
//! terms that stand for them: `{x}` for a tuple variable `x`, or `x` itself
//! for a set variable.

use std::sync::Arc;

use log::trace;

use super::{relation_sort, Translator};
use crate::ast::{self, BinaryOp, ConstantExpr, Decl, Expr, ListOp, Multiplicity, Quantifier, UnaryOp};
use crate::error::{Error, Result};
use crate::smt::{self, Assertion, Environment, Expression, FunctionDeclaration, MultiArityOp, Sort, VariableDeclaration};

/// Maps a call name to a built-in integer operator
///
/// The `integer/` module prefix is optional.
pub(super) fn arithmetic_operator(name: &str) -> Option<smt::BinaryOp> {
    let name = name.strip_prefix("integer/").unwrap_or(name);
    match name {
        "plus" | "add" => Some(smt::BinaryOp::Plus),
        "minus" | "sub" => Some(smt::BinaryOp::Minus),
        "mul" => Some(smt::BinaryOp::Multiply),
        "div" => Some(smt::BinaryOp::Divide),
        "rem" => Some(smt::BinaryOp::Mod),
        _ => None,
    }
}

/// Variables and domain constraints introduced for one quantifier
#[derive(Default)]
struct Bindings {
    variables: Vec<Arc<VariableDeclaration>>,
    constraints: Vec<Expression>,
}

impl Translator {
    /// Translates a closed formula
    ///
    /// # Errors
    /// Fails with a sort mismatch if `expr` is not a formula
    pub fn translate_formula(&mut self, expr: &Expr) -> Result<Expression> {
        let env = Environment::new();
        let formula = self.translate_expr(expr, &env)?;
        if formula.sort() != Sort::Bool {
            return Err(Error::SortMismatch(format!(
                "expected a formula, got a term of sort {}",
                formula.sort()
            )));
        }
        Ok(formula)
    }

    /// Translates an expression under `env`
    pub fn translate_expr(&mut self, expr: &Expr, env: &Environment<'_>) -> Result<Expression> {
        match expr {
            Expr::Const(constant) => self.translate_constant(*constant),
            Expr::Number(n) => self.int_relation(*n),
            Expr::Sig(sig) if sig.is_builtin_int() => self.integers(),
            Expr::Sig(sig) => self.signature_expr(sig),
            Expr::Field(field) => self.field_expr(field),
            Expr::Var(var) => env
                .get(var.name())
                .cloned()
                .ok_or_else(|| Error::UnresolvedName(var.name().to_string())),
            Expr::Unary { op, expr } => self.translate_unary(*op, expr, env),
            Expr::Binary { op, left, right } => self.translate_binary(*op, left, right, env),
            Expr::List { op, exprs } => {
                let exprs = exprs
                    .iter()
                    .map(|e| self.translate_expr(e, env))
                    .collect::<Result<Vec<_>>>()?;
                match op {
                    ListOp::And => Expression::and_all(exprs),
                    ListOp::Or => Expression::or_all(exprs),
                }
            }
            Expr::Ite {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.translate_expr(condition, env)?;
                let then = self.translate_expr(then, env)?;
                let otherwise = self.translate_expr(otherwise, env)?;
                Expression::ite(condition, then, otherwise)
            }
            Expr::Let { var, value, body } => {
                let value = self.translate_expr(value, env)?;
                let mut scope = env.child();
                scope.put(var.name(), value);
                self.translate_expr(body, &scope)
            }
            Expr::Quantified {
                op: Quantifier::Comprehension,
                decls,
                body,
            } => self.translate_comprehension(decls, body, env),
            Expr::Quantified { op, decls, body } => self.translate_quantified(*op, decls, body, env),
            Expr::Call { name, args, .. } => self.translate_call(name, args, env),
        }
    }

    fn translate_constant(&mut self, constant: ConstantExpr) -> Result<Expression> {
        match constant {
            ConstantExpr::Univ => Expression::univ_set(Sort::unary_atom_relation()),
            ConstantExpr::None => Expression::empty_set(Sort::unary_atom_relation()),
            ConstantExpr::Iden => self.atom_iden(),
            ConstantExpr::Ints => self.integers(),
            ConstantExpr::True => Ok(Expression::bool(true)),
            ConstantExpr::False => Ok(Expression::bool(false)),
        }
    }

    fn translate_unary(&mut self, op: UnaryOp, expr: &Expr, env: &Environment<'_>) -> Result<Expression> {
        let operand = self.translate_expr(expr, env)?;
        match op {
            UnaryOp::Not => operand.not(),
            UnaryOp::No => {
                let sort = operand.sort();
                operand.equals(Expression::empty_set(sort)?)
            }
            UnaryOp::Some => self.non_empty(operand),
            UnaryOp::One => self.exactly_one(operand),
            UnaryOp::Lone => self.at_most_one(operand),
            UnaryOp::SetOf | UnaryOp::SomeOf | UnaryOp::LoneOf | UnaryOp::OneOf | UnaryOp::Noop => {
                Ok(operand)
            }
            UnaryOp::Transpose => operand.transpose(),
            UnaryOp::Closure => operand.closure(),
            UnaryOp::ReflexiveClosure => operand.closure()?.union(self.atom_iden()?),
            UnaryOp::Card => operand.card(),
        }
    }

    fn translate_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        env: &Environment<'_>,
    ) -> Result<Expression> {
        let left = self.translate_expr(left, env)?;
        let right = self.translate_expr(right, env)?;
        match op {
            BinaryOp::Join => left.join(right),
            BinaryOp::Arrow => left.product(right),
            BinaryOp::Union => left.union(right),
            BinaryOp::Intersection => left.intersection(right),
            BinaryOp::Minus => left.set_minus(right),
            BinaryOp::Override => {
                let domain = domain(right.clone())?;
                let overridden = domain_restrict(domain, left.clone())?;
                left.set_minus(overridden)?.union(right)
            }
            BinaryOp::DomainRestrict => domain_restrict(left, right),
            BinaryOp::RangeRestrict => range_restrict(left, right),
            BinaryOp::In => left.subset(right),
            BinaryOp::NotIn => left.subset(right)?.not(),
            BinaryOp::Equals => self.equality(left, right),
            BinaryOp::NotEquals => self.equality(left, right)?.not(),
            BinaryOp::And => left.and(right),
            BinaryOp::Or => left.or(right),
            BinaryOp::Implies => left.implies(right),
            BinaryOp::Iff => left.equals(right),
            BinaryOp::Lt => self.compare_integers(smt::BinaryOp::Lt, left, right),
            BinaryOp::Lte => self.compare_integers(smt::BinaryOp::Lte, left, right),
            BinaryOp::Gt => self.compare_integers(smt::BinaryOp::Gt, left, right),
            BinaryOp::Gte => self.compare_integers(smt::BinaryOp::Gte, left, right),
        }
    }

    /// `=` on equal sorts, integer equality between a count and an integer relation
    fn equality(&mut self, left: Expression, right: Expression) -> Result<Expression> {
        if left.sort() == right.sort() {
            left.equals(right)
        } else {
            self.compare_integers(smt::BinaryOp::Eq, left, right)
        }
    }

    /// Compares the values of two integer operands
    ///
    /// A native `Int` operand is used as it is. An integer relation `r`
    /// contributes `intValue(x)` for an existential `x` with `r = {(x)}`.
    fn compare_integers(&mut self, op: smt::BinaryOp, left: Expression, right: Expression) -> Result<Expression> {
        let mut bindings = Bindings::default();
        let left = self.integer_value(left, &mut bindings)?;
        let right = self.integer_value(right, &mut bindings)?;
        let comparison = Expression::binary(op, left, right)?;
        if bindings.variables.is_empty() {
            return Ok(comparison);
        }
        bindings.constraints.push(comparison);
        Expression::exists(bindings.variables, Expression::and_all(bindings.constraints)?)
    }

    fn integer_value(&mut self, operand: Expression, bindings: &mut Bindings) -> Result<Expression> {
        if operand.sort() == Sort::Int {
            return Ok(operand);
        }
        if operand.sort() != Sort::unary_int_relation() {
            return Err(Error::SortMismatch(format!(
                "expected an integer, got {} of sort {}",
                operand,
                operand.sort()
            )));
        }
        // {(c)} needs no existential
        if let Some(element) = singleton_element(&operand) {
            return self.int_value.call(vec![element.clone()]);
        }
        let x = VariableDeclaration::new(self.fresh_name("x"), Sort::UninterpretedInt);
        bindings
            .constraints
            .push(operand.equals(Expression::mk_tuple(vec![x.variable()])?.singleton()?)?);
        let value = self.int_value.call(vec![x.variable()])?;
        bindings.variables.push(x);
        Ok(value)
    }

    /// Binds the variables of one declaration in `scope`
    ///
    /// The bound is translated in `scope` before the new names are added, so
    /// it may refer to earlier declarations of the same quantifier.
    fn bind_decl(&mut self, decl: &Decl, scope: &mut Environment<'_>, bindings: &mut Bindings) -> Result<()> {
        let bound = self.translate_expr(decl.expr(), scope)?;
        let set_sort = bound.sort();
        let element = set_sort
            .element()
            .cloned()
            .ok_or_else(|| Error::SortMismatch(format!("quantifier bound {} is not a set", bound)))?;

        let mut images = Vec::with_capacity(decl.variables().len());
        for var in decl.variables() {
            let name = self.fresh_name(var.name());
            let (sort, probe_image) = match decl.multiplicity() {
                Multiplicity::One => {
                    let probe = VariableDeclaration::new(name.clone(), element.clone());
                    (element.clone(), probe.variable())
                }
                Multiplicity::Set | Multiplicity::Some | Multiplicity::Lone => {
                    let probe = VariableDeclaration::new(name.clone(), set_sort.clone());
                    (set_sort.clone(), probe.variable())
                }
                Multiplicity::No => {
                    return Err(Error::UnsupportedOperator(format!(
                        "'no' declaration of {}",
                        var.name()
                    )))
                }
            };
            let constraint = match decl.multiplicity() {
                Multiplicity::One => probe_image.member(bound.clone())?,
                Multiplicity::Some => {
                    let within = probe_image.clone().subset(bound.clone())?;
                    within.and(self.non_empty(probe_image)?)?
                }
                Multiplicity::Lone => {
                    let within = probe_image.clone().subset(bound.clone())?;
                    within.and(self.at_most_one(probe_image)?)?
                }
                _ => probe_image.subset(bound.clone())?,
            };
            let variable = VariableDeclaration::with_constraint(name, sort, Some(constraint.clone()))?;
            let image = match decl.multiplicity() {
                Multiplicity::One => variable.variable().singleton()?,
                _ => variable.variable(),
            };
            trace!("binding {} to {}", var.name(), image);
            scope.put(var.name(), image.clone());
            bindings.variables.push(variable);
            bindings.constraints.push(constraint);
            images.push(image);
        }

        if decl.is_disjoint() {
            for (i, a) in images.iter().enumerate() {
                for b in &images[i + 1..] {
                    let sort = a.sort();
                    let disjoint = a.clone().intersection(b.clone())?.equals(Expression::empty_set(sort)?)?;
                    bindings.constraints.push(disjoint);
                }
            }
        }
        Ok(())
    }

    fn translate_quantified(
        &mut self,
        op: Quantifier,
        decls: &[Decl],
        body: &Expr,
        env: &Environment<'_>,
    ) -> Result<Expression> {
        let mut scope = env.child();
        let mut bindings = Bindings::default();
        for decl in decls {
            self.bind_decl(decl, &mut scope, &mut bindings)?;
        }
        let body = self.translate_expr(body, &scope)?;
        let guard = Expression::and_all(bindings.constraints)?;
        let variables = bindings.variables;
        match op {
            Quantifier::All => Expression::forall(variables, guard.implies(body)?),
            Quantifier::Some => Expression::exists(variables, guard.and(body)?),
            Quantifier::No => Expression::exists(variables, guard.and(body)?)?.not(),
            Quantifier::One | Quantifier::Lone => {
                let witness = guard.and(body)?;
                let (copies, copy) = self.rename_copy(&variables, &witness)?;
                let same = Expression::and_all(
                    variables
                        .iter()
                        .zip(&copies)
                        .map(|(v, c)| v.variable().equals(c.variable()))
                        .collect::<Result<Vec<_>>>()?,
                )?;
                if op == Quantifier::One {
                    // ∃x. P(x) ∧ ∀y. P(y) ⇒ y = x
                    let unique = Expression::forall(copies, copy.implies(same)?)?;
                    Expression::exists(variables, witness.and(unique)?)
                } else {
                    // ∀x, y. P(x) ∧ P(y) ⇒ x = y
                    let mut all = variables;
                    all.extend(copies);
                    Expression::forall(all, witness.and(copy)?.implies(same)?)
                }
            }
            Quantifier::Comprehension => Err(Error::UnsupportedOperator(
                "comprehension in formula position".to_string(),
            )),
        }
    }

    /// Copies `formula` with every variable in `variables` renamed fresh
    fn rename_copy(
        &mut self,
        variables: &[Arc<VariableDeclaration>],
        formula: &Expression,
    ) -> Result<(Vec<Arc<VariableDeclaration>>, Expression)> {
        let mut copies = Vec::with_capacity(variables.len());
        let mut copy = formula.clone();
        for variable in variables {
            let fresh = VariableDeclaration::new(self.fresh_name(variable.name()), variable.sort().clone());
            copy = copy.substitute(variable, &fresh.variable())?;
            copies.push(fresh);
        }
        Ok((copies, copy))
    }

    /// `{x: e, y: f | body}` as a fresh relation over the enclosing variables
    fn translate_comprehension(&mut self, decls: &[Decl], body: &Expr, env: &Environment<'_>) -> Result<Expression> {
        let mut scope = env.child();
        let mut bindings = Bindings::default();
        for decl in decls {
            if decl.multiplicity() != Multiplicity::One {
                return Err(Error::UnsupportedOperator(format!(
                    "comprehension over {:?} declarations",
                    decl.multiplicity()
                )));
            }
            self.bind_decl(decl, &mut scope, &mut bindings)?;
        }
        let body = self.translate_expr(body, &scope)?;
        let definition = Expression::and_all(bindings.constraints)?.and(body)?;

        let outer: Vec<Arc<VariableDeclaration>> = definition
            .free_variables()
            .into_iter()
            .filter(|v| !bindings.variables.contains(v))
            .collect();
        let columns: Vec<ast::Column> = decls
            .iter()
            .flat_map(|d| d.variables().iter().flat_map(|v| v.columns().to_vec()))
            .collect();
        let relation = FunctionDeclaration::new(
            self.fresh_name("comprehension"),
            outer.iter().map(|v| v.sort().clone()).collect(),
            relation_sort(&columns),
        );
        self.program.add_function(Arc::clone(&relation));

        let application = relation.call(outer.iter().map(|v| v.variable()).collect())?;
        let mut tuple = bindings.variables[0].variable().singleton()?;
        for variable in &bindings.variables[1..] {
            tuple = tuple.product(variable.variable().singleton()?)?;
        }
        let mut quantified = outer;
        quantified.extend(bindings.variables);
        let axiom = Expression::forall(quantified, tuple.subset(application.clone())?.equals(definition)?)?;
        self.program
            .add_assertion(Assertion::new(format!("{} definition", relation.name()), axiom)?);
        Ok(application)
    }

    fn translate_call(&mut self, name: &str, args: &[Expr], env: &Environment<'_>) -> Result<Expression> {
        let Some(func) = self.functions.get(name).cloned() else {
            let op = arithmetic_operator(name).ok_or_else(|| Error::UnresolvedName(name.to_string()))?;
            if args.len() != 2 {
                return Err(Error::ArityMismatch {
                    function: name.to_string(),
                    expected: 2,
                    actual: args.len(),
                });
            }
            let a = self.translate_expr(&args[0], env)?;
            let b = self.translate_expr(&args[1], env)?;
            return self.lower_arithmetic(op, a, b, env);
        };

        let body = func
            .body()
            .ok_or_else(|| Error::UnresolvedName(format!("{} has no body", name)))?;
        if self.inlining.iter().any(|n| n == name) {
            return Err(Error::RecursiveCall(name.to_string()));
        }
        if func.params().len() != args.len() {
            return Err(Error::ArityMismatch {
                function: name.to_string(),
                expected: func.params().len(),
                actual: args.len(),
            });
        }

        // the body only sees its parameters
        let mut scope = Environment::new();
        for (param, arg) in func.params().iter().zip(args) {
            let actual = self.translate_expr(arg, env)?;
            scope.put(param.name(), actual);
        }
        self.inlining.push(name.to_string());
        let result = self.translate_expr(body, &scope);
        self.inlining.pop();
        result
    }
}

/// The element of `{(c)}`
fn singleton_element(expr: &Expression) -> Option<&Expression> {
    match expr {
        Expression::Unary {
            op: smt::UnaryOp::Singleton,
            expr,
        } => match expr.as_ref() {
            Expression::MultiArity {
                op: MultiArityOp::MkTuple,
                exprs,
            } if exprs.len() == 1 => exprs.first(),
            _ => None,
        },
        _ => None,
    }
}

/// Projection of a relation onto its first column
fn domain(relation: Expression) -> Result<Expression> {
    let mut result = relation;
    while result.sort().arity() > 1 {
        let last = result
            .sort()
            .columns()
            .and_then(|c| c.last().cloned())
            .ok_or_else(|| Error::SortMismatch(format!("domain of {}", result)))?;
        result = result.join(Expression::univ_set(Sort::relation(vec![last]))?)?;
    }
    Ok(result)
}

/// `set <: relation`
fn domain_restrict(set: Expression, relation: Expression) -> Result<Expression> {
    let sort = relation.sort();
    let columns = sort.columns().unwrap_or(&[]);
    if columns.len() <= 1 {
        return relation.intersection(set);
    }
    let rest = Expression::univ_set(Sort::relation(columns[1..].to_vec()))?;
    relation.intersection(set.product(rest)?)
}

/// `relation :> set`
fn range_restrict(relation: Expression, set: Expression) -> Result<Expression> {
    let sort = relation.sort();
    let columns = sort.columns().unwrap_or(&[]);
    if columns.len() <= 1 {
        return relation.intersection(set);
    }
    let init = Expression::univ_set(Sort::relation(columns[..columns.len() - 1].to_vec()))?;
    relation.intersection(init.product(set)?)
}
