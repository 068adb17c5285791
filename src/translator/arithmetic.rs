//! Integer arithmetic over integer relations
//!
//! `a + b` on relations of `UInt` atoms has no direct counterpart in the
//! theory of sets. Each operation is replaced by a fresh function `R` over
//! the enclosing quantified variables, axiomatised through `intValue`.

use std::sync::Arc;

use log::debug;

use super::Translator;
use crate::error::{Error, Result};
use crate::smt::{self, Assertion, Environment, Expression, FunctionDeclaration, Sort, VariableDeclaration};

/// An operand of an arithmetic operation
enum Operand {
    /// A native `Int` term, used as a value directly
    Value(Expression),
    /// A unary `UInt` relation
    Relation(Expression),
}

impl Operand {
    fn new(expr: Expression) -> Result<Self> {
        let sort = expr.sort();
        if sort == Sort::Int {
            Ok(Operand::Value(expr))
        } else if sort == Sort::unary_int_relation() {
            Ok(Operand::Relation(expr))
        } else {
            Err(Error::SortMismatch(format!(
                "arithmetic operand {} has sort {}",
                expr, sort
            )))
        }
    }

    fn replace(&self, old: &Expression, new: &Expression) -> Result<Self> {
        Ok(match self {
            Operand::Value(e) => Operand::Value(e.replace(old, new)?),
            Operand::Relation(e) => Operand::Relation(e.replace(old, new)?),
        })
    }
}

/// Universal closure that disappears over no variables
fn forall(variables: Vec<Arc<VariableDeclaration>>, body: Expression) -> Result<Expression> {
    if variables.is_empty() {
        Ok(body)
    } else {
        Expression::forall(variables, body)
    }
}

fn exists(variables: Vec<Arc<VariableDeclaration>>, body: Expression) -> Result<Expression> {
    if variables.is_empty() {
        Ok(body)
    } else {
        Expression::exists(variables, body)
    }
}

fn unary_tuple(element: Expression) -> Result<Expression> {
    Expression::mk_tuple(vec![element])
}

impl Translator {
    /// Lowers `op(a, b)` to a call of a fresh, axiomatised function
    ///
    /// The result is a unary `UInt` relation. The function takes the
    /// variables of enclosing binders that occur in `a` or `b` (or in their
    /// domain constraints), so each instantiation gets its own value.
    pub fn lower_arithmetic(
        &mut self,
        op: smt::BinaryOp,
        a: Expression,
        b: Expression,
        env: &Environment<'_>,
    ) -> Result<Expression> {
        let name = op_name(op).ok_or_else(|| Error::UnsupportedOperator(op.symbol().to_string()))?;
        let mut a = Operand::new(a)?;
        let mut b = Operand::new(b)?;

        let parameters = enclosing_variables(&a, &b, env);

        // quantified variables, their constraints and the axiom's arguments
        let mut quantified = Vec::with_capacity(parameters.len());
        let mut constraints = Vec::new();
        let mut axiom_arguments = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            if let Some(constraint) = parameter.constraint() {
                constraints.push(constraint.clone());
            }
        }
        for parameter in &parameters {
            let sort = parameter.sort();
            if sort.is_set() {
                // a set variable stands for one of its elements
                let element_sort = sort
                    .element()
                    .cloned()
                    .ok_or_else(|| Error::SortMismatch(format!("set variable {}", parameter.name())))?;
                let element = VariableDeclaration::new(self.fresh_name("e"), element_sort);
                let old = parameter.variable();
                let new = element.variable().singleton()?;
                a = a.replace(&old, &new)?;
                b = b.replace(&old, &new)?;
                constraints = constraints
                    .iter()
                    .map(|c| c.replace(&old, &new))
                    .collect::<Result<Vec<_>>>()?;
                axiom_arguments.push(new);
                quantified.push(element);
            } else {
                axiom_arguments.push(parameter.variable());
                quantified.push(Arc::clone(parameter));
            }
        }

        let singletons = self.options.integer_singletons_only;
        let output = if singletons {
            Sort::Tuple(vec![Sort::UninterpretedInt])
        } else {
            Sort::unary_int_relation()
        };
        let result = FunctionDeclaration::new(
            self.fresh_name(name),
            parameters.iter().map(|p| p.sort().clone()).collect(),
            output,
        );
        debug!("lowering {} into {}", op.symbol(), result.name());
        self.program.add_function(Arc::clone(&result));
        let at_axiom = result.call(axiom_arguments)?;
        let guard = Expression::and_all(constraints)?;

        if singletons {
            let axiom = self.singleton_axiom(op, &a, &b, at_axiom)?;
            let axiom = if guard.as_bool() == Some(true) {
                forall(quantified, axiom)?
            } else {
                forall(quantified, guard.implies(axiom)?)?
            };
            self.program
                .add_assertion(Assertion::new(format!("{} axiom", result.name()), axiom)?);
        } else {
            let [sound, complete] = self.inclusion_axioms(op, &a, &b, at_axiom, &quantified, &guard)?;
            self.program
                .add_assertion(Assertion::new(format!("{} axiom 1", result.name()), sound)?);
            self.program
                .add_assertion(Assertion::new(format!("{} axiom 2", result.name()), complete)?);
        }

        let at_use = result.call(parameters.iter().map(|p| p.variable()).collect())?;
        if singletons {
            at_use.singleton()
        } else {
            Ok(at_use)
        }
    }

    /// `∃x,y,z. A = {(x)} ∧ B = {(y)} ∧ R = (z) ∧ op(x, y) = z` on values
    fn singleton_axiom(&mut self, op: smt::BinaryOp, a: &Operand, b: &Operand, at_axiom: Expression) -> Result<Expression> {
        let mut variables = Vec::new();
        let mut conjuncts = Vec::new();
        let x = self.singleton_value(a, &mut variables, &mut conjuncts)?;
        let y = self.singleton_value(b, &mut variables, &mut conjuncts)?;
        let z = VariableDeclaration::new(self.fresh_name("z"), Sort::UninterpretedInt);
        conjuncts.push(at_axiom.equals(unary_tuple(z.variable())?)?);
        let value = self.int_value.call(vec![z.variable()])?;
        conjuncts.push(Expression::binary(op, x, y)?.equals(value)?);
        variables.push(z);
        exists(variables, Expression::and_all(conjuncts)?)
    }

    fn singleton_value(
        &mut self,
        operand: &Operand,
        variables: &mut Vec<Arc<VariableDeclaration>>,
        conjuncts: &mut Vec<Expression>,
    ) -> Result<Expression> {
        match operand {
            Operand::Value(value) => Ok(value.clone()),
            Operand::Relation(relation) => {
                let x = VariableDeclaration::new(self.fresh_name("x"), Sort::UninterpretedInt);
                conjuncts.push(relation.clone().equals(unary_tuple(x.variable())?.singleton()?)?);
                let value = self.int_value.call(vec![x.variable()])?;
                variables.push(x);
                Ok(value)
            }
        }
    }

    fn member_value(
        &mut self,
        operand: &Operand,
        variables: &mut Vec<Arc<VariableDeclaration>>,
        conjuncts: &mut Vec<Expression>,
    ) -> Result<Expression> {
        match operand {
            Operand::Value(value) => Ok(value.clone()),
            Operand::Relation(relation) => {
                let x = VariableDeclaration::new(self.fresh_name("x"), Sort::UninterpretedInt);
                conjuncts.push(unary_tuple(x.variable())?.member(relation.clone())?);
                let value = self.int_value.call(vec![x.variable()])?;
                variables.push(x);
                Ok(value)
            }
        }
    }

    /// Both inclusions between `R` and `{op(x, y) | x ∈ A, y ∈ B}`
    fn inclusion_axioms(
        &mut self,
        op: smt::BinaryOp,
        a: &Operand,
        b: &Operand,
        at_axiom: Expression,
        quantified: &[Arc<VariableDeclaration>],
        guard: &Expression,
    ) -> Result<[Expression; 2]> {
        // ∀args, z. C ∧ (z) ∈ R ⇒ ∃x,y. (x) ∈ A ∧ (y) ∈ B ∧ op(x, y) = z
        let z = VariableDeclaration::new(self.fresh_name("z"), Sort::UninterpretedInt);
        let z_value = self.int_value.call(vec![z.variable()])?;
        let z_in_result = unary_tuple(z.variable())?.member(at_axiom.clone())?;
        let mut operands = Vec::new();
        let mut conjuncts = Vec::new();
        let x = self.member_value(a, &mut operands, &mut conjuncts)?;
        let y = self.member_value(b, &mut operands, &mut conjuncts)?;
        conjuncts.push(Expression::binary(op, x, y)?.equals(z_value)?);
        let witness = exists(operands, Expression::and_all(conjuncts)?)?;
        let mut variables = quantified.to_vec();
        variables.push(z);
        let sound = forall(
            variables,
            guard.clone().and(z_in_result)?.implies(witness)?,
        )?;

        // ∀args, x, y. C ∧ (x) ∈ A ∧ (y) ∈ B ⇒ ∃z. (z) ∈ R ∧ op(x, y) = z
        let mut operands = Vec::new();
        let mut premises = vec![guard.clone()];
        let x = self.member_value(a, &mut operands, &mut premises)?;
        let y = self.member_value(b, &mut operands, &mut premises)?;
        let z = VariableDeclaration::new(self.fresh_name("z"), Sort::UninterpretedInt);
        let z_value = self.int_value.call(vec![z.variable()])?;
        let image = unary_tuple(z.variable())?
            .member(at_axiom)?
            .and(Expression::binary(op, x, y)?.equals(z_value)?)?;
        let image = Expression::exists(vec![z], image)?;
        let mut variables = quantified.to_vec();
        variables.extend(operands);
        let complete = forall(variables, Expression::and_all(premises)?.implies(image)?)?;

        Ok([sound, complete])
    }
}

/// Prefix of the function lowering `op`, or `None` if `op` is not arithmetic
fn op_name(op: smt::BinaryOp) -> Option<&'static str> {
    match op {
        smt::BinaryOp::Plus => Some("plus"),
        smt::BinaryOp::Minus => Some("minus"),
        smt::BinaryOp::Multiply => Some("mul"),
        smt::BinaryOp::Divide => Some("div"),
        smt::BinaryOp::Mod => Some("rem"),
        _ => None,
    }
}

/// Variables of enclosing binders that `a`, `b` or their constraints mention
///
/// Ordered by first occurrence.
fn enclosing_variables(a: &Operand, b: &Operand, env: &Environment<'_>) -> Vec<Arc<VariableDeclaration>> {
    let mut candidates: Vec<Arc<VariableDeclaration>> = Vec::new();
    for operand in [a, b] {
        let expr = match operand {
            Operand::Value(e) | Operand::Relation(e) => e,
        };
        candidates.extend(expr.free_variables());
    }
    let mut variables: Vec<Arc<VariableDeclaration>> = Vec::new();
    let mut next = 0;
    while next < candidates.len() {
        let variable = Arc::clone(&candidates[next]);
        next += 1;
        if variables.contains(&variable) || !env.binds_variable(&variable) {
            continue;
        }
        if let Some(constraint) = variable.constraint() {
            candidates.extend(constraint.free_variables());
        }
        variables.push(variable);
    }
    variables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::Options;

    fn plus(options: Options) -> (Translator, Expression) {
        let mut translator = Translator::new(options);
        let env = Environment::new();
        let two = translator.int_relation(2).unwrap();
        let three = translator.int_relation(3).unwrap();
        let result = translator
            .lower_arithmetic(smt::BinaryOp::Plus, two, three, &env)
            .unwrap();
        (translator, result)
    }

    #[test]
    fn singleton_mode_returns_singleton_of_call() {
        let (translator, result) = plus(Options::default());
        assert_eq!(result.sort(), Sort::unary_int_relation());
        assert_eq!(result.to_string(), "(singleton plus_1)");
        let axiom = translator.program().assertions().last().unwrap();
        assert_eq!(axiom.comment(), "plus_1 axiom");
        assert!(axiom.expression().to_string().starts_with("(exists ((x_2 UInt) (x_3 UInt) (z_4 UInt))"));
    }

    #[test]
    fn general_mode_emits_two_axioms() {
        let (translator, result) = plus(Options {
            integer_singletons_only: false,
        });
        assert_eq!(result.to_string(), "plus_1");
        let comments: Vec<&str> = translator
            .program()
            .assertions()
            .iter()
            .map(|a| a.comment())
            .collect();
        assert!(comments.contains(&"plus_1 axiom 1"));
        assert!(comments.contains(&"plus_1 axiom 2"));
    }

    #[test]
    fn cardinalities_are_used_directly() {
        let mut translator = Translator::new(Options::default());
        let set = FunctionDeclaration::constant("this/A", Sort::unary_atom_relation());
        let env = Environment::new();
        let one = translator.int_relation(1).unwrap();
        translator
            .lower_arithmetic(smt::BinaryOp::Plus, set.variable().card().unwrap(), one, &env)
            .unwrap();
        let axiom = translator.program().assertions().last().unwrap().expression().to_string();
        assert!(axiom.contains("(card this/A)"), "{}", axiom);
        assert!(!axiom.contains("(x_2 UInt) (x_3 UInt)"), "{}", axiom);
    }

    #[test]
    fn enclosing_variables_become_parameters() {
        let mut translator = Translator::new(Options::default());
        let x = VariableDeclaration::new("i_9", Sort::Tuple(vec![Sort::UninterpretedInt]));
        let mut env = Environment::new();
        env.put("i", x.variable().singleton().unwrap());
        let one = translator.int_relation(1).unwrap();
        let result = translator
            .lower_arithmetic(smt::BinaryOp::Plus, x.variable().singleton().unwrap(), one, &env)
            .unwrap();
        assert!(result.to_string().contains("i_9"));
        let declared = translator.program().functions().last().unwrap().declaration().clone();
        assert_eq!(declared.input_sorts(), &[Sort::Tuple(vec![Sort::UninterpretedInt])]);
    }

    #[test]
    fn rejects_non_arithmetic() {
        let mut translator = Translator::new(Options::default());
        let env = Environment::new();
        let result = translator.lower_arithmetic(smt::BinaryOp::Union, Expression::int(1), Expression::int(2), &env);
        assert!(matches!(result, Err(Error::UnsupportedOperator(_))));
    }

    #[test]
    fn function_names_follow_the_operator() {
        assert_eq!(op_name(smt::BinaryOp::Mod), Some("rem"));
        assert_eq!(op_name(smt::BinaryOp::Divide), Some("div"));
        assert_eq!(op_name(smt::BinaryOp::Member), None);
        assert_eq!(op_name(smt::BinaryOp::Lt), None);
    }
}
