//! Declarations: variables, functions and function definitions
//!
//! Declarations are created once and shared through `Arc`; every later
//! reference points at the same declaration.

use std::sync::Arc;

use super::expr::{Expression, Variable};
use super::sort::Sort;
use crate::error::{Error, Result};

/// A bound or free variable with an optional domain constraint
///
/// The constraint is a boolean formula over the variable (e.g. membership
/// in the set the variable ranges over). It takes no part in equality.
#[derive(Clone, Debug)]
pub struct VariableDeclaration {
    name: String,
    sort: Sort,
    constraint: Option<Expression>,
}

impl VariableDeclaration {
    /// Creates an unconstrained variable declaration
    pub fn new(name: impl Into<String>, sort: Sort) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            sort,
            constraint: None,
        })
    }

    /// Creates a variable declaration with a domain constraint
    ///
    /// # Errors
    /// Returns a sort mismatch if the constraint is not boolean
    pub fn with_constraint(
        name: impl Into<String>,
        sort: Sort,
        constraint: Option<Expression>,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        if let Some(c) = &constraint {
            if c.sort() != Sort::Bool {
                return Err(Error::SortMismatch(format!(
                    "constraint of '{}' must be Bool, got {}",
                    name,
                    c.sort()
                )));
            }
        }
        Ok(Arc::new(Self {
            name,
            sort,
            constraint,
        }))
    }

    /// Returns the name of this variable
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the sort of this variable
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Returns the domain constraint, if any
    pub fn constraint(&self) -> Option<&Expression> {
        self.constraint.as_ref()
    }

    /// Returns a variable expression referring to this declaration
    pub fn variable(self: &Arc<Self>) -> Expression {
        Expression::Variable(Variable::Bound(Arc::clone(self)))
    }
}

impl PartialEq for VariableDeclaration {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sort == other.sort
    }
}

impl Eq for VariableDeclaration {}

/// A declared (uninterpreted) function
///
/// Signatures and fields are nullary functions whose output sort is a
/// relation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionDeclaration {
    name: String,
    input_sorts: Vec<Sort>,
    output_sort: Sort,
}

impl FunctionDeclaration {
    /// Creates a function declaration
    pub fn new(name: impl Into<String>, input_sorts: Vec<Sort>, output_sort: Sort) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            input_sorts,
            output_sort,
        })
    }

    /// Creates a nullary function declaration (a constant)
    pub fn constant(name: impl Into<String>, sort: Sort) -> Arc<Self> {
        Self::new(name, Vec::new(), sort)
    }

    /// Returns the function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the input sorts
    pub fn input_sorts(&self) -> &[Sort] {
        &self.input_sorts
    }

    /// Returns the output sort
    pub fn output_sort(&self) -> &Sort {
        &self.output_sort
    }

    /// Returns true if the function takes no arguments
    pub fn is_nullary(&self) -> bool {
        self.input_sorts.is_empty()
    }

    /// Returns the symbol of this function as an expression
    ///
    /// For nullary functions this is the constant's value.
    pub fn variable(self: &Arc<Self>) -> Expression {
        Expression::Variable(Variable::Function(Arc::clone(self)))
    }

    /// Applies this function to arguments, or returns the symbol itself when
    /// there are no arguments and the function is nullary
    pub fn call(self: &Arc<Self>, arguments: Vec<Expression>) -> Result<Expression> {
        if arguments.is_empty() && self.is_nullary() {
            return Ok(self.variable());
        }
        Expression::call(Arc::clone(self), arguments)
    }
}

/// A function with parameters and a body
///
/// Used both for translator-introduced derived relations and for the
/// function definitions a solver reports in a model.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    declaration: Arc<FunctionDeclaration>,
    inputs: Vec<Arc<VariableDeclaration>>,
    body: Expression,
}

impl FunctionDefinition {
    /// Creates a function definition
    ///
    /// # Errors
    /// Returns a sort mismatch if the body's sort differs from `output_sort`
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<Arc<VariableDeclaration>>,
        output_sort: Sort,
        body: Expression,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        let body_sort = body.sort();
        if body_sort != output_sort {
            return Err(Error::SortMismatch(format!(
                "body of '{}' has sort {} but {} was declared",
                name, body_sort, output_sort
            )));
        }
        let input_sorts = inputs.iter().map(|v| v.sort().clone()).collect();
        Ok(Arc::new(Self {
            declaration: FunctionDeclaration::new(name, input_sorts, output_sort),
            inputs,
            body,
        }))
    }

    /// Creates a zero-argument definition whose body is `value`
    pub fn constant(name: impl Into<String>, value: Expression) -> Arc<Self> {
        let sort = value.sort();
        Arc::new(Self {
            declaration: FunctionDeclaration::constant(name, sort),
            inputs: Vec::new(),
            body: value,
        })
    }

    /// Returns the function name
    pub fn name(&self) -> &str {
        self.declaration.name()
    }

    /// Returns the underlying declaration
    pub fn declaration(&self) -> &Arc<FunctionDeclaration> {
        &self.declaration
    }

    /// Returns the input variables
    pub fn inputs(&self) -> &[Arc<VariableDeclaration>] {
        &self.inputs
    }

    /// Returns the body
    pub fn body(&self) -> &Expression {
        &self.body
    }

    /// Returns the output sort
    pub fn output_sort(&self) -> &Sort {
        self.declaration.output_sort()
    }

    /// Returns true if this definition denotes a value (no inputs)
    pub fn is_value(&self) -> bool {
        self.inputs.is_empty()
    }
}
