//! Expressions of the SMT term algebra
//!
//! Expressions are immutable trees. The variants are public so that
//! printers and evaluators can match on them, but new nodes should be built
//! through the checked constructors ([`Expression::unary`],
//! [`Expression::binary`], ...), which reject ill-sorted operands with
//! [`Error::SortMismatch`].

use std::sync::Arc;

use super::decl::{FunctionDeclaration, VariableDeclaration};
use super::sort::Sort;
use crate::error::{Error, Result};

/// Literal values
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Boolean literal
    Bool(bool),
    /// Native integer literal
    Int(i64),
    /// Element of an uninterpreted sort, e.g. an atom reported by the solver
    #[expect(missing_docs)]
    Uninterpreted { name: String, sort: Sort },
}

impl Constant {
    /// Returns the sort of this literal
    pub fn sort(&self) -> Sort {
        match self {
            Constant::Bool(_) => Sort::Bool,
            Constant::Int(_) => Sort::Int,
            Constant::Uninterpreted { sort, .. } => sort.clone(),
        }
    }
}

/// Reference to a declared symbol
///
/// Either a bound/free variable or a function symbol. Nullary function
/// symbols are how signatures and fields appear inside expressions.
#[derive(Clone, Debug)]
pub enum Variable {
    /// A variable declaration
    Bound(Arc<VariableDeclaration>),
    /// A function symbol
    Function(Arc<FunctionDeclaration>),
}

impl Variable {
    /// Returns the referenced name
    pub fn name(&self) -> &str {
        match self {
            Variable::Bound(decl) => decl.name(),
            Variable::Function(decl) => decl.name(),
        }
    }

    /// Returns the sort of the referenced symbol
    pub fn sort(&self) -> &Sort {
        match self {
            Variable::Bound(decl) => decl.sort(),
            Variable::Function(decl) => decl.output_sort(),
        }
    }

    /// Returns the variable declaration, if this is not a function symbol
    pub fn declaration(&self) -> Option<&Arc<VariableDeclaration>> {
        match self {
            Variable::Bound(decl) => Some(decl),
            Variable::Function(_) => None,
        }
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::Bound(a), Variable::Bound(b)) => a == b,
            (Variable::Function(a), Variable::Function(b)) => {
                Arc::ptr_eq(a, b) || a.name() == b.name() && a.output_sort() == b.output_sort()
            }
            _ => false,
        }
    }
}

/// Unary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Boolean negation
    Not,
    /// `{t}` for a tuple `t`
    Singleton,
    /// Transpose of a binary relation
    Transpose,
    /// Transitive closure of a binary relation
    TClosure,
    /// Set cardinality
    Card,
}

/// Binary operators
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Disjunction
    Or,
    /// Conjunction
    And,
    /// Implication
    Implies,
    /// Equality of two terms of the same sort
    Eq,
    /// Integer `>`
    Gt,
    /// Integer `>=`
    Gte,
    /// Integer `<`
    Lt,
    /// Integer `<=`
    Lte,
    /// Integer addition
    Plus,
    /// Integer subtraction
    Minus,
    /// Integer multiplication
    Multiply,
    /// Integer division
    Divide,
    /// Integer remainder
    Mod,
    /// Set union
    Union,
    /// Set intersection
    Intersection,
    /// Set difference
    SetMinus,
    /// Tuple membership
    Member,
    /// Set inclusion
    Subset,
    /// Relational join
    Join,
    /// Cartesian product
    Product,
}

/// Operators taking any number of operands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MultiArityOp {
    /// N-ary conjunction
    And,
    /// N-ary disjunction
    Or,
    /// Tuple constructor
    MkTuple,
}

/// Quantifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantifierOp {
    /// Universal quantifier
    Forall,
    /// Existential quantifier
    Exists,
}

impl UnaryOp {
    /// Returns the SMT-LIB symbol
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Singleton => "singleton",
            UnaryOp::Transpose => "transpose",
            UnaryOp::TClosure => "tclosure",
            UnaryOp::Card => "card",
        }
    }
}

impl BinaryOp {
    /// Returns the SMT-LIB symbol
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Implies => "=>",
            BinaryOp::Eq => "=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Union => "union",
            BinaryOp::Intersection => "intersection",
            BinaryOp::SetMinus => "setminus",
            BinaryOp::Member => "member",
            BinaryOp::Subset => "subset",
            BinaryOp::Join => "join",
            BinaryOp::Product => "product",
        }
    }

    /// Returns true for `+ - * div mod`
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Mod
        )
    }

    /// Returns true for `> >= < <=`
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Gt | BinaryOp::Gte | BinaryOp::Lt | BinaryOp::Lte)
    }
}

impl MultiArityOp {
    /// Returns the SMT-LIB symbol
    pub fn symbol(self) -> &'static str {
        match self {
            MultiArityOp::And => "and",
            MultiArityOp::Or => "or",
            MultiArityOp::MkTuple => "mkTuple",
        }
    }
}

impl QuantifierOp {
    /// Returns the SMT-LIB symbol
    pub fn symbol(self) -> &'static str {
        match self {
            QuantifierOp::Forall => "forall",
            QuantifierOp::Exists => "exists",
        }
    }
}

/// A well-sorted term
#[derive(Clone, Debug, PartialEq)]
#[expect(missing_docs)]
pub enum Expression {
    Constant(Constant),
    Variable(Variable),
    /// `(as emptyset S)`
    EmptySet(Sort),
    /// `(as univset S)`
    UnivSet(Sort),
    Unary {
        op: UnaryOp,
        expr: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Ite {
        condition: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
    MultiArity {
        op: MultiArityOp,
        exprs: Vec<Expression>,
    },
    Quantified {
        op: QuantifierOp,
        variables: Vec<Arc<VariableDeclaration>>,
        body: Box<Expression>,
    },
    Call {
        function: Arc<FunctionDeclaration>,
        arguments: Vec<Expression>,
    },
}

fn mismatch(message: String) -> Error {
    Error::SortMismatch(message)
}

fn relation_columns<'a>(op: BinaryOp, left: &'a Sort, right: &'a Sort) -> Result<(&'a [Sort], &'a [Sort])> {
    match (left.is_set().then(|| left.columns()).flatten(), right.is_set().then(|| right.columns()).flatten()) {
        (Some(l), Some(r)) if !l.is_empty() && !r.is_empty() => Ok((l, r)),
        _ => Err(mismatch(format!(
            "{} expects two relations, got {} and {}",
            op.symbol(),
            left,
            right
        ))),
    }
}

fn join_columns(left: &[Sort], right: &[Sort]) -> Vec<Sort> {
    let init = left.split_last().map_or(&[][..], |(_, init)| init);
    let tail = right.split_first().map_or(&[][..], |(_, tail)| tail);
    init.iter().chain(tail).cloned().collect()
}

fn binary_sort(op: BinaryOp, left: &Sort, right: &Sort) -> Result<Sort> {
    match op {
        BinaryOp::Or | BinaryOp::And | BinaryOp::Implies => {
            if *left == Sort::Bool && *right == Sort::Bool {
                Ok(Sort::Bool)
            } else {
                Err(mismatch(format!(
                    "{} expects Bool operands, got {} and {}",
                    op.symbol(),
                    left,
                    right
                )))
            }
        }
        BinaryOp::Eq => {
            if left == right {
                Ok(Sort::Bool)
            } else {
                Err(mismatch(format!("= between {} and {}", left, right)))
            }
        }
        BinaryOp::Gt
        | BinaryOp::Gte
        | BinaryOp::Lt
        | BinaryOp::Lte
        | BinaryOp::Plus
        | BinaryOp::Minus
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Mod => {
            if *left != Sort::Int || *right != Sort::Int {
                return Err(mismatch(format!(
                    "{} expects Int operands, got {} and {}",
                    op.symbol(),
                    left,
                    right
                )));
            }
            Ok(if op.is_comparison() { Sort::Bool } else { Sort::Int })
        }
        BinaryOp::Union | BinaryOp::Intersection | BinaryOp::SetMinus | BinaryOp::Subset => {
            if !left.is_set() || left != right {
                return Err(mismatch(format!(
                    "{} expects two sets of the same sort, got {} and {}",
                    op.symbol(),
                    left,
                    right
                )));
            }
            Ok(if op == BinaryOp::Subset { Sort::Bool } else { left.clone() })
        }
        BinaryOp::Member => match right.element() {
            Some(element) if element == left => Ok(Sort::Bool),
            _ => Err(mismatch(format!("member of {} in {}", left, right))),
        },
        BinaryOp::Join => {
            let (l, r) = relation_columns(op, left, right)?;
            if l.last() != r.first() {
                return Err(mismatch(format!(
                    "join columns do not agree: {} and {}",
                    left, right
                )));
            }
            let columns = join_columns(l, r);
            if columns.is_empty() {
                return Err(mismatch(format!(
                    "join of {} and {} has no columns",
                    left, right
                )));
            }
            Ok(Sort::relation(columns))
        }
        BinaryOp::Product => {
            let (l, r) = relation_columns(op, left, right)?;
            Ok(Sort::relation(l.iter().chain(r).cloned().collect()))
        }
    }
}

fn unary_sort(op: UnaryOp, sort: &Sort) -> Result<Sort> {
    match op {
        UnaryOp::Not if *sort == Sort::Bool => Ok(Sort::Bool),
        UnaryOp::Singleton if sort.is_tuple() => Ok(Sort::Set(Box::new(sort.clone()))),
        UnaryOp::Transpose if sort.is_set() && sort.arity() == 2 => {
            let columns = sort.columns().map_or_else(Vec::new, |c| c.iter().rev().cloned().collect());
            Ok(Sort::relation(columns))
        }
        UnaryOp::TClosure if sort.is_set() && sort.arity() == 2 => match sort.columns() {
            Some([a, b]) if a == b => Ok(sort.clone()),
            _ => Err(mismatch(format!("tclosure over mixed columns {}", sort))),
        },
        UnaryOp::Card if sort.is_set() => Ok(Sort::Int),
        _ => Err(mismatch(format!("{} applied to {}", op.symbol(), sort))),
    }
}

impl Expression {
    /// Boolean literal
    pub fn bool(value: bool) -> Expression {
        Expression::Constant(Constant::Bool(value))
    }

    /// Integer literal
    pub fn int(value: i64) -> Expression {
        Expression::Constant(Constant::Int(value))
    }

    /// Element of an uninterpreted sort
    ///
    /// # Errors
    /// Returns a sort mismatch unless `sort` is atomic and neither Bool nor Int
    pub fn uninterpreted(name: impl Into<String>, sort: Sort) -> Result<Expression> {
        match sort {
            Sort::Uninterpreted(_) | Sort::UninterpretedInt => Ok(Expression::Constant(
                Constant::Uninterpreted {
                    name: name.into(),
                    sort,
                },
            )),
            other => Err(mismatch(format!("{} is not an uninterpreted sort", other))),
        }
    }

    /// The empty set of `sort`
    pub fn empty_set(sort: Sort) -> Result<Expression> {
        if !sort.is_set() {
            return Err(mismatch(format!("emptyset of non-set sort {}", sort)));
        }
        Ok(Expression::EmptySet(sort))
    }

    /// The universe set of `sort`
    pub fn univ_set(sort: Sort) -> Result<Expression> {
        if !sort.is_set() {
            return Err(mismatch(format!("univset of non-set sort {}", sort)));
        }
        Ok(Expression::UnivSet(sort))
    }

    /// Checked unary node
    pub fn unary(op: UnaryOp, expr: Expression) -> Result<Expression> {
        unary_sort(op, &expr.sort())?;
        Ok(Expression::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    /// Checked binary node
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Result<Expression> {
        binary_sort(op, &left.sort(), &right.sort())?;
        Ok(Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// Checked if-then-else
    pub fn ite(condition: Expression, then: Expression, otherwise: Expression) -> Result<Expression> {
        if condition.sort() != Sort::Bool {
            return Err(mismatch(format!("ite condition has sort {}", condition.sort())));
        }
        if then.sort() != otherwise.sort() {
            return Err(mismatch(format!(
                "ite branches have sorts {} and {}",
                then.sort(),
                otherwise.sort()
            )));
        }
        Ok(Expression::Ite {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Checked multi-arity node
    pub fn multi(op: MultiArityOp, exprs: Vec<Expression>) -> Result<Expression> {
        if exprs.is_empty() {
            return Err(mismatch(format!("{} needs at least one operand", op.symbol())));
        }
        for expr in &exprs {
            let sort = expr.sort();
            let ok = match op {
                MultiArityOp::And | MultiArityOp::Or => sort == Sort::Bool,
                MultiArityOp::MkTuple => sort.is_atomic(),
            };
            if !ok {
                return Err(mismatch(format!("{} operand of sort {}", op.symbol(), sort)));
            }
        }
        Ok(Expression::MultiArity { op, exprs })
    }

    /// Checked quantifier
    pub fn quantified(
        op: QuantifierOp,
        variables: Vec<Arc<VariableDeclaration>>,
        body: Expression,
    ) -> Result<Expression> {
        if variables.is_empty() {
            return Err(mismatch(format!("{} without bound variables", op.symbol())));
        }
        if body.sort() != Sort::Bool {
            return Err(mismatch(format!("{} body has sort {}", op.symbol(), body.sort())));
        }
        Ok(Expression::Quantified {
            op,
            variables,
            body: Box::new(body),
        })
    }

    /// Checked function application
    ///
    /// # Errors
    /// [`Error::ArityMismatch`] on a wrong argument count, a sort mismatch on a
    /// wrongly sorted argument
    pub fn call(function: Arc<FunctionDeclaration>, arguments: Vec<Expression>) -> Result<Expression> {
        if function.input_sorts().len() != arguments.len() {
            return Err(Error::ArityMismatch {
                function: function.name().to_string(),
                expected: function.input_sorts().len(),
                actual: arguments.len(),
            });
        }
        for (expected, argument) in function.input_sorts().iter().zip(&arguments) {
            let actual = argument.sort();
            if *expected != actual {
                return Err(mismatch(format!(
                    "argument of '{}' has sort {} but {} was declared",
                    function.name(),
                    actual,
                    expected
                )));
            }
        }
        Ok(Expression::Call {
            function,
            arguments,
        })
    }

    /// Conjunction of any number of formulas (`true` when empty)
    pub fn and_all(mut exprs: Vec<Expression>) -> Result<Expression> {
        match exprs.len() {
            0 => Ok(Expression::bool(true)),
            1 => Ok(exprs.remove(0)),
            _ => Expression::multi(MultiArityOp::And, exprs),
        }
    }

    /// Disjunction of any number of formulas (`false` when empty)
    pub fn or_all(mut exprs: Vec<Expression>) -> Result<Expression> {
        match exprs.len() {
            0 => Ok(Expression::bool(false)),
            1 => Ok(exprs.remove(0)),
            _ => Expression::multi(MultiArityOp::Or, exprs),
        }
    }

    /// Tuple of atomic terms
    pub fn mk_tuple(exprs: Vec<Expression>) -> Result<Expression> {
        Expression::multi(MultiArityOp::MkTuple, exprs)
    }

    /// Universal quantification
    pub fn forall(variables: Vec<Arc<VariableDeclaration>>, body: Expression) -> Result<Expression> {
        Expression::quantified(QuantifierOp::Forall, variables, body)
    }

    /// Existential quantification
    pub fn exists(variables: Vec<Arc<VariableDeclaration>>, body: Expression) -> Result<Expression> {
        Expression::quantified(QuantifierOp::Exists, variables, body)
    }

    /// `not self`
    pub fn not(self) -> Result<Expression> {
        Expression::unary(UnaryOp::Not, self)
    }

    /// `{self}`
    pub fn singleton(self) -> Result<Expression> {
        Expression::unary(UnaryOp::Singleton, self)
    }

    /// `~self`
    pub fn transpose(self) -> Result<Expression> {
        Expression::unary(UnaryOp::Transpose, self)
    }

    /// `^self`
    pub fn closure(self) -> Result<Expression> {
        Expression::unary(UnaryOp::TClosure, self)
    }

    /// `#self`
    pub fn card(self) -> Result<Expression> {
        Expression::unary(UnaryOp::Card, self)
    }

    /// `self and other`
    pub fn and(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::And, self, other)
    }

    /// `self or other`
    pub fn or(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Or, self, other)
    }

    /// `self => other`
    pub fn implies(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Implies, self, other)
    }

    /// `self = other`
    pub fn equals(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Eq, self, other)
    }

    /// `self ∈ set`
    pub fn member(self, set: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Member, self, set)
    }

    /// `self ⊆ other`
    pub fn subset(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Subset, self, other)
    }

    /// `self ∪ other`
    pub fn union(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Union, self, other)
    }

    /// `self ∩ other`
    pub fn intersection(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Intersection, self, other)
    }

    /// `self \ other`
    pub fn set_minus(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::SetMinus, self, other)
    }

    /// `self . other`
    pub fn join(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Join, self, other)
    }

    /// `self -> other`
    pub fn product(self, other: Expression) -> Result<Expression> {
        Expression::binary(BinaryOp::Product, self, other)
    }

    /// Returns the sort of this expression, computed from its structure
    pub fn sort(&self) -> Sort {
        match self {
            Expression::Constant(c) => c.sort(),
            Expression::Variable(v) => v.sort().clone(),
            Expression::EmptySet(sort) | Expression::UnivSet(sort) => sort.clone(),
            Expression::Unary { op, expr } => match op {
                UnaryOp::Not => Sort::Bool,
                UnaryOp::Card => Sort::Int,
                UnaryOp::Singleton => Sort::Set(Box::new(expr.sort())),
                UnaryOp::TClosure => expr.sort(),
                UnaryOp::Transpose => {
                    let sort = expr.sort();
                    let columns = sort.columns().map_or_else(Vec::new, |c| c.iter().rev().cloned().collect());
                    Sort::Set(Box::new(Sort::Tuple(columns)))
                }
            },
            Expression::Binary { op, left, right } => match op {
                BinaryOp::Or
                | BinaryOp::And
                | BinaryOp::Implies
                | BinaryOp::Eq
                | BinaryOp::Gt
                | BinaryOp::Gte
                | BinaryOp::Lt
                | BinaryOp::Lte
                | BinaryOp::Member
                | BinaryOp::Subset => Sort::Bool,
                BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Mod => {
                    Sort::Int
                }
                BinaryOp::Union | BinaryOp::Intersection | BinaryOp::SetMinus => left.sort(),
                BinaryOp::Join | BinaryOp::Product => {
                    let (l, r) = (left.sort(), right.sort());
                    let l = l.columns().unwrap_or(&[]);
                    let r = r.columns().unwrap_or(&[]);
                    let columns = if *op == BinaryOp::Join {
                        join_columns(l, r)
                    } else {
                        l.iter().chain(r).cloned().collect()
                    };
                    Sort::Set(Box::new(Sort::Tuple(columns)))
                }
            },
            Expression::Ite { then, .. } => then.sort(),
            Expression::MultiArity { op, exprs } => match op {
                MultiArityOp::And | MultiArityOp::Or => Sort::Bool,
                MultiArityOp::MkTuple => Sort::Tuple(exprs.iter().map(Expression::sort).collect()),
            },
            Expression::Quantified { .. } => Sort::Bool,
            Expression::Call { function, .. } => function.output_sort().clone(),
        }
    }

    /// Returns true for literals and set literals
    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expression::Constant(_) | Expression::EmptySet(_) | Expression::UnivSet(_)
        )
    }

    /// Returns the boolean value of a boolean literal
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expression::Constant(Constant::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value of an integer literal
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expression::Constant(Constant::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Returns the free variables of this expression
    ///
    /// Function symbols are never free variables. The result is
    /// deduplicated and ordered by first occurrence.
    pub fn free_variables(&self) -> Vec<Arc<VariableDeclaration>> {
        let mut bound = Vec::new();
        let mut free = Vec::new();
        self.collect_free(&mut bound, &mut free);
        free
    }

    fn collect_free(&self, bound: &mut Vec<String>, free: &mut Vec<Arc<VariableDeclaration>>) {
        match self {
            Expression::Constant(_) | Expression::EmptySet(_) | Expression::UnivSet(_) => {}
            Expression::Variable(Variable::Function(_)) => {}
            Expression::Variable(Variable::Bound(decl)) => {
                if !bound.iter().any(|name| name == decl.name()) && !free.contains(decl) {
                    free.push(Arc::clone(decl));
                }
            }
            Expression::Unary { expr, .. } => expr.collect_free(bound, free),
            Expression::Binary { left, right, .. } => {
                left.collect_free(bound, free);
                right.collect_free(bound, free);
            }
            Expression::Ite {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_free(bound, free);
                then.collect_free(bound, free);
                otherwise.collect_free(bound, free);
            }
            Expression::MultiArity { exprs, .. } => {
                for expr in exprs {
                    expr.collect_free(bound, free);
                }
            }
            Expression::Call { arguments, .. } => {
                for argument in arguments {
                    argument.collect_free(bound, free);
                }
            }
            Expression::Quantified { variables, body, .. } => {
                let depth = bound.len();
                bound.extend(variables.iter().map(|v| v.name().to_string()));
                body.collect_free(bound, free);
                bound.truncate(depth);
            }
        }
    }

    /// Returns true if `variable` occurs free in this expression
    pub fn occurs_free(&self, variable: &VariableDeclaration) -> bool {
        self.free_variables().iter().any(|v| **v == *variable)
    }

    /// Rebuilds this node from the images of its direct children
    ///
    /// Quantifier binders are kept as they are; only the body is mapped.
    pub fn map_children<F>(&self, mut f: F) -> Result<Expression>
    where
        F: FnMut(&Expression) -> Result<Expression>,
    {
        match self {
            Expression::Constant(_)
            | Expression::Variable(_)
            | Expression::EmptySet(_)
            | Expression::UnivSet(_) => Ok(self.clone()),
            Expression::Unary { op, expr } => Expression::unary(*op, f(expr)?),
            Expression::Binary { op, left, right } => Expression::binary(*op, f(left)?, f(right)?),
            Expression::Ite {
                condition,
                then,
                otherwise,
            } => Expression::ite(f(condition)?, f(then)?, f(otherwise)?),
            Expression::MultiArity { op, exprs } => {
                let exprs = exprs.iter().map(&mut f).collect::<Result<Vec<_>>>()?;
                Expression::multi(*op, exprs)
            }
            Expression::Quantified {
                op,
                variables,
                body,
            } => Expression::quantified(*op, variables.clone(), f(body)?),
            Expression::Call {
                function,
                arguments,
            } => {
                let arguments = arguments.iter().map(&mut f).collect::<Result<Vec<_>>>()?;
                Expression::call(Arc::clone(function), arguments)
            }
        }
    }

    /// Replaces every free occurrence of `old` with `new`
    ///
    /// A binder that rebinds `old`'s name stops the descent. A binder that
    /// would capture a free variable of `new` is an error.
    ///
    /// # Errors
    /// [`Error::SortMismatch`] if `new` has a different sort than `old`,
    /// [`Error::VariableCapture`] on capture
    pub fn substitute(&self, old: &VariableDeclaration, new: &Expression) -> Result<Expression> {
        if new.sort() != *old.sort() {
            return Err(mismatch(format!(
                "cannot substitute {} of sort {} for '{}' of sort {}",
                new,
                new.sort(),
                old.name(),
                old.sort()
            )));
        }
        let captured: Vec<String> = new
            .free_variables()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        self.substitute_in(old, new, &captured)
    }

    fn substitute_in(&self, old: &VariableDeclaration, new: &Expression, captured: &[String]) -> Result<Expression> {
        match self {
            Expression::Variable(Variable::Bound(decl)) if **decl == *old => Ok(new.clone()),
            Expression::Quantified {
                op,
                variables,
                body,
            } => {
                if variables.iter().any(|v| v.name() == old.name()) || !body.occurs_free(old) {
                    return Ok(self.clone());
                }
                if let Some(v) = variables.iter().find(|v| captured.iter().any(|c| c == v.name())) {
                    return Err(Error::VariableCapture {
                        variable: v.name().to_string(),
                        expression: self.to_string(),
                    });
                }
                let body = body.substitute_in(old, new, captured)?;
                Expression::quantified(*op, variables.clone(), body)
            }
            _ => self.map_children(|child| child.substitute_in(old, new, captured)),
        }
    }

    /// Replaces every subtree structurally equal to `old` with `new`
    ///
    /// Does not descend under a binder that rebinds `old` when `old` is a
    /// variable. Rebuilt nodes are sort checked again.
    pub fn replace(&self, old: &Expression, new: &Expression) -> Result<Expression> {
        if self == old {
            return Ok(new.clone());
        }
        if let (
            Expression::Quantified { variables, .. },
            Expression::Variable(Variable::Bound(decl)),
        ) = (self, old)
        {
            if variables.iter().any(|v| v.name() == decl.name()) {
                return Ok(self.clone());
            }
        }
        self.map_children(|child| child.replace(old, new))
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        Expression::Variable(variable)
    }
}

impl From<Constant> for Expression {
    fn from(constant: Constant) -> Self {
        Expression::Constant(constant)
    }
}
