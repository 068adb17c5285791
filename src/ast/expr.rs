//! Relational expressions and formulas
//!
//! A single expression type covers both relational terms and formulas, as in
//! the source calculus. [`Expr::columns`] is empty exactly for formulas.

use super::{Column, ExprVar, Field, Pos, Sig};

/// Built-in constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantExpr {
    /// All atoms
    Univ,
    /// Empty unary relation
    None,
    /// Identity relation over atoms
    Iden,
    /// All integers
    Ints,
    /// Formula `true`
    True,
    /// Formula `false`
    False,
}

/// Multiplicity of a declaration, bound or signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// At least one element
    Some,
    /// Exactly one element
    One,
    /// At most one element
    Lone,
    /// No elements
    No,
    /// Any number of elements
    Set,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Negation
    Not,
    /// `no e`
    No,
    /// `some e`
    Some,
    /// `lone e`
    Lone,
    /// `one e`
    One,
    /// Bound marker `set e`
    SetOf,
    /// Bound marker `some e`
    SomeOf,
    /// Bound marker `lone e`
    LoneOf,
    /// Bound marker `one e`
    OneOf,
    /// `~e`
    Transpose,
    /// `^e`
    Closure,
    /// `*e`
    ReflexiveClosure,
    /// `#e`
    Card,
    /// Grouping without meaning
    Noop,
}

impl UnaryOp {
    /// The multiplicity of a bound marker
    pub fn marker_multiplicity(self) -> Option<Multiplicity> {
        match self {
            UnaryOp::SetOf => Some(Multiplicity::Set),
            UnaryOp::SomeOf => Some(Multiplicity::Some),
            UnaryOp::LoneOf => Some(Multiplicity::Lone),
            UnaryOp::OneOf => Some(Multiplicity::One),
            _ => None,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a.b`
    Join,
    /// `a -> b`
    Arrow,
    /// `a + b`
    Union,
    /// `a & b`
    Intersection,
    /// `a - b`
    Minus,
    /// `a ++ b`
    Override,
    /// `a <: b`
    DomainRestrict,
    /// `a :> b`
    RangeRestrict,
    /// `a in b`
    In,
    /// `a !in b`
    NotIn,
    /// `a = b`
    Equals,
    /// `a != b`
    NotEquals,
    /// `a && b`
    And,
    /// `a || b`
    Or,
    /// `a => b`
    Implies,
    /// `a <=> b`
    Iff,
    /// `a < b`
    Lt,
    /// `a =< b`
    Lte,
    /// `a > b`
    Gt,
    /// `a >= b`
    Gte,
}

impl BinaryOp {
    /// Returns true for operators producing a formula
    pub fn is_formula(self) -> bool {
        !matches!(
            self,
            BinaryOp::Join
                | BinaryOp::Arrow
                | BinaryOp::Union
                | BinaryOp::Intersection
                | BinaryOp::Minus
                | BinaryOp::Override
                | BinaryOp::DomainRestrict
                | BinaryOp::RangeRestrict
        )
    }
}

/// N-ary connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListOp {
    /// Conjunction
    And,
    /// Disjunction
    Or,
}

/// Quantifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// `all`
    All,
    /// `some`
    Some,
    /// `no`
    No,
    /// `lone`
    Lone,
    /// `one`
    One,
    /// Set comprehension `{x: e | f}`
    Comprehension,
}

/// Variable declarations of a quantifier: `disj x, y: mult e`
#[derive(Clone, Debug, PartialEq)]
pub struct Decl {
    variables: Vec<ExprVar>,
    multiplicity: Multiplicity,
    expr: Expr,
    disjoint: bool,
}

impl Decl {
    /// Creates a declaration
    ///
    /// # Panics
    /// Panics if there are no variables or a variable's arity differs from
    /// the bound's
    pub fn new(variables: Vec<ExprVar>, multiplicity: Multiplicity, expr: Expr) -> Self {
        assert!(!variables.is_empty(), "declaration needs a variable");
        let arity = expr.columns().len();
        for v in &variables {
            assert_eq!(
                v.arity(),
                arity,
                "variable {} has arity {} but its bound has arity {}",
                v.name(),
                v.arity(),
                arity
            );
        }
        Self {
            variables,
            multiplicity,
            expr,
            disjoint: false,
        }
    }

    /// `x: one e`
    pub fn one_of(variable: ExprVar, expr: Expr) -> Self {
        Self::new(vec![variable], Multiplicity::One, expr)
    }

    /// `x: lone e`
    pub fn lone_of(variable: ExprVar, expr: Expr) -> Self {
        Self::new(vec![variable], Multiplicity::Lone, expr)
    }

    /// `x: some e`
    pub fn some_of(variable: ExprVar, expr: Expr) -> Self {
        Self::new(vec![variable], Multiplicity::Some, expr)
    }

    /// `x: set e`
    pub fn set_of(variable: ExprVar, expr: Expr) -> Self {
        Self::new(vec![variable], Multiplicity::Set, expr)
    }

    /// Creates a declaration from a bound that may carry a multiplicity marker
    ///
    /// Without a marker unary bounds default to `one`, others to `set`.
    pub fn from_bound(variables: Vec<ExprVar>, bound: &Expr) -> Self {
        let (multiplicity, expr) = bound.split_marker();
        Self::new(variables, multiplicity, expr.clone())
    }

    /// Marks the variables pairwise disjoint
    pub fn disjoint(mut self) -> Self {
        self.disjoint = true;
        self
    }

    /// Returns the declared variables
    pub fn variables(&self) -> &[ExprVar] {
        &self.variables
    }

    /// Returns the multiplicity
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Returns the bound expression
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Returns true if the variables are pairwise disjoint
    pub fn is_disjoint(&self) -> bool {
        self.disjoint
    }
}

/// A relational expression or formula
#[expect(missing_docs)]
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(ConstantExpr),
    /// Integer literal
    Number(i32),
    Sig(Sig),
    Field(Field),
    Var(ExprVar),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    List {
        op: ListOp,
        exprs: Vec<Expr>,
    },
    Ite {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Let {
        var: ExprVar,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    Quantified {
        op: Quantifier,
        decls: Vec<Decl>,
        body: Box<Expr>,
    },
    /// Call of a user function or built-in integer operator, by name
    Call {
        name: String,
        args: Vec<Expr>,
        columns: Vec<Column>,
        pos: Pos,
    },
}

impl Expr {
    /// Universal relation
    pub const UNIV: Expr = Expr::Const(ConstantExpr::Univ);
    /// Empty relation
    pub const NONE: Expr = Expr::Const(ConstantExpr::None);
    /// Identity relation
    pub const IDEN: Expr = Expr::Const(ConstantExpr::Iden);
    /// All integers
    pub const INTS: Expr = Expr::Const(ConstantExpr::Ints);
    /// Formula `true`
    pub const TRUE: Expr = Expr::Const(ConstantExpr::True);
    /// Formula `false`
    pub const FALSE: Expr = Expr::Const(ConstantExpr::False);

    /// Integer literal
    pub fn number(n: i32) -> Expr {
        Expr::Number(n)
    }

    /// Returns the column types; empty for formulas
    pub fn columns(&self) -> Vec<Column> {
        match self {
            Expr::Const(c) => match c {
                ConstantExpr::Univ | ConstantExpr::None => vec![Column::Atom],
                ConstantExpr::Iden => vec![Column::Atom, Column::Atom],
                ConstantExpr::Ints => vec![Column::Int],
                ConstantExpr::True | ConstantExpr::False => Vec::new(),
            },
            Expr::Number(_) => vec![Column::Int],
            Expr::Sig(sig) => vec![sig.column()],
            Expr::Field(field) => field.columns(),
            Expr::Var(var) => var.columns().to_vec(),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Not | UnaryOp::No | UnaryOp::Some | UnaryOp::Lone | UnaryOp::One => Vec::new(),
                UnaryOp::Card => vec![Column::Int],
                UnaryOp::Transpose => expr.columns().into_iter().rev().collect(),
                UnaryOp::SetOf
                | UnaryOp::SomeOf
                | UnaryOp::LoneOf
                | UnaryOp::OneOf
                | UnaryOp::Closure
                | UnaryOp::ReflexiveClosure
                | UnaryOp::Noop => expr.columns(),
            },
            Expr::Binary { op, left, right } => match op {
                BinaryOp::Join => {
                    let mut l = left.columns();
                    l.pop();
                    l.extend(right.columns().into_iter().skip(1));
                    l
                }
                BinaryOp::Arrow => {
                    let mut l = left.columns();
                    l.extend(right.columns());
                    l
                }
                BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Minus | BinaryOp::Override => {
                    left.columns()
                }
                BinaryOp::DomainRestrict => right.columns(),
                BinaryOp::RangeRestrict => left.columns(),
                _ => Vec::new(),
            },
            Expr::List { .. } => Vec::new(),
            Expr::Ite { then, .. } => then.columns(),
            Expr::Let { body, .. } => body.columns(),
            Expr::Quantified { op, decls, .. } => match op {
                Quantifier::Comprehension => decls
                    .iter()
                    .flat_map(|d| d.variables().iter().flat_map(|v| v.columns().to_vec()))
                    .collect(),
                _ => Vec::new(),
            },
            Expr::Call { columns, .. } => columns.clone(),
        }
    }

    /// Returns the arity; 0 for formulas
    pub fn arity(&self) -> usize {
        self.columns().len()
    }

    /// Returns true if this expression is a formula
    pub fn is_formula(&self) -> bool {
        self.columns().is_empty()
    }

    /// Splits a bound into its multiplicity marker and the marked expression
    ///
    /// Unmarked unary bounds are `one`, unmarked wider bounds `set`.
    pub fn split_marker(&self) -> (Multiplicity, &Expr) {
        if let Expr::Unary { op, expr } = self {
            if let Some(m) = op.marker_multiplicity() {
                return (m, expr);
            }
        }
        let m = if self.arity() == 1 {
            Multiplicity::One
        } else {
            Multiplicity::Set
        };
        (m, self)
    }

    fn unary(self, op: UnaryOp) -> Expr {
        Expr::Unary {
            op,
            expr: Box::new(self),
        }
    }

    fn binary(self, op: BinaryOp, other: Expr) -> Expr {
        match op {
            BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Minus | BinaryOp::Override => {
                assert_eq!(
                    self.arity(),
                    other.arity(),
                    "Incompatible arities for {:?}: {} and {}",
                    op,
                    self.arity(),
                    other.arity()
                );
            }
            BinaryOp::Join => {
                assert!(
                    self.arity() + other.arity() > 2,
                    "Join would result in arity < 1: {} + {} - 2",
                    self.arity(),
                    other.arity()
                );
            }
            _ => {}
        }
        Expr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other),
        }
    }

    /// `self.other`
    pub fn join(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Join, other)
    }

    /// `self -> other`
    pub fn product(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Arrow, other)
    }

    /// `self + other`
    pub fn union(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Union, other)
    }

    /// `self & other`
    pub fn intersection(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Intersection, other)
    }

    /// `self - other`
    pub fn difference(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Minus, other)
    }

    /// `self ++ other`
    pub fn override_with(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Override, other)
    }

    /// `self <: other`
    pub fn domain_restrict(self, other: Expr) -> Expr {
        self.binary(BinaryOp::DomainRestrict, other)
    }

    /// `self :> other`
    pub fn range_restrict(self, other: Expr) -> Expr {
        self.binary(BinaryOp::RangeRestrict, other)
    }

    /// `~self`
    pub fn transpose(self) -> Expr {
        assert_eq!(self.arity(), 2, "transpose requires arity 2");
        self.unary(UnaryOp::Transpose)
    }

    /// `^self`
    pub fn closure(self) -> Expr {
        assert_eq!(self.arity(), 2, "closure requires arity 2");
        self.unary(UnaryOp::Closure)
    }

    /// `*self`
    pub fn reflexive_closure(self) -> Expr {
        assert_eq!(self.arity(), 2, "reflexive_closure requires arity 2");
        self.unary(UnaryOp::ReflexiveClosure)
    }

    /// `#self`
    pub fn card(self) -> Expr {
        self.unary(UnaryOp::Card)
    }

    /// Bound marker `set self`
    pub fn set_of(self) -> Expr {
        self.unary(UnaryOp::SetOf)
    }

    /// Bound marker `some self`
    pub fn some_of(self) -> Expr {
        self.unary(UnaryOp::SomeOf)
    }

    /// Bound marker `lone self`
    pub fn lone_of(self) -> Expr {
        self.unary(UnaryOp::LoneOf)
    }

    /// Bound marker `one self`
    pub fn one_of(self) -> Expr {
        self.unary(UnaryOp::OneOf)
    }

    /// `no self`
    pub fn no(self) -> Expr {
        self.unary(UnaryOp::No)
    }

    /// `some self`
    pub fn some(self) -> Expr {
        self.unary(UnaryOp::Some)
    }

    /// `lone self`
    pub fn lone(self) -> Expr {
        self.unary(UnaryOp::Lone)
    }

    /// `one self`
    pub fn one(self) -> Expr {
        self.unary(UnaryOp::One)
    }

    /// `!self`
    pub fn not(self) -> Expr {
        self.unary(UnaryOp::Not)
    }

    /// `self in other`
    pub fn in_set(self, other: Expr) -> Expr {
        self.binary(BinaryOp::In, other)
    }

    /// `self !in other`
    pub fn not_in(self, other: Expr) -> Expr {
        self.binary(BinaryOp::NotIn, other)
    }

    /// `self = other`
    pub fn equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Equals, other)
    }

    /// `self != other`
    pub fn not_equals(self, other: Expr) -> Expr {
        self.binary(BinaryOp::NotEquals, other)
    }

    /// `self && other`
    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    /// `self || other`
    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    /// `self => other`
    pub fn implies(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Implies, other)
    }

    /// `self <=> other`
    pub fn iff(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Iff, other)
    }

    /// `self < other`
    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    /// `self =< other`
    pub fn lte(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Lte, other)
    }

    /// `self > other`
    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    /// `self >= other`
    pub fn gte(self, other: Expr) -> Expr {
        self.binary(BinaryOp::Gte, other)
    }

    fn arithmetic(self, name: &str, other: Expr) -> Expr {
        Expr::Call {
            name: format!("integer/{}", name),
            args: vec![self, other],
            columns: vec![Column::Int],
            pos: Pos::default(),
        }
    }

    /// `integer/plus[self, other]`
    pub fn plus(self, other: Expr) -> Expr {
        self.arithmetic("plus", other)
    }

    /// `integer/minus[self, other]`
    pub fn minus(self, other: Expr) -> Expr {
        self.arithmetic("minus", other)
    }

    /// `integer/mul[self, other]`
    pub fn mul(self, other: Expr) -> Expr {
        self.arithmetic("mul", other)
    }

    /// `integer/div[self, other]`
    pub fn div(self, other: Expr) -> Expr {
        self.arithmetic("div", other)
    }

    /// `integer/rem[self, other]`
    pub fn rem(self, other: Expr) -> Expr {
        self.arithmetic("rem", other)
    }

    /// N-ary conjunction
    pub fn and_all(exprs: Vec<Expr>) -> Expr {
        match exprs.len() {
            0 => Expr::TRUE,
            _ => Expr::List {
                op: ListOp::And,
                exprs,
            },
        }
    }

    /// N-ary disjunction
    pub fn or_all(exprs: Vec<Expr>) -> Expr {
        match exprs.len() {
            0 => Expr::FALSE,
            _ => Expr::List {
                op: ListOp::Or,
                exprs,
            },
        }
    }

    /// `if self then then else otherwise`
    pub fn then_else(self, then: Expr, otherwise: Expr) -> Expr {
        Expr::Ite {
            condition: Box::new(self),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// `let var = value | body`
    pub fn let_in(var: ExprVar, value: Expr, body: Expr) -> Expr {
        Expr::Let {
            var,
            value: Box::new(value),
            body: Box::new(body),
        }
    }

    /// Quantified formula or comprehension
    pub fn quantified(op: Quantifier, decls: Vec<Decl>, body: Expr) -> Expr {
        assert!(!decls.is_empty(), "quantifier needs a declaration");
        Expr::Quantified {
            op,
            decls,
            body: Box::new(body),
        }
    }

    /// `all decls | body`
    pub fn forall(decls: Vec<Decl>, body: Expr) -> Expr {
        Expr::quantified(Quantifier::All, decls, body)
    }

    /// `some decls | body`
    pub fn exists(decls: Vec<Decl>, body: Expr) -> Expr {
        Expr::quantified(Quantifier::Some, decls, body)
    }

    /// `{decls | body}`
    pub fn comprehension(decls: Vec<Decl>, body: Expr) -> Expr {
        Expr::quantified(Quantifier::Comprehension, decls, body)
    }

    /// Call of a user function
    pub fn call(func: &super::Func, args: Vec<Expr>) -> Expr {
        Expr::Call {
            name: func.name().to_string(),
            args,
            columns: func.returns().to_vec(),
            pos: Pos::default(),
        }
    }

    /// Replaces free occurrences of `var` with `replacement`
    ///
    /// Variables are compared by identity, so a binder can only shadow `var`
    /// if it declares that very variable; descent stops there.
    pub fn substitute(&self, var: &ExprVar, replacement: &Expr) -> Expr {
        let sub = |e: &Expr| Box::new(e.substitute(var, replacement));
        match self {
            Expr::Var(v) if v == var => replacement.clone(),
            Expr::Const(_) | Expr::Number(_) | Expr::Sig(_) | Expr::Field(_) | Expr::Var(_) => self.clone(),
            Expr::Unary { op, expr } => Expr::Unary { op: *op, expr: sub(expr) },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: sub(left),
                right: sub(right),
            },
            Expr::List { op, exprs } => Expr::List {
                op: *op,
                exprs: exprs.iter().map(|e| e.substitute(var, replacement)).collect(),
            },
            Expr::Ite {
                condition,
                then,
                otherwise,
            } => Expr::Ite {
                condition: sub(condition),
                then: sub(then),
                otherwise: sub(otherwise),
            },
            Expr::Let { var: bound, value, body } => Expr::Let {
                var: bound.clone(),
                value: sub(value),
                body: if bound == var { body.clone() } else { sub(body) },
            },
            Expr::Quantified { op, decls, body } => {
                let mut shadowed = false;
                let decls = decls
                    .iter()
                    .map(|d| {
                        let mut d = d.clone();
                        if !shadowed {
                            d.expr = d.expr.substitute(var, replacement);
                        }
                        shadowed |= d.variables.contains(var);
                        d
                    })
                    .collect();
                Expr::Quantified {
                    op: *op,
                    decls,
                    body: if shadowed { body.clone() } else { sub(body) },
                }
            }
            Expr::Call {
                name,
                args,
                columns,
                pos,
            } => Expr::Call {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(var, replacement)).collect(),
                columns: columns.clone(),
                pos: pos.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_columns() {
        let a = Sig::top_level("this/A");
        assert!(Expr::from(&a).some().is_formula());
        assert_eq!(Expr::from(&a).product(Expr::from(&a)).arity(), 2);
        assert_eq!(Expr::from(&a).card().columns(), vec![Column::Int]);
        assert_eq!(Expr::IDEN.arity(), 2);
    }

    #[test]
    fn join_columns() {
        let a = Sig::top_level("this/A");
        let r = Field::new(&a, "r", Expr::from(&Sig::int()).set_of());
        assert_eq!(Expr::from(&a).join(Expr::from(&r)).columns(), vec![Column::Int]);
    }

    #[test]
    fn split_marker_defaults() {
        let a = Sig::top_level("this/A");
        let (m, _) = Expr::from(&a).split_marker();
        assert_eq!(m, Multiplicity::One);
        let (m, _) = Expr::from(&a).product(Expr::from(&a)).split_marker();
        assert_eq!(m, Multiplicity::Set);
        let binding = Expr::from(&a).lone_of();
        let (m, e) = binding.split_marker();
        assert_eq!(m, Multiplicity::Lone);
        assert_eq!(*e, Expr::from(&a));
    }

    #[test]
    fn substitute_respects_shadowing() {
        let a = Sig::top_level("this/A");
        let x = ExprVar::unary("x");
        let free = Expr::from(&x).in_set(Expr::from(&a));
        let bound = Expr::forall(vec![Decl::one_of(x.clone(), Expr::from(&a))], free.clone());
        let replaced = free.substitute(&x, &Expr::UNIV);
        assert_eq!(replaced, Expr::UNIV.in_set(Expr::from(&a)));
        assert_eq!(bound.substitute(&x, &Expr::UNIV), bound);
    }

    #[test]
    #[should_panic(expected = "Incompatible arities")]
    fn incompatible_union() {
        let a = Sig::top_level("this/A");
        let _ = Expr::from(&a).union(Expr::IDEN);
    }
}
