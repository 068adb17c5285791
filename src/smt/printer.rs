//! SMT-LIB rendering of the term algebra
//!
//! A pure structural serializer: every node prints exactly as it is built,
//! in the syntax of the CVC4/cvc5 theory of finite sets.

use std::fmt::{self, Display, Formatter};

use super::decl::{FunctionDeclaration, FunctionDefinition, VariableDeclaration};
use super::expr::{Constant, Expression, Variable};
use super::program::{Assertion, FunctionItem, Program, SmtModel, SortDeclaration};

const SYMBOL_PUNCTUATION: &str = "~!@$%^&*_-+=<>.?/";

fn is_simple_symbol(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(first) if first.is_ascii_digit() => false,
        Some(_) => name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || SYMBOL_PUNCTUATION.contains(c)),
    }
}

/// Wraps `name` in `|...|` when it is not a simple SMT-LIB symbol
pub fn quote_symbol(name: &str) -> String {
    if is_simple_symbol(name) {
        name.to_string()
    } else {
        format!("|{}|", name)
    }
}

/// Strips `|...|` quoting and surrounding whitespace from a symbol
pub fn sanitize_symbol(name: &str) -> String {
    name.replace('|', "").trim().to_string()
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(i) if *i < 0 => write!(f, "(- {})", i.unsigned_abs()),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Uninterpreted { name, .. } => write!(f, "{}", quote_symbol(name)),
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote_symbol(self.name()))
    }
}

impl Display for VariableDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", quote_symbol(self.name()), self.sort())
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => write!(f, "{}", c),
            Expression::Variable(v) => write!(f, "{}", v),
            Expression::EmptySet(sort) => write!(f, "(as emptyset {})", sort),
            Expression::UnivSet(sort) => write!(f, "(as univset {})", sort),
            Expression::Unary { op, expr } => write!(f, "({} {})", op.symbol(), expr),
            Expression::Binary { op, left, right } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            Expression::Ite {
                condition,
                then,
                otherwise,
            } => write!(f, "(ite {} {} {})", condition, then, otherwise),
            Expression::MultiArity { op, exprs } => {
                write!(f, "({}", op.symbol())?;
                write_list(f, exprs)?;
                write!(f, ")")
            }
            Expression::Quantified {
                op,
                variables,
                body,
            } => {
                write!(f, "({} (", op.symbol())?;
                for (i, v) in variables.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ") {})", body)
            }
            Expression::Call {
                function,
                arguments,
            } => {
                write!(f, "({}", quote_symbol(function.name()))?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
        }
    }
}

impl Display for SortDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(declare-sort {} {})", quote_symbol(&self.name), self.arity)
    }
}

impl Display for FunctionDeclaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(declare-fun {} (", quote_symbol(self.name()))?;
        for (i, sort) in self.input_sorts().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", sort)?;
        }
        write!(f, ") {})", self.output_sort())
    }
}

impl Display for FunctionDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "(define-fun {} (", quote_symbol(self.name()))?;
        for (i, input) in self.inputs().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", input)?;
        }
        write!(f, ") {} {})", self.output_sort(), self.body())
    }
}

impl Display for FunctionItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            FunctionItem::Declared(decl) => write!(f, "{}", decl),
            FunctionItem::Defined(def) => write!(f, "{}", def),
        }
    }
}

impl Display for Assertion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.comment().is_empty() {
            writeln!(f, "; {}", self.comment().replace('\n', " "))?;
        }
        match self.label() {
            Some(label) => write!(f, "(assert (! {} :named |{}|))", self.expression(), label),
            None => write!(f, "(assert {})", self.expression()),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for sort in self.sorts() {
            writeln!(f, "{}", sort)?;
        }
        for function in self.functions() {
            writeln!(f, "{}", function)?;
        }
        for assertion in self.assertions() {
            writeln!(f, "{}", assertion)?;
        }
        Ok(())
    }
}

impl Display for SmtModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "(model")?;
        for sort in self.sorts() {
            writeln!(f, "{}", sort)?;
        }
        for function in self.functions() {
            writeln!(f, "{}", function)?;
        }
        write!(f, ")")
    }
}

/// Renders a complete solver script ending in `(check-sat)`
pub fn script(program: &Program, produce_unsat_cores: bool) -> String {
    let mut out = String::new();
    out.push_str("(set-logic ALL)\n");
    out.push_str("(set-option :produce-models true)\n");
    out.push_str("(set-option :finite-model-find true)\n");
    if produce_unsat_cores {
        out.push_str("(set-option :produce-unsat-cores true)\n");
    }
    out.push_str(&program.to_string());
    out.push_str("(check-sat)\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smt::Sort;

    #[test]
    fn quoting() {
        assert_eq!(quote_symbol("this/Person"), "this/Person");
        assert_eq!(quote_symbol("@uc_Atom_0"), "@uc_Atom_0");
        assert_eq!(quote_symbol("a b"), "|a b|");
        assert_eq!(quote_symbol("1x"), "|1x|");
        assert_eq!(sanitize_symbol(" |a b| "), "a b");
    }

    #[test]
    fn expressions() {
        let s = FunctionDeclaration::constant("this/A", Sort::unary_atom_relation());
        let x = VariableDeclaration::new("x", Sort::Tuple(vec![Sort::atom()]));
        let body = x.variable().member(s.variable()).unwrap();
        let e = Expression::forall(vec![x], body).unwrap();
        assert_eq!(e.to_string(), "(forall ((x (Tuple Atom))) (member x this/A))");
        assert_eq!(Expression::int(-3).to_string(), "(- 3)");
        let empty = Expression::empty_set(Sort::unary_atom_relation()).unwrap();
        assert_eq!(empty.to_string(), "(as emptyset (Set (Tuple Atom)))");
    }

    #[test]
    fn program_and_script() {
        let mut program = Program::new();
        program.add_sort(SortDeclaration::new("Atom"));
        program.add_function(FunctionDeclaration::new(
            "f",
            vec![Sort::atom()],
            Sort::Int,
        ));
        program.add_assertion(
            Assertion::new("fact", Expression::bool(true))
                .unwrap()
                .with_label("l0"),
        );
        let text = script(&program, true);
        assert!(text.starts_with("(set-logic ALL)\n"));
        assert!(text.contains("(declare-sort Atom 0)\n"));
        assert!(text.contains("(declare-fun f (Atom) Int)\n"));
        assert!(text.contains("; fact\n(assert (! true :named |l0|))\n"));
        assert!(text.ends_with("(check-sat)\n"));
    }
}
