//! Parsing of solver output
//!
//! Reads the replies to `(check-sat)`, `(get-model)`, `(get-value ...)` and
//! `(get-unsat-core)` back into the term algebra. Every term is rebuilt
//! through the checked constructors, so a parsed model is well sorted.

pub mod sexp;

use std::sync::Arc;

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::smt::sort::{ATOM_SORT_NAME, UNINTERPRETED_INT_NAME};
use crate::smt::{
    sanitize_symbol, BinaryOp, Environment, Expression, FunctionDeclaration, FunctionDefinition,
    MultiArityOp, QuantifierOp, SmtModel, SmtValues, Sort, SortDeclaration, UnaryOp, UnsatCore,
    Variable, VariableDeclaration, NAMED_FORMULA_MARKER,
};
use sexp::{Atom, Sexp};

/// Reply to `(check-sat)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSat {
    /// Satisfiable
    Sat,
    /// Unsatisfiable
    Unsat,
    /// The solver gave up
    Unknown,
}

/// An operator symbol of the supported fragment
#[derive(Debug, Clone, Copy)]
enum Operator {
    Unary(UnaryOp),
    Binary(BinaryOp),
    Multi(MultiArityOp),
    Quantifier(QuantifierOp),
    Ite,
}

fn operator(symbol: &str) -> Option<Operator> {
    let op = match symbol {
        "not" => Operator::Unary(UnaryOp::Not),
        "singleton" => Operator::Unary(UnaryOp::Singleton),
        "transpose" => Operator::Unary(UnaryOp::Transpose),
        "tclosure" => Operator::Unary(UnaryOp::TClosure),
        "card" => Operator::Unary(UnaryOp::Card),
        "=>" => Operator::Binary(BinaryOp::Implies),
        "=" => Operator::Binary(BinaryOp::Eq),
        ">" => Operator::Binary(BinaryOp::Gt),
        ">=" => Operator::Binary(BinaryOp::Gte),
        "<" => Operator::Binary(BinaryOp::Lt),
        "<=" => Operator::Binary(BinaryOp::Lte),
        "+" => Operator::Binary(BinaryOp::Plus),
        "-" => Operator::Binary(BinaryOp::Minus),
        "*" => Operator::Binary(BinaryOp::Multiply),
        "/" | "div" => Operator::Binary(BinaryOp::Divide),
        "mod" => Operator::Binary(BinaryOp::Mod),
        "union" => Operator::Binary(BinaryOp::Union),
        "intersection" => Operator::Binary(BinaryOp::Intersection),
        "setminus" => Operator::Binary(BinaryOp::SetMinus),
        "member" => Operator::Binary(BinaryOp::Member),
        "subset" => Operator::Binary(BinaryOp::Subset),
        "join" => Operator::Binary(BinaryOp::Join),
        "product" => Operator::Binary(BinaryOp::Product),
        "and" => Operator::Multi(MultiArityOp::And),
        "or" => Operator::Multi(MultiArityOp::Or),
        "mkTuple" => Operator::Multi(MultiArityOp::MkTuple),
        "forall" => Operator::Quantifier(QuantifierOp::Forall),
        "exists" => Operator::Quantifier(QuantifierOp::Exists),
        "ite" => Operator::Ite,
        _ => return None,
    };
    Some(op)
}

fn parse_sexps(text: &str) -> Result<Vec<Sexp>> {
    sexp::parse_many(text).map_err(|e| Error::Parse(e.to_string()))
}

fn expect_arity(symbol: &str, args: &[Sexp], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(Error::Parse(format!(
            "'{}' expects {} operands, got {}",
            symbol,
            expected,
            args.len()
        )));
    }
    Ok(())
}

/// Parses a sort
pub fn parse_sort(sexp: &Sexp) -> Result<Sort> {
    if let Some(name) = sexp.symbol() {
        return match name {
            ATOM_SORT_NAME => Ok(Sort::atom()),
            UNINTERPRETED_INT_NAME => Ok(Sort::UninterpretedInt),
            "Bool" => Ok(Sort::Bool),
            "Int" => Ok(Sort::Int),
            other => Err(Error::UnsupportedSort(other.to_string())),
        };
    }
    match sexp.app() {
        Some(("Set", [element])) => Sort::set_of(parse_sort(element)?),
        Some(("Tuple", columns)) if !columns.is_empty() => Ok(Sort::Tuple(
            columns.iter().map(parse_sort).collect::<Result<Vec<_>>>()?,
        )),
        _ => Err(Error::UnsupportedSort(sexp.to_string())),
    }
}

/// Sort named inside a solver-generated constant
fn constant_sort(name: &str) -> Result<Sort> {
    match name {
        ATOM_SORT_NAME => Ok(Sort::atom()),
        UNINTERPRETED_INT_NAME => Ok(Sort::UninterpretedInt),
        other => Err(Error::UnsupportedSort(other.to_string())),
    }
}

/// Recognises `@uc_<Sort>_<n>` and `<Sort>!val!<n>`
fn uninterpreted_constant(symbol: &str) -> Option<Result<Expression>> {
    let sort_name = if let Some(rest) = symbol.strip_prefix("@uc_") {
        rest.rsplit_once('_').map(|(sort, _)| sort)
    } else {
        symbol.split_once("!val!").map(|(sort, _)| sort)
    }?;
    Some(constant_sort(sort_name).and_then(|sort| Expression::uninterpreted(symbol, sort)))
}

fn parse_binders(sexp: &Sexp) -> Result<Vec<Arc<VariableDeclaration>>> {
    let binders = sexp
        .list()
        .ok_or_else(|| Error::Parse(format!("expected a binder list, got {}", sexp)))?;
    binders
        .iter()
        .map(|binder| match binder.list() {
            Some([name, sort]) => {
                let name = name
                    .symbol()
                    .ok_or_else(|| Error::Parse(format!("bad binder {}", binder)))?;
                Ok(VariableDeclaration::new(sanitize_symbol(name), parse_sort(sort)?))
            }
            _ => Err(Error::Parse(format!("bad binder {}", binder))),
        })
        .collect()
}

/// Parses a term under `env`
pub fn parse_term(sexp: &Sexp, env: &Environment<'_>) -> Result<Expression> {
    match sexp {
        Sexp::Atom(Atom::I(i)) => i64::try_from(*i)
            .map(Expression::int)
            .map_err(|_| Error::Parse(format!("integer {} out of range", i))),
        Sexp::Atom(Atom::S(symbol)) => {
            let name = sanitize_symbol(symbol);
            match name.as_str() {
                "true" => return Ok(Expression::bool(true)),
                "false" => return Ok(Expression::bool(false)),
                _ => {}
            }
            if let Some(value) = env.get(&name) {
                return Ok(value.clone());
            }
            if let Some(constant) = uninterpreted_constant(&name) {
                return constant;
            }
            Err(Error::UndefinedVariable(name))
        }
        Sexp::List(items) => {
            let Some((head, args)) = items.split_first() else {
                return Err(Error::Parse("empty application".to_string()));
            };
            let Some(symbol) = head.symbol() else {
                return Err(Error::UnsupportedOperator(head.to_string()));
            };
            parse_application(symbol, args, env)
        }
    }
}

fn parse_application(symbol: &str, args: &[Sexp], env: &Environment<'_>) -> Result<Expression> {
    match symbol {
        "as" => {
            expect_arity(symbol, args, 2)?;
            let sort = parse_sort(&args[1])?;
            return match args[0].symbol() {
                Some("emptyset") => Expression::empty_set(sort),
                Some("univset") => Expression::univ_set(sort),
                _ => Err(Error::UnsupportedOperator(format!("as {}", args[0]))),
            };
        }
        // negative literal
        "-" if args.len() == 1 => {
            let value = parse_term(&args[0], env)?;
            return match value.as_int() {
                Some(i) => Ok(Expression::int(-i)),
                None => Expression::binary(BinaryOp::Minus, Expression::int(0), value),
            };
        }
        _ => {}
    }

    if let Some(op) = operator(symbol) {
        return match op {
            Operator::Quantifier(op) => {
                expect_arity(symbol, args, 2)?;
                let variables = parse_binders(&args[0])?;
                let mut scope = env.child();
                for variable in &variables {
                    scope.put(variable.name(), variable.variable());
                }
                let body = parse_term(&args[1], &scope)?;
                Expression::quantified(op, variables, body)
            }
            Operator::Unary(op) => {
                expect_arity(symbol, args, 1)?;
                Expression::unary(op, parse_term(&args[0], env)?)
            }
            Operator::Binary(op) => {
                expect_arity(symbol, args, 2)?;
                Expression::binary(op, parse_term(&args[0], env)?, parse_term(&args[1], env)?)
            }
            Operator::Multi(op) => {
                let operands = args
                    .iter()
                    .map(|a| parse_term(a, env))
                    .collect::<Result<Vec<_>>>()?;
                Expression::multi(op, operands)
            }
            Operator::Ite => {
                expect_arity(symbol, args, 3)?;
                Expression::ite(
                    parse_term(&args[0], env)?,
                    parse_term(&args[1], env)?,
                    parse_term(&args[2], env)?,
                )
            }
        };
    }

    // call of a defined function
    let name = sanitize_symbol(symbol);
    match env.get(&name) {
        Some(Expression::Variable(Variable::Function(function))) => {
            let arguments = args
                .iter()
                .map(|a| parse_term(a, env))
                .collect::<Result<Vec<_>>>()?;
            Expression::call(Arc::clone(function), arguments)
        }
        _ => Err(Error::UnsupportedOperator(name)),
    }
}

/// One `define-fun` before its body is parsed
struct Header<'s> {
    declaration: Arc<FunctionDeclaration>,
    inputs: Vec<Arc<VariableDeclaration>>,
    body: &'s Sexp,
}

fn model_items(sexps: &[Sexp]) -> &[Sexp] {
    match sexps {
        [Sexp::List(items)] => match items.split_first() {
            Some((head, rest)) if head.symbol() == Some("model") => rest,
            Some((Sexp::List(_), _)) | None => items,
            Some(_) => sexps,
        },
        _ => sexps,
    }
}

/// Parses the reply to `(get-model)`
///
/// All definitions are declared before any body is parsed, so bodies may
/// refer to definitions reported later. Named-formula definitions are
/// skipped.
pub fn parse_model(text: &str) -> Result<SmtModel> {
    let sexps = parse_sexps(text)?;
    let items = model_items(&sexps);

    let mut model = SmtModel::new();
    let mut headers = Vec::new();
    for item in items {
        match item.app() {
            Some(("declare-sort", [name, arity])) => {
                let name = name
                    .symbol()
                    .ok_or_else(|| Error::Parse(format!("bad sort declaration {}", item)))?;
                let arity = match arity {
                    Sexp::Atom(Atom::I(n)) => usize::try_from(*n)
                        .map_err(|_| Error::Parse(format!("bad sort arity {}", arity)))?,
                    _ => return Err(Error::Parse(format!("bad sort arity {}", arity))),
                };
                model.add_sort(SortDeclaration {
                    name: sanitize_symbol(name),
                    arity,
                });
            }
            Some(("define-fun", [name, params, sort, body])) => {
                let name = sanitize_symbol(
                    name.symbol()
                        .ok_or_else(|| Error::Parse(format!("bad function name in {}", item)))?,
                );
                if name.contains(NAMED_FORMULA_MARKER) {
                    trace!("skipping named formula {}", name);
                    continue;
                }
                let inputs = parse_binders(params)?;
                let output = parse_sort(sort)?;
                let declaration = FunctionDeclaration::new(
                    name,
                    inputs.iter().map(|v| v.sort().clone()).collect(),
                    output,
                );
                headers.push(Header {
                    declaration,
                    inputs,
                    body,
                });
            }
            Some(("declare-fun", _)) => trace!("skipping {}", item),
            _ => return Err(Error::Parse(format!("unexpected model item {}", item))),
        }
    }

    let mut root = Environment::new();
    for header in &headers {
        root.put(header.declaration.name(), header.declaration.variable());
    }
    for header in headers {
        let mut scope = root.child();
        for input in &header.inputs {
            scope.put(input.name(), input.variable());
        }
        let body = parse_term(header.body, &scope)?;
        let definition = FunctionDefinition::new(
            header.declaration.name(),
            header.inputs,
            header.declaration.output_sort().clone(),
            body,
        )?;
        model.add_function(definition);
    }
    debug!(
        "parsed model with {} sorts and {} functions",
        model.sorts().len(),
        model.functions().len()
    );
    Ok(model)
}

/// Parses the reply to `(get-value ...)`, resolving names against `model`
pub fn parse_values(text: &str, model: &SmtModel) -> Result<SmtValues> {
    let sexps = parse_sexps(text)?;
    let pairs = match sexps.as_slice() {
        [Sexp::List(pairs)] => pairs,
        _ => return Err(Error::Parse("expected one list of (term value) pairs".to_string())),
    };
    let mut root = Environment::new();
    for function in model.functions() {
        root.put(function.name(), function.declaration().variable());
    }
    let values = pairs
        .iter()
        .map(|pair| match pair.list() {
            Some([term, value]) => Ok((parse_term(term, &root)?, parse_term(value, &root)?)),
            _ => Err(Error::Parse(format!("expected a (term value) pair, got {}", pair))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SmtValues(values))
}

/// Parses the reply to `(get-unsat-core)`
pub fn parse_unsat_core(text: &str) -> Result<UnsatCore> {
    let sexps = parse_sexps(text)?;
    let labels = match sexps.as_slice() {
        [Sexp::List(labels)] => labels,
        _ => return Err(Error::Parse("expected one list of labels".to_string())),
    };
    labels
        .iter()
        .map(|label| {
            label
                .symbol()
                .map(sanitize_symbol)
                .ok_or_else(|| Error::Parse(format!("bad core label {}", label)))
        })
        .collect::<Result<Vec<_>>>()
        .map(UnsatCore)
}

/// Parses the reply to `(check-sat)`
pub fn parse_check_sat(text: &str) -> Result<CheckSat> {
    match text.trim() {
        "sat" => Ok(CheckSat::Sat),
        "unsat" => Ok(CheckSat::Unsat),
        "unknown" => Ok(CheckSat::Unknown),
        other => Err(Error::Parse(format!("unexpected check-sat reply '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_sat() {
        assert_eq!(parse_check_sat("sat\n"), Ok(CheckSat::Sat));
        assert_eq!(parse_check_sat("unsat"), Ok(CheckSat::Unsat));
        assert_eq!(parse_check_sat("unknown"), Ok(CheckSat::Unknown));
        assert!(matches!(parse_check_sat("(error)"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_sorts() {
        let parsed = sexp::parse_many("(Set (Tuple Atom UInt))").unwrap();
        assert_eq!(
            parse_sort(&parsed[0]),
            Ok(Sort::relation(vec![Sort::atom(), Sort::UninterpretedInt]))
        );
        let parsed = sexp::parse_many("Real").unwrap();
        assert_eq!(parse_sort(&parsed[0]), Err(Error::UnsupportedSort("Real".to_string())));
    }

    #[test]
    fn test_model_with_wrapper_and_forward_reference() {
        let model = parse_model(
            "(model
              ; cardinality of Atom is 2
              (declare-sort Atom 0)
              (define-fun this/B () (Set (Tuple Atom)) this/A)
              (define-fun this/A () (Set (Tuple Atom))
                (union (singleton (mkTuple @uc_Atom_0)) (singleton (mkTuple @uc_Atom_1))))
              (define-fun |{\"filename\": \"a.als\", \"line\": 1, \"column\": 1}| () Bool true)
            )",
        )
        .unwrap();
        assert_eq!(model.sorts(), &[SortDeclaration::new("Atom")]);
        assert_eq!(model.functions().len(), 2);
        let b = model.function("this/B").unwrap();
        assert_eq!(b.body().to_string(), "this/A");
    }

    #[test]
    fn test_model_without_wrapper() {
        let model = parse_model(
            "((define-fun intValue ((x UInt)) Int (ite (= x UInt!val!0) (- 3) 4)))",
        )
        .unwrap();
        let int_value = model.function("intValue").unwrap();
        assert_eq!(int_value.inputs().len(), 1);
        assert_eq!(
            int_value.body().to_string(),
            "(ite (= x UInt!val!0) (- 3) 4)"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            parse_model("(model (define-fun f () Int (frobnicate 1 2)))"),
            Err(Error::UnsupportedOperator(_))
        ));
        assert!(matches!(
            parse_model("(model (define-fun f () Real 1))"),
            Err(Error::UnsupportedSort(_))
        ));
        assert_eq!(
            parse_model("(model (define-fun f () Int g))"),
            Err(Error::UndefinedVariable("g".to_string()))
        );
        assert!(matches!(
            parse_model("(model (define-fun f () Bool 1))"),
            Err(Error::SortMismatch(_))
        ));
    }

    #[test]
    fn test_quantified_body() {
        let model = parse_model(
            "(model (define-fun p () Bool (forall ((|x| Atom)) (= x x))))",
        )
        .unwrap();
        assert_eq!(
            model.function("p").unwrap().body().to_string(),
            "(forall ((x Atom)) (= x x))"
        );
    }

    #[test]
    fn test_values_and_core() {
        let model = parse_model("(model (define-fun n () Int 5))").unwrap();
        let values = parse_values("((n 5))", &model).unwrap();
        let n = model.function("n").unwrap().declaration().variable();
        assert_eq!(values.get(&n), Some(&Expression::int(5)));

        let core = parse_unsat_core("(|{\"filename\": \"a.als\", \"line\": 2, \"column\": 1}| fact_1)").unwrap();
        assert_eq!(core.0.len(), 2);
        assert!(core.contains("fact_1"));
    }
}
