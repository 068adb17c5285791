//! S-expressions as printed by SMT solvers
//!
//! `;` comments are skipped as whitespace. `|quoted|` symbols keep their
//! content with the pipes and surrounding blanks removed.

use std::fmt;

use peg::str::LineCol;

#[expect(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    I(u64),
    S(String),
}

/// An s-expression
#[expect(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    Atom(Atom),
    List(Vec<Sexp>),
}

impl Sexp {
    /// Return the inner elements if self is a list
    pub fn list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Atom(_) => None,
        }
    }

    /// Return the inner string if self is a symbol
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Sexp::Atom(Atom::S(s)) => Some(s),
            _ => None,
        }
    }

    /// Return the head and tail if self is of the form `(head rest..)`
    pub fn app(&self) -> Option<(&str, &[Sexp])> {
        let items = self.list()?;
        let (head, rest) = items.split_first()?;
        Some((head.symbol()?, rest))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::I(i) => write!(f, "{i}"),
            Atom::S(s) => write!(f, "{}", crate::smt::quote_symbol(s)),
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(a) => write!(f, "{a}"),
            Sexp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

peg::parser! {
grammar parser() for str {
  rule symbol_char() = ['a'..='z' | 'A'..='Z' | '0'..='9' | '~' | '!' | '@' | '$' | '%' | '^' | '&' | '*'
                        | '_' | '-' | '+' | '=' | '<' | '>' | '.' | '?' | '/' | ':' | '#' | '\'']
  rule symbol() = quiet! { !['0'..='9'] symbol_char()+ } / expected!("symbol")

  rule comment() = ";" [^'\n']*
  rule whitespace() = [' ' | '\t' | '\n' | '\r'] / comment()
  rule _ = whitespace()*

  rule pipe_quoted_atom() -> Atom
  = "|" s:$([^'|']*) "|" { Atom::S(s.trim().to_string()) }

  rule string_atom() -> Atom
  = "\"" s:$([^'"']*) "\"" { Atom::S(s.to_string()) }

  rule unquoted_atom() -> Atom
  = s:$(symbol()) { Atom::S(s.to_string()) }

  rule int_atom() -> Atom
  = i:$(['0'..='9']+) {? i.parse().map(Atom::I).or(Err("integer literal")) }

  rule atom() -> Sexp
  = a:(int_atom() / pipe_quoted_atom() / string_atom() / unquoted_atom()) { Sexp::Atom(a) }

  rule list() -> Sexp
  = "(" _ items:(sexp() ** _) _ ")" { Sexp::List(items) }

  rule sexp() -> Sexp
  = atom() / list()

  /// Parse a sequence of sexps.
  pub(super) rule sexps() -> Vec<Sexp>
  = _ items:(sexp() ** _) _ { items }
}
}

/// Parse a sequence of sexps, separated by whitespace and comments
pub fn parse_many(s: &str) -> Result<Vec<Sexp>, peg::error::ParseError<LineCol>> {
    parser::sexps(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Sexp {
        Sexp::Atom(Atom::S(s.to_string()))
    }

    #[test]
    fn test_atoms_and_lists() {
        let parsed = parse_many("(a (b 12) |x y|)").unwrap();
        assert_eq!(
            parsed,
            vec![Sexp::List(vec![
                sym("a"),
                Sexp::List(vec![sym("b"), Sexp::Atom(Atom::I(12))]),
                sym("x y"),
            ])]
        );
    }

    #[test]
    fn test_comments_are_whitespace() {
        let parsed = parse_many("; cardinality of Atom is 2\n(a)\n; trailing").unwrap();
        assert_eq!(parsed, vec![Sexp::List(vec![sym("a")])]);
    }

    #[test]
    fn test_solver_symbols() {
        let parsed = parse_many("@uc_Atom_0 Atom!val!1 (- 3) sat").unwrap();
        assert_eq!(parsed[0], sym("@uc_Atom_0"));
        assert_eq!(parsed[1], sym("Atom!val!1"));
        assert_eq!(parsed[2].app(), Some(("-", &[Sexp::Atom(Atom::I(3))][..])));
        assert_eq!(parsed[3].symbol(), Some("sat"));
    }

    #[test]
    fn test_unbalanced() {
        assert!(parse_many("(a (b)").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let text = "(define-fun f ((x Int)) Int (+ x 1))";
        let parsed = parse_many(text).unwrap();
        assert_eq!(parsed[0].to_string(), text);
    }
}
