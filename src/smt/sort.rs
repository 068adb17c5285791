//! Sort algebra

use std::fmt;

use crate::error::{Error, Result};

/// Name of the uninterpreted sort holding relational atoms
pub const ATOM_SORT_NAME: &str = "Atom";

/// Name of the uninterpreted sort encoding integers
pub const UNINTERPRETED_INT_NAME: &str = "UInt";

/// A sort of the term algebra
///
/// Equality is structural. Relations are always `Set(Tuple(..))`; use
/// [`Sort::set_of`] or [`Sort::relation`] to build set sorts so the element
/// sort is guaranteed to be a tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    /// Declared uninterpreted sort
    Uninterpreted(String),
    /// Booleans
    Bool,
    /// Native integers
    Int,
    /// Uninterpreted integers, mapped into `Int` by the value function
    UninterpretedInt,
    /// Tuple of component sorts
    Tuple(Vec<Sort>),
    /// Finite set of tuples
    Set(Box<Sort>),
}

impl Sort {
    /// The atom sort
    pub fn atom() -> Sort {
        Sort::Uninterpreted(ATOM_SORT_NAME.to_string())
    }

    /// Creates a set sort, failing unless `element` is a tuple sort
    pub fn set_of(element: Sort) -> Result<Sort> {
        match element {
            Sort::Tuple(_) => Ok(Sort::Set(Box::new(element))),
            other => Err(Error::SortMismatch(format!(
                "set element sort must be a tuple, got {}",
                other
            ))),
        }
    }

    /// Relation sort `Set(Tuple(columns))`
    ///
    /// # Panics
    /// Panics if `columns` is empty
    pub fn relation(columns: Vec<Sort>) -> Sort {
        assert!(!columns.is_empty(), "relation needs at least one column");
        Sort::Set(Box::new(Sort::Tuple(columns)))
    }

    /// `Set(Tuple(Atom))`
    pub fn unary_atom_relation() -> Sort {
        Sort::relation(vec![Sort::atom()])
    }

    /// `Set(Tuple(UInt))`
    pub fn unary_int_relation() -> Sort {
        Sort::relation(vec![Sort::UninterpretedInt])
    }

    /// Returns true for a set sort
    pub fn is_set(&self) -> bool {
        matches!(self, Sort::Set(_))
    }

    /// Returns true for a tuple sort
    pub fn is_tuple(&self) -> bool {
        matches!(self, Sort::Tuple(_))
    }

    /// Returns true for sorts that may appear as tuple components
    pub fn is_atomic(&self) -> bool {
        !matches!(self, Sort::Tuple(_) | Sort::Set(_))
    }

    /// Element sort of a set sort
    pub fn element(&self) -> Option<&Sort> {
        match self {
            Sort::Set(element) => Some(element),
            _ => None,
        }
    }

    /// Column sorts of a tuple sort or of a set-of-tuple sort
    pub fn columns(&self) -> Option<&[Sort]> {
        match self {
            Sort::Tuple(sorts) => Some(sorts),
            Sort::Set(element) => element.columns(),
            _ => None,
        }
    }

    /// Number of columns of a tuple or relation sort, 0 otherwise
    pub fn arity(&self) -> usize {
        self.columns().map_or(0, |c| c.len())
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Uninterpreted(name) => write!(f, "{}", name),
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::UninterpretedInt => write!(f, "{}", UNINTERPRETED_INT_NAME),
            Sort::Tuple(sorts) => {
                write!(f, "(Tuple")?;
                for sort in sorts {
                    write!(f, " {}", sort)?;
                }
                write!(f, ")")
            }
            Sort::Set(element) => write!(f, "(Set {})", element),
        }
    }
}
