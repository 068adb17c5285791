//! Signature lowering
//!
//! Every signature becomes a nullary function of sort `Set(Tuple(Atom))`
//! (or `Set(Tuple(UInt))` below `Int`); the hierarchy becomes subset,
//! union and disjointness assertions.

use std::sync::Arc;

use log::{debug, trace};

use super::{column_sort, Translator};
use crate::ast::{Multiplicity, Sig, SigKind};
use crate::error::{Error, Result};
use crate::smt::{Assertion, Expression, FunctionDeclaration, Sort, VariableDeclaration};

impl Translator {
    pub(super) fn translate_signatures(&mut self, sigs: &[Sig]) -> Result<()> {
        for sig in sigs {
            self.declare_signature(sig)?;
        }
        self.top_level_disjointness(sigs)?;
        for sig in sigs {
            self.hierarchy_constraints(sig, sigs)?;
            self.multiplicity_constraint(sig)?;
        }
        Ok(())
    }

    fn declare_signature(&mut self, sig: &Sig) -> Result<()> {
        if sig.is_builtin_int() {
            // Int is the integer universe itself
            self.integers()?;
            if let Some(integers) = &self.integers {
                self.sig_map.insert(sig.clone(), Arc::clone(integers));
            }
            return Ok(());
        }
        let sort = Sort::relation(vec![column_sort(sig.column())]);
        let declaration = FunctionDeclaration::constant(sig.label(), sort);
        debug!("declaring signature {}", sig.label());
        self.program.add_function(Arc::clone(&declaration));
        self.sig_map.insert(sig.clone(), Arc::clone(&declaration));
        self.signatures.push((sig.clone(), declaration));
        Ok(())
    }

    pub(super) fn signature_expr(&self, sig: &Sig) -> Result<Expression> {
        self.sig_map
            .get(sig)
            .map(|d| d.variable())
            .ok_or_else(|| Error::UnresolvedName(sig.label().to_string()))
    }

    fn assert(&mut self, comment: String, formula: Expression) -> Result<()> {
        trace!("{}: {}", comment, formula);
        self.program.add_assertion(Assertion::new(comment, formula)?);
        Ok(())
    }

    fn disjoint(&self, a: &Sig, b: &Sig) -> Result<Expression> {
        let left = self.signature_expr(a)?;
        let right = self.signature_expr(b)?;
        let sort = left.sort();
        left.intersection(right)?.equals(Expression::empty_set(sort)?)
    }

    fn top_level_disjointness(&mut self, sigs: &[Sig]) -> Result<()> {
        let top: Vec<&Sig> = sigs
            .iter()
            .filter(|s| matches!(s.kind(), SigKind::TopLevel))
            .collect();
        for (i, a) in top.iter().enumerate() {
            for b in &top[i + 1..] {
                let formula = self.disjoint(a, b)?;
                self.assert(format!("{} and {} are disjoint", a, b), formula)?;
            }
        }
        Ok(())
    }

    fn hierarchy_constraints(&mut self, sig: &Sig, sigs: &[Sig]) -> Result<()> {
        match sig.kind() {
            SigKind::TopLevel | SigKind::Int => {}
            SigKind::Extends(parent) => {
                let formula = self.signature_expr(sig)?.subset(self.signature_expr(parent)?)?;
                self.assert(format!("{} extends {}", sig, parent), formula)?;
            }
            SigKind::Subset(parents) => {
                let mut union = self.signature_expr(&parents[0])?;
                for parent in &parents[1..] {
                    union = union.union(self.signature_expr(parent)?)?;
                }
                let formula = self.signature_expr(sig)?.subset(union)?;
                self.assert(format!("{} is a subset of its parents", sig), formula)?;
            }
        }

        let children: Vec<&Sig> = sigs
            .iter()
            .filter(|s| matches!(s.kind(), SigKind::Extends(p) if p == sig))
            .collect();
        for (i, a) in children.iter().enumerate() {
            for b in &children[i + 1..] {
                let formula = self.disjoint(a, b)?;
                self.assert(format!("{} and {} are disjoint", a, b), formula)?;
            }
        }
        if sig.is_abstract() && !children.is_empty() {
            let mut union = self.signature_expr(children[0])?;
            for child in &children[1..] {
                union = union.union(self.signature_expr(child)?)?;
            }
            let formula = self.signature_expr(sig)?.equals(union)?;
            self.assert(format!("abstract {} is the union of its children", sig), formula)?;
        }
        Ok(())
    }

    fn multiplicity_constraint(&mut self, sig: &Sig) -> Result<()> {
        let Some(multiplicity) = sig.multiplicity() else {
            return Ok(());
        };
        let formula = match multiplicity {
            Multiplicity::One => self.exactly_one(self.signature_expr(sig)?)?,
            Multiplicity::Lone => self.at_most_one(self.signature_expr(sig)?)?,
            Multiplicity::Some => self.non_empty(self.signature_expr(sig)?)?,
            Multiplicity::No | Multiplicity::Set => return Ok(()),
        };
        self.assert(format!("{:?} {}", multiplicity, sig).to_lowercase(), formula)
    }

    /// `set != ∅`
    pub(super) fn non_empty(&mut self, set: Expression) -> Result<Expression> {
        let sort = set.sort();
        set.equals(Expression::empty_set(sort)?)?.not()
    }

    /// `∃x. set = {x}`
    pub(super) fn exactly_one(&mut self, set: Expression) -> Result<Expression> {
        let element = set
            .sort()
            .element()
            .cloned()
            .ok_or_else(|| Error::SortMismatch(format!("cardinality of non-set {}", set)))?;
        let x = VariableDeclaration::new(self.fresh_name("x"), element);
        let body = set.equals(x.variable().singleton()?)?;
        Expression::exists(vec![x], body)
    }

    /// `set = ∅ ∨ ∃x. set = {x}`
    pub(super) fn at_most_one(&mut self, set: Expression) -> Result<Expression> {
        let sort = set.sort();
        let empty = set.clone().equals(Expression::empty_set(sort)?)?;
        empty.or(self.exactly_one(set)?)
    }
}
