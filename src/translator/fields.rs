//! Field lowering
//!
//! A field `f: e` of `S` becomes a nullary function of sort
//! `Set(Tuple(S column, e columns...))`. Its constraints are built as
//! relational formulas over the field and run through the expression
//! lowering, so bound multiplicities are handled in one place.

use std::sync::Arc;

use log::debug;

use super::{relation_sort, Translator};
use crate::ast::{Decl, Expr, ExprVar, Field, FieldDecl, Multiplicity};
use crate::error::{Error, Result};
use crate::smt::{Assertion, Expression, FunctionDeclaration};

impl Translator {
    pub(super) fn translate_fields(&mut self, decls: &[FieldDecl]) -> Result<()> {
        // bounds may mention fields declared later
        for decl in decls {
            for field in decl.fields() {
                self.declare_field(field);
            }
        }
        for decl in decls {
            for field in decl.fields() {
                self.field_constraints(field)?;
            }
            if decl.is_disjoint() {
                self.disjoint_fields(decl.fields())?;
            }
            if decl.has_disjoint_values() {
                for field in decl.fields() {
                    self.disjoint_values(field)?;
                }
            }
        }
        Ok(())
    }

    fn declare_field(&mut self, field: &Field) {
        let name = format!("{}/{}", field.sig().label(), field.label());
        debug!("declaring field {}", name);
        let declaration = FunctionDeclaration::constant(name, relation_sort(&field.columns()));
        self.program.add_function(Arc::clone(&declaration));
        self.field_map.insert(field.clone(), Arc::clone(&declaration));
        self.fields.push((field.clone(), declaration));
    }

    pub(super) fn field_expr(&self, field: &Field) -> Result<Expression> {
        self.field_map
            .get(field)
            .map(|d| d.variable())
            .ok_or_else(|| Error::UnresolvedName(format!("{}/{}", field.sig().label(), field.label())))
    }

    fn field_constraints(&mut self, field: &Field) -> Result<()> {
        let sig = field.sig();
        let this = sig.this();
        let bound = field.bound();

        // all this: one S | some s: bound | this <: f = this -> s
        let s = ExprVar::of("s", bound);
        let value = Expr::exists(
            vec![Decl::from_bound(vec![s.clone()], bound)],
            Expr::from(this)
                .domain_restrict(Expr::from(field))
                .equals(Expr::from(this).product(Expr::from(&s))),
        );
        let multiplicity = Expr::forall(vec![Decl::one_of(this.clone(), Expr::from(sig))], value);
        let formula = self.translate_formula(&multiplicity)?;
        let assertion = Assertion::new(format!("{} multiplicity", field.label()), formula)?;
        self.program.add_assertion(assertion);

        // f in S -> bound[S/this]
        let (_, stripped) = bound.split_marker();
        let domain = Expr::from(field).in_set(Expr::from(sig).product(stripped.substitute(this, &Expr::from(sig))));
        let formula = self.translate_formula(&domain)?;
        let assertion = Assertion::new(format!("{} subset", field.label()), formula)?;
        self.program.add_assertion(assertion);
        Ok(())
    }

    fn disjoint_fields(&mut self, fields: &[Field]) -> Result<()> {
        for (i, a) in fields.iter().enumerate() {
            for b in &fields[i + 1..] {
                let left = self.field_expr(a)?;
                let sort = left.sort();
                let formula = left
                    .intersection(self.field_expr(b)?)?
                    .equals(Expression::empty_set(sort)?)?;
                let assertion =
                    Assertion::new(format!("{} and {} are disjoint", a.label(), b.label()), formula)?;
                self.program.add_assertion(assertion);
            }
        }
        Ok(())
    }

    fn disjoint_values(&mut self, field: &Field) -> Result<()> {
        // all disj a, b: S | no a.f & b.f
        let sig = field.sig();
        let a = ExprVar::new("a", vec![sig.column()]);
        let b = ExprVar::new("b", vec![sig.column()]);
        let formula = Expr::forall(
            vec![Decl::new(vec![a.clone(), b.clone()], Multiplicity::One, Expr::from(sig)).disjoint()],
            Expr::from(&a)
                .join(Expr::from(field))
                .intersection(Expr::from(&b).join(Expr::from(field)))
                .no(),
        );
        let formula = self.translate_formula(&formula)?;
        let assertion = Assertion::new(format!("{} has disjoint values", field.label()), formula)?;
        self.program.add_assertion(assertion);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Expr, Field, FieldDecl, Module, Sig};
    use crate::translator::{Options, Translator};

    fn module() -> (Module, Field) {
        let person = Sig::top_level("this/Person");
        let mut module = Module::new();
        module.add_sig(person.clone());
        let knows = Field::new(&person, "knows", Expr::from(&person).set_of());
        module.add_field(knows.clone());
        (module, knows)
    }

    #[test]
    fn field_is_declared_with_owner_column() {
        let (module, knows) = module();
        let translation = Translator::new(Options::default()).translate(&module).unwrap();
        let declaration = translation.field(&knows).unwrap();
        assert_eq!(declaration.name(), "this/Person/knows");
        assert_eq!(declaration.output_sort().to_string(), "(Set (Tuple Atom Atom))");
    }

    #[test]
    fn field_gets_two_constraints() {
        let (module, _) = module();
        let translation = Translator::new(Options::default()).translate(&module).unwrap();
        let comments: Vec<&str> = translation
            .program()
            .assertions()
            .iter()
            .map(|a| a.comment())
            .collect();
        assert!(comments.contains(&"knows multiplicity"));
        assert!(comments.contains(&"knows subset"));
    }

    #[test]
    fn disjoint_group() {
        let person = Sig::top_level("this/Person");
        let mut module = Module::new();
        module.add_sig(person.clone());
        module.add_field_decl(
            FieldDecl::new(&person, &["likes", "hates"], Expr::from(&person).set_of())
                .disjoint()
                .disjoint_values(),
        );
        let translation = Translator::new(Options::default()).translate(&module).unwrap();
        let comments: Vec<&str> = translation
            .program()
            .assertions()
            .iter()
            .map(|a| a.comment())
            .collect();
        assert!(comments.contains(&"likes and hates are disjoint"));
        assert!(comments.contains(&"likes has disjoint values"));
        assert!(comments.contains(&"hates has disjoint values"));
    }
}
