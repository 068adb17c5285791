//! Instances: the atoms of each signature and the tuples of each field
//!
//! An instance is read off a solver model by evaluating the definition the
//! model gives for every signature and field constant of a [`Translation`].

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::engine::evaluator::{set_elements, tuple_atoms, Scope};
use crate::error::{Error, Result};
use crate::smt::{Constant, Expression, FunctionDeclaration, SmtModel, Sort};
use crate::translator::{Translation, INT_VALUE_NAME};

/// Atoms of one signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureExtent {
    /// Signature label
    pub label: String,
    /// Atoms in the order the model lists them
    pub atoms: Vec<String>,
}

/// Tuples of one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtent {
    /// Label of the owning signature
    pub sig: String,
    /// Field label
    pub label: String,
    /// Tuples in the order the model lists them, owner atom first
    pub tuples: Vec<Vec<String>>,
}

/// A satisfying instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    signatures: Vec<SignatureExtent>,
    fields: Vec<FieldExtent>,
}

impl Instance {
    /// Creates an empty instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs the instance described by `model`
    ///
    /// # Errors
    /// [`Error::Evaluation`] if the model lacks a definition for a signature
    /// or field, [`Error::MalformedModel`] if a definition does not evaluate
    /// to a set in normal form.
    pub fn from_model(translation: &Translation, model: &SmtModel) -> Result<Self> {
        let scope = Scope::from_model(model);
        let labeller = AtomLabeller {
            scope: &scope,
            int_value: model.function(INT_VALUE_NAME).map(|f| Arc::clone(f.declaration())),
        };

        let mut instance = Instance::new();
        for (sig, declaration) in translation.signatures() {
            let atoms = labeller
                .tuples(declaration, sig.label())?
                .into_iter()
                .flatten()
                .collect();
            instance.signatures.push(SignatureExtent {
                label: sig.label().to_string(),
                atoms,
            });
        }
        for (field, declaration) in translation.fields() {
            let tuples = labeller.tuples(declaration, field.label())?;
            instance.fields.push(FieldExtent {
                sig: field.sig().label().to_string(),
                label: field.label().to_string(),
                tuples,
            });
        }
        debug!(
            "reconstructed {} signatures and {} fields",
            instance.signatures.len(),
            instance.fields.len()
        );
        Ok(instance)
    }

    /// All signatures, in translation order
    pub fn signatures(&self) -> &[SignatureExtent] {
        &self.signatures
    }

    /// All fields, in translation order
    pub fn fields(&self) -> &[FieldExtent] {
        &self.fields
    }

    /// Looks a signature up by label
    pub fn signature(&self, label: &str) -> Option<&SignatureExtent> {
        self.signatures.iter().find(|s| s.label == label)
    }

    /// Looks a field up by owner and label
    pub fn field(&self, sig: &str, label: &str) -> Option<&FieldExtent> {
        self.fields.iter().find(|f| f.sig == sig && f.label == label)
    }

    /// Every atom mentioned by the instance, in order of first appearance
    pub fn atoms(&self) -> Vec<&str> {
        let mut atoms: Vec<&str> = Vec::new();
        let mentioned = self
            .signatures
            .iter()
            .flat_map(|s| s.atoms.iter())
            .chain(self.fields.iter().flat_map(|f| f.tuples.iter().flatten()));
        for atom in mentioned {
            if !atoms.contains(&atom.as_str()) {
                atoms.push(atom);
            }
        }
        atoms
    }
}

struct AtomLabeller<'s> {
    scope: &'s Scope<'s>,
    int_value: Option<Arc<FunctionDeclaration>>,
}

impl AtomLabeller<'_> {
    fn tuples(&self, declaration: &Arc<FunctionDeclaration>, label: &str) -> Result<Vec<Vec<String>>> {
        if self.scope.definition(declaration.name()).is_none() {
            return Err(Error::Evaluation(format!(
                "no definition of '{}' for '{}' in the model",
                declaration.name(),
                label
            )));
        }
        let value = declaration.variable().evaluate(self.scope)?;
        set_elements(&value)?
            .iter()
            .map(|tuple| {
                tuple_atoms(tuple)?
                    .iter()
                    .map(|atom| self.label(atom))
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }

    /// `UInt` atoms are named by their value when the model defines `intValue`
    fn label(&self, atom: &Expression) -> Result<String> {
        let Expression::Constant(Constant::Uninterpreted { name, sort }) = atom else {
            return Err(Error::MalformedModel(format!("{} is not an atom", atom)));
        };
        if *sort == Sort::UninterpretedInt {
            if let Some(int_value) = &self.int_value {
                let value = int_value.call(vec![atom.clone()])?.evaluate(self.scope)?;
                return value
                    .as_int()
                    .map(|n| n.to_string())
                    .ok_or_else(|| Error::MalformedModel(format!("{}({}) is not an integer", INT_VALUE_NAME, name)));
            }
        }
        Ok(name.clone())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Instance:")?;
        for sig in &self.signatures {
            writeln!(f, "  {} = {{{}}}", sig.label, sig.atoms.join(", "))?;
        }
        for field in &self.fields {
            let tuples: Vec<String> = field
                .tuples
                .iter()
                .map(|t| format!("({})", t.join(", ")))
                .collect();
            writeln!(f, "  {}.{} = {{{}}}", field.sig, field.label, tuples.join(", "))?;
        }
        Ok(())
    }
}
