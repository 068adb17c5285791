//! Scoped name resolution

use rustc_hash::FxHashMap;

use super::decl::VariableDeclaration;
use super::expr::Expression;

/// Parent-linked mapping from names to expressions
///
/// A child scope shadows its parent without mutating it. Scopes are cheap
/// and are created per binder during translation and model parsing.
#[derive(Debug, Default)]
pub struct Environment<'a> {
    parent: Option<&'a Environment<'a>>,
    bindings: FxHashMap<String, Expression>,
}

impl<'a> Environment<'a> {
    /// Creates a root environment
    pub fn new() -> Self {
        Self {
            parent: None,
            bindings: FxHashMap::default(),
        }
    }

    /// Creates a child scope of this environment
    pub fn child(&'a self) -> Environment<'a> {
        Environment {
            parent: Some(self),
            bindings: FxHashMap::default(),
        }
    }

    /// Binds `name` in this scope, replacing a previous binding in the same scope
    pub fn put(&mut self, name: impl Into<String>, expr: Expression) {
        self.bindings.insert(name.into(), expr);
    }

    /// Looks `name` up, walking outward through parent scopes
    pub fn get(&self, name: &str) -> Option<&Expression> {
        match self.bindings.get(name) {
            Some(expr) => Some(expr),
            None => self.parent.and_then(|parent| parent.get(name)),
        }
    }

    /// Returns true if `name` is bound in this scope or an enclosing one
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if `name` is bound in this scope itself
    pub fn contains_locally(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Returns true if some binding in scope mentions `variable` freely
    ///
    /// Binders map source names to terms over the variables they introduce,
    /// so this tells whether `variable` belongs to an enclosing binder.
    pub fn binds_variable(&self, variable: &VariableDeclaration) -> bool {
        self.bindings.values().any(|e| e.occurs_free(variable))
            || self.parent.is_some_and(|p| p.binds_variable(variable))
    }

    /// Returns the enclosing scope
    pub fn parent(&self) -> Option<&'a Environment<'a>> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_without_mutating_parent() {
        let mut root = Environment::new();
        root.put("x", Expression::int(1));
        root.put("y", Expression::int(2));
        {
            let mut child = root.child();
            child.put("x", Expression::int(10));
            assert_eq!(child.get("x"), Some(&Expression::int(10)));
            assert_eq!(child.get("y"), Some(&Expression::int(2)));
            assert!(!child.contains_locally("y"));
        }
        assert_eq!(root.get("x"), Some(&Expression::int(1)));
        assert!(!root.contains("z"));
    }
}
