//! Lexically scoped bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::value::Value;

struct Scope {
    values: HashMap<String, Value>,
    enclosing: Option<Environment>,
}

/// Handle to a scope. Cloning the handle shares the scope.
#[derive(Clone)]
pub struct Environment {
    scope: Rc<RefCell<Scope>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh top-level scope.
    pub fn new() -> Self {
        Self::with_enclosing(None)
    }

    fn with_enclosing(enclosing: Option<Environment>) -> Self {
        Self {
            scope: Rc::new(RefCell::new(Scope {
                values: HashMap::new(),
                enclosing,
            })),
        }
    }

    /// A new inner scope whose parent is `self`.
    pub fn enclosed(&self) -> Self {
        Self::with_enclosing(Some(self.clone()))
    }

    /// Bind `name` in this scope. Returns `false` and leaves the scope
    /// untouched if the name is already bound here; outer bindings may be
    /// shadowed.
    pub fn define(&self, name: &str, value: Value) -> bool {
        let mut scope = self.scope.borrow_mut();
        if scope.values.contains_key(name) {
            return false;
        }
        scope.values.insert(name.to_string(), value);
        true
    }

    /// Resolve `name`, walking outward through enclosing scopes.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let scope = self.scope.borrow();
        match scope.values.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.enclosing.as_ref()?.lookup(name),
        }
    }

    /// Whether `name` is bound in this scope (ignoring enclosing scopes).
    pub fn contains_local(&self, name: &str) -> bool {
        self.scope.borrow().values.contains_key(name)
    }

    /// Names bound in this scope, sorted.
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scope.borrow().values.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of bindings in this scope.
    pub fn len(&self) -> usize {
        self.scope.borrow().values.len()
    }

    /// Whether this scope has no bindings.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A non-owning handle to this scope.
    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment {
            scope: Rc::downgrade(&self.scope),
        }
    }
}

/// Non-owning handle to a scope.
///
/// Values stored in a scope that need to refer back to it hold one of these,
/// so the scope and its bindings are freed once the last [`Environment`]
/// handle is dropped.
#[derive(Clone)]
pub struct WeakEnvironment {
    scope: Weak<RefCell<Scope>>,
}

impl WeakEnvironment {
    /// The scope, if it is still alive.
    pub fn upgrade(&self) -> Option<Environment> {
        self.scope.upgrade().map(|scope| Environment { scope })
    }
}

impl fmt::Debug for WeakEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEnvironment")
            .field("alive", &(self.scope.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = self.scope.borrow();
        f.debug_struct("Environment")
            .field("names", &self.local_names())
            .field("nested", &scope.enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ast::Literal;

    fn int(value: i64) -> Value {
        Value::Literal(Literal::Int(value))
    }

    fn as_int(value: Option<Value>) -> Option<i64> {
        match value {
            Some(Value::Literal(Literal::Int(v))) => Some(v),
            _ => None,
        }
    }

    #[test]
    fn rebinding_in_same_scope_is_rejected() {
        let env = Environment::new();
        assert!(env.define("x", int(1)));
        assert!(!env.define("x", int(2)));
        assert_eq!(as_int(env.lookup("x")), Some(1));
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let outer = Environment::new();
        outer.define("x", int(1));
        let inner = outer.enclosed();
        assert!(inner.define("x", int(2)));
        assert_eq!(as_int(inner.lookup("x")), Some(2));
        assert_eq!(as_int(outer.lookup("x")), Some(1));
    }

    #[test]
    fn lookup_walks_outward() {
        let outer = Environment::new();
        outer.define("disk", int(7));
        let inner = outer.enclosed().enclosed();
        assert_eq!(as_int(inner.lookup("disk")), Some(7));
        assert!(!inner.contains_local("disk"));
        assert!(inner.lookup("missing").is_none());
    }

    #[test]
    fn weak_handle_does_not_keep_scope_alive() {
        let env = Environment::new();
        env.define("x", int(1));
        let weak = env.downgrade();
        assert_eq!(as_int(weak.upgrade().and_then(|env| env.lookup("x"))), Some(1));

        drop(env);
        assert!(weak.upgrade().is_none());
    }
}
