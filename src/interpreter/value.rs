use anyhow::bail;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::rc::Rc;

use super::ast::Literal;
use super::dsl::DslInstance;
use super::tree::ResultNode;
use crate::outcome::Duration;
use crate::runtime::error::ComponentResult;
use crate::runtime::registry::NativeHandle;

/// Anything an identifier can be bound to.
#[derive(Clone)]
pub enum Value {
    /// Instance of a host component.
    Native(NativeHandle),
    /// Instance of a component declared in the DSL.
    Dsl(Rc<DslInstance>),
    /// Result of a method call.
    Result(ResultNode),
    /// Evaluated parameter of a DSL instance or method.
    Literal(Literal),
}

impl Value {
    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Value::Native(handle) => format!("native {}", handle.type_name()),
            Value::Dsl(instance) => format!("dsl {}", instance.type_name()),
            Value::Result(_) => "result".to_string(),
            Value::Literal(literal) => format!("{} literal", literal.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Native(handle) => f.debug_tuple("Native").field(handle).finish(),
            Value::Dsl(instance) => f.debug_tuple("Dsl").field(&instance.type_name()).finish(),
            Value::Result(node) => f.debug_tuple("Result").field(node).finish(),
            Value::Literal(literal) => f.debug_tuple("Literal").field(literal).finish(),
        }
    }
}

/// Evaluated overrides handed to a constructor.
///
/// Keys are unique; insertion order is not observable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamBundle {
    values: HashMap<String, Literal>,
}

impl ParamBundle {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. Returns `false` (leaving the bundle unchanged) if the
    /// name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: Literal) -> bool {
        match self.values.entry(name.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    /// Builder-style insert that overwrites.
    pub fn with(mut self, name: impl Into<String>, value: Literal) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Raw lookup.
    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name)
    }

    /// Whether a value is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Parameter names in the bundle.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the bundle is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over name/value pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Typed lookup; `Ok(None)` when absent, an error when the type differs.
    pub fn typed<T: FromLiteral>(&self, name: &str) -> ComponentResult<Option<T>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(literal) => match T::from_literal(literal) {
                Some(value) => Ok(Some(value)),
                None => bail!(
                    "parameter {} expects {}, found {}",
                    name,
                    T::TYPE_NAME,
                    literal.type_name()
                ),
            },
        }
    }

    /// String parameter.
    pub fn string(&self, name: &str) -> ComponentResult<Option<String>> {
        self.typed(name)
    }

    /// Float parameter (integers widen).
    pub fn float(&self, name: &str) -> ComponentResult<Option<f64>> {
        self.typed(name)
    }

    /// Integer parameter.
    pub fn int(&self, name: &str) -> ComponentResult<Option<i64>> {
        self.typed(name)
    }

    /// Boolean parameter.
    pub fn bool(&self, name: &str) -> ComponentResult<Option<bool>> {
        self.typed(name)
    }

    /// Duration parameter.
    pub fn duration(&self, name: &str) -> ComponentResult<Option<Duration>> {
        self.typed(name)
    }
}

/// Extraction of a host value from a DSL literal.
pub trait FromLiteral: Sized {
    /// Name of the host type, used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Convert, or `None` when the literal has the wrong type.
    fn from_literal(literal: &Literal) -> Option<Self>;
}

impl FromLiteral for i64 {
    const TYPE_NAME: &'static str = "int";

    fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromLiteral for f64 {
    const TYPE_NAME: &'static str = "float";

    fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Float(value) => Some(*value),
            Literal::Int(value) => Some(*value as f64),
            _ => None,
        }
    }
}

impl FromLiteral for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromLiteral for String {
    const TYPE_NAME: &'static str = "string";

    fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl FromLiteral for Duration {
    const TYPE_NAME: &'static str = "duration";

    fn from_literal(literal: &Literal) -> Option<Self> {
        match literal {
            Literal::Duration(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromLiteral for Literal {
    const TYPE_NAME: &'static str = "literal";

    fn from_literal(literal: &Literal) -> Option<Self> {
        Some(literal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_rejects_duplicate_keys() {
        let mut bundle = ParamBundle::new();
        assert!(bundle.insert("HitRate", Literal::Float(0.5)));
        assert!(!bundle.insert("HitRate", Literal::Float(0.9)));
        assert_eq!(bundle.get("HitRate"), Some(&Literal::Float(0.5)));
        assert_eq!(bundle.len(), 1);
    }

    #[test]
    fn typed_getters_widen_ints_to_float() {
        let bundle = ParamBundle::new()
            .with("HitRate", Literal::Int(1))
            .with("ProfileName", Literal::String("HDD".into()));
        assert_eq!(bundle.float("HitRate").unwrap(), Some(1.0));
        assert_eq!(bundle.string("ProfileName").unwrap().as_deref(), Some("HDD"));
        assert_eq!(bundle.float("Missing").unwrap(), None);
    }

    #[test]
    fn typed_getter_reports_mismatch() {
        let bundle = ParamBundle::new().with("ProfileName", Literal::Int(3));
        let err = bundle.string("ProfileName").unwrap_err();
        assert_eq!(
            err.to_string(),
            "parameter ProfileName expects string, found int"
        );
    }
}
