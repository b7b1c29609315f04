use crate::error::TemplateError;
use crate::serializer;
use crate::value::{ToValue, Value};
use serde::Serialize;
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// Variables visible to a render: a root map plus a stack of local bindings.
///
/// Locals shadow root entries and each other (innermost wins). Control tags push
/// a binding before rendering a body and pop it afterwards.
#[derive(Debug, Clone, Default)]
pub struct Context {
    root: BTreeMap<String, Value>,
    locals: Vec<(String, Value)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from any serialisable value. Maps and structs become the
    /// root scope; anything else is rejected.
    pub fn from_serialize<T: ?Sized + Serialize>(data: &T) -> Result<Self, TemplateError> {
        match serializer::to_value(data)? {
            Value::Map(root) => Ok(Self {
                root,
                locals: Vec::new(),
            }),
            Value::Null => Ok(Self::default()),
            other => Err(TemplateError::Serialization(format!(
                "Context data must be a map or struct, got {}",
                other.type_name()
            ))),
        }
    }

    /// Inserts into the root scope, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToValue) -> &mut Self {
        self.root.insert(key.into(), value.to_value());
        self
    }

    pub fn push(&mut self, key: &str, value: Value) {
        self.locals.push((key.to_string(), value));
    }

    pub fn pop(&mut self) {
        self.locals.pop();
    }

    /// Number of local bindings currently pushed.
    pub fn depth(&self) -> usize {
        self.locals.len()
    }

    /// Drops local bindings until only `depth` remain.
    pub fn truncate(&mut self, depth: usize) {
        self.locals.truncate(depth);
    }

    /// Assigns to the innermost binding named `key`. Without one, the value becomes a
    /// new local while any locals are pushed, and a root entry otherwise.
    pub fn set(&mut self, key: &str, value: Value) {
        if let Some((_, v)) = self.locals.iter_mut().rev().find(|(k, _)| k == key) {
            *v = value;
        } else if self.locals.is_empty() {
            self.root.insert(key.to_string(), value);
        } else {
            self.push(key, value);
        }
    }

    pub fn lookup(&self, key: &str) -> &Value {
        // 1) Exact match (locals or a direct key on the root map).
        if let Some(v) = self.find_exact(key) {
            return v;
        }

        // 2) Dotted path (e.g. "user.name", "items.0").
        if let Some((head, rest)) = key.split_once('.')
            && let Some(head_value) = self.find_exact(head)
            && let Some(target) = Self::resolve_path(head_value, rest)
        {
            return target;
        }

        &NULL
    }

    fn find_exact(&self, key: &str) -> Option<&Value> {
        if let Some((_, v)) = self.locals.iter().rev().find(|(k, _)| k == key) {
            return Some(v);
        }
        self.root.get(key)
    }

    fn resolve_path<'v>(mut current: &'v Value, path: &str) -> Option<&'v Value> {
        for part in path.split('.') {
            current = match current {
                Value::Map(m) => m.get(part)?,
                Value::List(l) => l.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}
