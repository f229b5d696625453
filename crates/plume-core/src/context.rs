//! The resolution context: a request-scoped map from parameter name to value.
//!
//! A [`Context`] is built fresh for every invocation. Its entries satisfy
//! parameters by name before any dependency, default or data-type rule is
//! consulted, which is how both live request data and test overrides reach a
//! handler.
//!
//! ```rust,ignore
//! let mut ctx = Context::new();
//! ctx.insert("bot_name", "EchoBot".to_string());
//!
//! // Overrides win on key collision.
//! let ctx = ctx.merged(&Context::new().with("bot_name", "TestBot".to_string()));
//! assert_eq!(ctx.get::<String>("bot_name").as_deref(), Some("TestBot"));
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// A type-erased, shareable value stored in a [`Context`] or produced by the
/// resolver.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Request-scoped name → value map.
///
/// Cloning a context is cheap: values are reference counted.
#[derive(Clone, Default)]
pub struct Context {
    entries: HashMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name`, returning the previous entry if any.
    pub fn insert<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> Option<Value> {
        self.insert_value(name, Arc::new(value))
    }

    /// Stores an already type-erased value under `name`.
    pub fn insert_value(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    /// Builder-style variant of [`insert`](Self::insert).
    pub fn with<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the raw entry stored under `name`.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Returns a clone of the entry stored under `name` if it is a `T`.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.entries
            .get(name)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns `true` if an entry exists under `name`, whatever its type.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Removes and returns the entry stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.remove(name)
    }

    /// Copies every entry of `overrides` into this context.
    ///
    /// Entries of `overrides` replace entries with the same name.
    pub fn merge(&mut self, overrides: &Context) {
        for (name, value) in &overrides.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }

    /// Consuming variant of [`merge`](Self::merge).
    pub fn merged(mut self, overrides: &Context) -> Self {
        self.merge(overrides);
        self
    }

    /// Iterates over the entry names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Context").field("entries", &names).finish()
    }
}
