//! Plain data scopes and the named handler registry

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::{HandlerRef, MacroHandler, Value};

/// String-keyed values such as request or response data
///
/// A bag acts as a handler whose macros are its entries: `<% response.title %>`
/// renders the `title` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataBag {
    entries: BTreeMap<String, Value>,
}

impl DataBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MacroHandler for DataBag {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.entries.get(name).cloned()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for DataBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bag = DataBag::new();
        for (k, v) in iter {
            bag.insert(k, v);
        }
        bag
    }
}

/// Handlers registered under fixed names for a render
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, HandlerRef>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one of the same name
    pub fn register(&mut self, name: impl Into<String>, handler: HandlerRef) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn with(mut self, name: impl Into<String>, handler: impl MacroHandler + 'static) -> Self {
        self.register(name, std::sync::Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&HandlerRef> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.names())
            .finish()
    }
}
