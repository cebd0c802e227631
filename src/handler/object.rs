//! Builder-style handler for hosts that do not want to implement the trait

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{Filter, HandlerRef, Macro, MacroCall, MacroError, MacroHandler, Params, Value};

type DelegateFn = dyn Fn(&str) -> Option<HandlerRef> + Send + Sync;
type UnhandledFn = dyn Fn(&str, &mut MacroCall<'_>) -> Result<(), MacroError> + Send + Sync;

/// A handler assembled from closures and values
///
/// ```
/// use macroskin::{Macro, ObjectHandler};
///
/// let root = ObjectHandler::new("root")
///     .with_macro("hello", Macro::text("Hello"))
///     .with_property("title", "Front page")
///     .with_child("user", ObjectHandler::new("user").with_property("name", "ann"));
/// # let _ = root;
/// ```
#[derive(Clone, Default)]
pub struct ObjectHandler {
    name: String,
    macros: HashMap<String, Macro>,
    filters: HashMap<String, Filter>,
    properties: HashMap<String, Value>,
    delegate: Option<Arc<DelegateFn>>,
    unhandled: Option<Arc<UnhandledFn>>,
}

impl ObjectHandler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_macro(mut self, name: impl Into<String>, m: Macro) -> Self {
        self.macros.insert(name.into(), m);
        self
    }

    /// Add a macro that writes into its call
    pub fn with_macro_fn<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut MacroCall<'_>) -> Result<(), MacroError> + Send + Sync + 'static,
    {
        self.with_macro(name, Macro::new(body))
    }

    /// Add a macro that returns its output
    pub fn with_returning<F>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Params) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        self.with_macro(name, Macro::returning(body))
    }

    pub fn with_filter<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Filter::new(body));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Add a plain function property, which is not callable as a macro
    pub fn with_function(self, name: impl Into<String>) -> Self {
        self.with_property(name, Value::Function)
    }

    /// Add a nested object reachable as a property
    pub fn with_child(self, name: impl Into<String>, child: impl MacroHandler + 'static) -> Self {
        self.with_property(name, Value::object(child))
    }

    /// Delegate path segments to handlers computed on demand
    pub fn with_macro_handler<F>(mut self, delegate: F) -> Self
    where
        F: Fn(&str) -> Option<HandlerRef> + Send + Sync + 'static,
    {
        self.delegate = Some(Arc::new(delegate));
        self
    }

    /// Catch-all for macro names this handler does not define
    pub fn with_unhandled_macro<F>(mut self, body: F) -> Self
    where
        F: Fn(&str, &mut MacroCall<'_>) -> Result<(), MacroError> + Send + Sync + 'static,
    {
        self.unhandled = Some(Arc::new(body));
        self
    }

    pub fn into_ref(self) -> HandlerRef {
        Arc::new(self)
    }
}

impl MacroHandler for ObjectHandler {
    fn get_macro(&self, name: &str) -> Option<Macro> {
        self.macros.get(name).cloned()
    }

    fn get_filter(&self, name: &str) -> Option<Filter> {
        self.filters.get(name).cloned()
    }

    fn get_macro_handler(&self, name: &str) -> Option<HandlerRef> {
        self.delegate.as_ref().and_then(|delegate| delegate(name))
    }

    fn get_property(&self, name: &str) -> Option<Value> {
        self.properties.get(name).cloned()
    }

    fn on_unhandled_macro(
        &self,
        name: &str,
        call: &mut MacroCall<'_>,
    ) -> Option<Result<(), MacroError>> {
        self.unhandled.as_ref().map(|body| body(name, call))
    }
}

impl fmt::Debug for ObjectHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut macros: Vec<_> = self.macros.keys().collect();
        macros.sort();
        let mut properties: Vec<_> = self.properties.keys().collect();
        properties.sort();
        f.debug_struct("ObjectHandler")
            .field("name", &self.name)
            .field("macros", &macros)
            .field("properties", &properties)
            .field("delegates", &self.delegate.is_some())
            .field("catch_all", &self.unhandled.is_some())
            .finish()
    }
}
