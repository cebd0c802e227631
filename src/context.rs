//! Per-render state
//!
//! A [`RenderContext`] carries everything one render may consult: the named
//! handler registry, request and response data, the optional session, the
//! root and global objects, the `this` object of the current rendering, and
//! the render configuration. Nothing here is process-global, so independent
//! renders on different threads never share mutable state.

use std::sync::Arc;

use crate::handler::{DataBag, HandlerRef, HandlerRegistry, MacroHandler, Value};
use crate::renderer::RenderConfig;

/// Prefix naming the root object itself
pub const ROOT_PREFIX: &str = "root";

/// A source of names for the first path segment
pub trait Scope: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl Scope for HandlerRegistry {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned().map(Value::Object)
    }
}

impl Scope for DataBag {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// An object used as a scope: names resolve to its delegated handlers or
/// its properties
#[derive(Clone)]
pub struct ObjectScope {
    handler: HandlerRef,
    self_name: Option<&'static str>,
}

impl ObjectScope {
    pub fn new(handler: HandlerRef) -> Self {
        Self {
            handler,
            self_name: None,
        }
    }

    /// Also resolve `name` to the object itself
    pub fn named(handler: HandlerRef, name: &'static str) -> Self {
        Self {
            handler,
            self_name: Some(name),
        }
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }
}

impl Scope for ObjectScope {
    fn lookup(&self, name: &str) -> Option<Value> {
        if self.self_name == Some(name) {
            return Some(Value::Object(self.handler.clone()));
        }
        self.handler
            .get_macro_handler(name)
            .map(Value::Object)
            .or_else(|| self.handler.get_property(name))
    }
}

/// Ordered scopes consulted for the first segment of a macro path
///
/// The first scope that defines the name wins; later scopes are not
/// consulted even if the winning value turns out to be unusable.
#[derive(Default)]
pub struct ScopeChain<'a> {
    tiers: Vec<(&'static str, &'a dyn Scope)>,
}

impl<'a> ScopeChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: &'static str, scope: &'a dyn Scope) -> Self {
        self.tiers.push((label, scope));
        self
    }

    /// Find a name, returning the label of the scope that defined it
    pub fn lookup(&self, name: &str) -> Option<(&'static str, Value)> {
        self.tiers
            .iter()
            .find_map(|(label, scope)| scope.lookup(name).map(|value| (*label, value)))
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|(label, _)| *label).collect()
    }
}

/// Everything a render needs besides the skin
#[derive(Clone, Default)]
pub struct RenderContext {
    handlers: HandlerRegistry,
    request: Arc<DataBag>,
    response: Arc<DataBag>,
    session: Option<Arc<DataBag>>,
    root: Option<ObjectScope>,
    global: Option<ObjectScope>,
    this: Option<HandlerRef>,
    config: RenderConfig,
    output: String,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a named handler, replacing any previous one of that name
    pub fn with_handler(self, name: impl Into<String>, handler: impl MacroHandler + 'static) -> Self {
        self.with_handler_ref(name, Arc::new(handler))
    }

    pub fn with_handler_ref(mut self, name: impl Into<String>, handler: HandlerRef) -> Self {
        self.handlers.register(name, handler);
        self
    }

    pub fn with_handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_request(mut self, request: DataBag) -> Self {
        self.request = Arc::new(request);
        self
    }

    pub fn with_response(mut self, response: DataBag) -> Self {
        self.response = Arc::new(response);
        self
    }

    pub fn with_session(mut self, session: DataBag) -> Self {
        self.session = Some(Arc::new(session));
        self
    }

    pub fn with_root(self, root: impl MacroHandler + 'static) -> Self {
        self.with_root_ref(Arc::new(root))
    }

    pub fn with_root_ref(mut self, root: HandlerRef) -> Self {
        self.root = Some(ObjectScope::named(root, ROOT_PREFIX));
        self
    }

    pub fn with_global(self, global: impl MacroHandler + 'static) -> Self {
        self.with_global_ref(Arc::new(global))
    }

    pub fn with_global_ref(mut self, global: HandlerRef) -> Self {
        self.global = Some(ObjectScope::new(global));
        self
    }

    pub fn with_this(self, this: impl MacroHandler + 'static) -> Self {
        self.with_this_ref(Arc::new(this))
    }

    pub fn with_this_ref(mut self, this: HandlerRef) -> Self {
        self.this = Some(this);
        self
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn request(&self) -> &DataBag {
        &self.request
    }

    pub fn response(&self) -> &DataBag {
        &self.response
    }

    pub fn session(&self) -> Option<&DataBag> {
        self.session.as_deref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn this(&self) -> Option<&HandlerRef> {
        self.this.as_ref()
    }

    pub fn root(&self) -> Option<&HandlerRef> {
        self.root.as_ref().map(ObjectScope::handler)
    }

    pub fn global(&self) -> Option<&HandlerRef> {
        self.global.as_ref().map(ObjectScope::handler)
    }

    /// Request data as a handler for `request.*` paths
    pub(crate) fn request_handler(&self) -> HandlerRef {
        self.request.clone()
    }

    /// Response data as a handler for `response.*` paths
    pub(crate) fn response_handler(&self) -> HandlerRef {
        self.response.clone()
    }

    /// Session data as a handler for `session.*` paths
    pub(crate) fn session_handler(&self) -> Option<HandlerRef> {
        self.session.clone().map(|s| s as HandlerRef)
    }

    /// Scopes for the first segment: handlers, response data, session data,
    /// root object, global scope
    pub fn scope_chain(&self) -> ScopeChain<'_> {
        let mut chain = ScopeChain::new()
            .with("handlers", &self.handlers)
            .with("response", &*self.response);
        if let Some(session) = &self.session {
            chain = chain.with("session", &**session);
        }
        if let Some(root) = &self.root {
            chain = chain.with("root", root);
        }
        if let Some(global) = &self.global {
            chain = chain.with("global", global);
        }
        chain
    }

    /// Text accumulated by [`Skin::render_to_buffer`](crate::Skin::render_to_buffer)
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub(crate) fn append_output(&mut self, text: &str) {
        self.output.push_str(text);
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("handlers", &self.handlers)
            .field("request", &self.request)
            .field("response", &self.response)
            .field("session", &self.session)
            .field("root", &self.root.is_some())
            .field("global", &self.global.is_some())
            .field("this", &self.this.is_some())
            .field("config", &self.config)
            .finish()
    }
}
