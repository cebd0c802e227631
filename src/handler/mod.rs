//! Macro handlers
//!
//! A handler is any object that can serve as the target of a macro tag. The
//! engine never inspects handlers by reflection; everything it may ask of a
//! handler is a method of [`MacroHandler`], each with a default that says
//! "not supported":
//!
//! - [`get_macro`](MacroHandler::get_macro): the callable behind `<% h.name %>`
//! - [`get_filter`](MacroHandler::get_filter): the callable behind `| name`
//! - [`get_macro_handler`](MacroHandler::get_macro_handler): deep delegation to
//!   a nested handler for the next path segment
//! - [`get_property`](MacroHandler::get_property): plain own properties
//! - [`on_unhandled_macro`](MacroHandler::on_unhandled_macro): catch-all used
//!   when the handler has no macro of the requested name

mod bag;
mod object;
mod value;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

pub use bag::{DataBag, HandlerRegistry};
pub use object::ObjectHandler;
pub use value::Value;

/// Shared reference to a handler
pub type HandlerRef = Arc<dyn MacroHandler>;

/// Capabilities a handler offers to the template engine
pub trait MacroHandler: Send + Sync {
    fn get_macro(&self, _name: &str) -> Option<Macro> {
        None
    }

    fn get_filter(&self, _name: &str) -> Option<Filter> {
        None
    }

    fn get_macro_handler(&self, _name: &str) -> Option<HandlerRef> {
        None
    }

    fn get_property(&self, _name: &str) -> Option<Value> {
        None
    }

    /// Returns `None` when the handler has no catch-all
    fn on_unhandled_macro(
        &self,
        _name: &str,
        _call: &mut MacroCall<'_>,
    ) -> Option<Result<(), MacroError>> {
        None
    }
}

/// Error raised by a macro or filter body
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MacroError {
    #[error("{0}")]
    Failed(String),

    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter { name: String, value: String },
}

impl MacroError {
    pub fn msg(message: impl Into<String>) -> Self {
        MacroError::Failed(message.into())
    }
}

/// Evaluated attributes of a macro tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named parameter
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.named.push((name.into(), value.into()));
    }

    /// Add a positional parameter
    pub fn push(&mut self, value: impl Into<String>) {
        self.positional.push(value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn with_positional(mut self, value: impl Into<String>) -> Self {
        self.push(value);
        self
    }

    /// Value of a named parameter; the last occurrence wins
    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.iter().any(|(n, _)| n == name)
    }

    /// Parse a named parameter, `Ok(None)` if it is absent
    pub fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, MacroError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| MacroError::InvalidParameter {
                    name: name.to_string(),
                    value: raw.to_string(),
                }),
        }
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Named parameters in the order they appeared
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.named.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

/// Output sink and arguments handed to a macro body
///
/// Macros that produce text write it here, either with [`MacroCall::write`]
/// or through [`std::fmt::Write`].
pub struct MacroCall<'a> {
    name: &'a str,
    params: &'a Params,
    out: &'a mut String,
}

impl<'a> MacroCall<'a> {
    pub fn new(name: &'a str, params: &'a Params, out: &'a mut String) -> Self {
        Self { name, params, out }
    }

    /// Short name the macro was invoked as
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn params(&self) -> &'a Params {
        self.params
    }

    pub fn param(&self, name: &str) -> Option<&'a str> {
        self.params.get(name)
    }

    pub fn write(&mut self, text: &str) {
        self.out.push_str(text);
    }
}

impl fmt::Write for MacroCall<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.out.push_str(s);
        Ok(())
    }
}

type MacroBody = dyn Fn(&mut MacroCall<'_>) -> Result<(), MacroError> + Send + Sync;
type FilterBody = dyn Fn(&str, &Params) -> Result<String, MacroError> + Send + Sync;

/// A callable macro
#[derive(Clone)]
pub struct Macro(Arc<MacroBody>);

impl Macro {
    /// Macro that writes its output into the call
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&mut MacroCall<'_>) -> Result<(), MacroError> + Send + Sync + 'static,
    {
        Self(Arc::new(body))
    }

    /// Macro that returns its output; the result is written into the call
    pub fn returning<F>(body: F) -> Self
    where
        F: Fn(&Params) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        Self::new(move |call| {
            let text = body(call.params())?;
            call.write(&text);
            Ok(())
        })
    }

    /// Macro that always produces the same text
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |call| {
            call.write(&text);
            Ok(())
        })
    }

    pub fn call(&self, call: &mut MacroCall<'_>) -> Result<(), MacroError> {
        (self.0)(call)
    }
}

impl fmt::Debug for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Macro(..)")
    }
}

/// A callable output filter
#[derive(Clone)]
pub struct Filter(Arc<FilterBody>);

impl Filter {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&str, &Params) -> Result<String, MacroError> + Send + Sync + 'static,
    {
        Self(Arc::new(body))
    }

    pub fn call(&self, input: &str, params: &Params) -> Result<String, MacroError> {
        (self.0)(input, params)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}
