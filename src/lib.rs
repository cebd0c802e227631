//! Macroskin - a skin and macro template engine
//!
//! Skins are text templates with embedded macro tags such as
//! `<% site.title encoding=html %>`. A skin is parsed once into an immutable
//! [`Skin`] and rendered any number of times against a [`RenderContext`]
//! that supplies the handler objects macros resolve to.
//!
//! # Example
//!
//! ```rust
//! use macroskin::{render, Macro, ObjectHandler, RenderContext};
//!
//! let ctx = RenderContext::new()
//!     .with_handler("site", ObjectHandler::new("site").with_macro("title", Macro::text("Home")));
//!
//! let html = render("<h1><% site.title %></h1>", &ctx).unwrap();
//! assert_eq!(html, "<h1>Home</h1>");
//! ```

pub mod builtins;
pub mod context;
pub mod error;
pub mod handler;
pub mod parser;
pub mod registry;
pub mod renderer;
pub mod skin;

pub use context::{ObjectScope, RenderContext, Scope, ScopeChain};
pub use error::ParseError;
pub use handler::{
    DataBag, Filter, HandlerRef, HandlerRegistry, Macro, MacroCall, MacroError, MacroHandler,
    ObjectHandler, Params, Value,
};
pub use registry::{parse_skin_id, RegistryError, SkinRegistry};
pub use renderer::{
    ConfigError, FailMode, InvocationErrors, RenderConfig, SkinsConfig, UnknownSubskin,
};
pub use skin::Skin;

use thiserror::Error;

/// Errors that can occur during rendering
#[derive(Debug, Error)]
pub enum RenderError {
    /// Skin source does not parse
    #[error("parse errors in skin {skin}: {}", format_parse_errors(.errors))]
    Parse {
        skin: String,
        errors: Vec<ParseError>,
    },

    /// Requested subskin does not exist
    #[error("skin {skin} has no subskin '{subskin}'")]
    UnknownSubskin { skin: String, subskin: String },

    /// Skin identifier names no known skin
    #[error("skin not found: {name}")]
    SkinNotFound { name: String },

    /// A macro or filter failed and invocation errors abort the render
    #[error("error in macro {path} of skin {skin}: {source}")]
    Invocation {
        skin: String,
        path: String,
        source: MacroError,
    },

    /// Error from the skin registry
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse and render a skin source in one step
pub fn render(source: &str, ctx: &RenderContext) -> Result<String, RenderError> {
    render_with(source, None, &DataBag::new(), ctx)
}

/// Parse and render a subskin of a source with a parameter bag
///
/// # Example
///
/// ```rust
/// use macroskin::{render_with, DataBag, RenderContext};
///
/// let source = "main<% #row %><td><% param.cell %></td>";
/// let params = DataBag::new().with("cell", "42");
/// let row = render_with(source, Some("row"), &params, &RenderContext::new()).unwrap();
/// assert_eq!(row, "<td>42</td>");
/// ```
pub fn render_with(
    source: &str,
    subskin: Option<&str>,
    params: &DataBag,
    ctx: &RenderContext,
) -> Result<String, RenderError> {
    let skin = Skin::parse(source).map_err(|errors| RenderError::Parse {
        skin: skin::INLINE_SKIN_NAME.to_string(),
        errors,
    })?;
    skin.render_with(subskin, params, ctx)
}
