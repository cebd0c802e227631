//! Macro path resolution
//!
//! The first segment of a multi-segment path is looked up through the
//! built-in prefixes and then the context's scope chain. Each further segment
//! but the last descends into a nested handler. Single-segment paths are
//! looked up on `this` and then the global scope.

use tracing::debug;

use crate::context::RenderContext;
use crate::handler::{Filter, HandlerRef, MacroHandler};
use crate::parser::MacroPath;

use super::Renderer;

/// Outcome of resolving a macro path
#[derive(Clone)]
pub(crate) enum Resolution {
    Resolved { handler: HandlerRef, name: String },
    /// Bare name no candidate defines; their catch-alls are tried in order
    Undefined {
        candidates: Vec<HandlerRef>,
        name: String,
    },
    Unresolved { path: String, segment: String },
}

impl std::fmt::Debug for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved { name, .. } => {
                f.debug_struct("Resolved").field("name", name).finish()
            }
            Resolution::Undefined { candidates, name } => f
                .debug_struct("Undefined")
                .field("candidates", &candidates.len())
                .field("name", name)
                .finish(),
            Resolution::Unresolved { path, segment } => f
                .debug_struct("Unresolved")
                .field("path", path)
                .field("segment", segment)
                .finish(),
        }
    }
}

/// Resolve a macro path to its handler and final name
pub(crate) fn resolve_macro(path: &MacroPath, renderer: &Renderer<'_>) -> Resolution {
    let name = path.name();
    if path.len() == 1 {
        return resolve_bare(name, renderer);
    }

    match resolve_handler(path.handler_path(), renderer) {
        Ok(handler) => Resolution::Resolved {
            handler,
            name: name.to_string(),
        },
        Err(segment) => {
            debug!(
                skin = renderer.skin_name(),
                path = %path,
                segment = %segment,
                "unresolved macro handler"
            );
            Resolution::Unresolved {
                path: path.to_string(),
                segment,
            }
        }
    }
}

/// `this`, then global: the first that defines `name` wins
fn resolve_bare(name: &str, renderer: &Renderer<'_>) -> Resolution {
    let candidates: Vec<HandlerRef> = bare_candidates(renderer).cloned().collect();
    if let Some(handler) = candidates
        .iter()
        .find(|h| h.get_macro(name).is_some() || h.get_property(name).is_some())
    {
        return Resolution::Resolved {
            handler: handler.clone(),
            name: name.to_string(),
        };
    }
    if candidates.is_empty() {
        debug!(skin = renderer.skin_name(), name, "no handler for bare macro");
        return Resolution::Unresolved {
            path: name.to_string(),
            segment: name.to_string(),
        };
    }
    Resolution::Undefined {
        candidates,
        name: name.to_string(),
    }
}

/// Resolve a filter path; `None` if the path or the filter is not found
pub(crate) fn resolve_filter(path: &MacroPath, renderer: &Renderer<'_>) -> Option<Filter> {
    let name = path.name();
    let filter = if path.len() == 1 {
        bare_candidates(renderer).find_map(|h| h.get_filter(name))
    } else {
        resolve_handler(path.handler_path(), renderer)
            .ok()
            .and_then(|h| h.get_filter(name))
    };
    if filter.is_none() {
        debug!(skin = renderer.skin_name(), path = %path, "unresolved filter");
    }
    filter
}

fn bare_candidates<'r>(renderer: &'r Renderer<'_>) -> impl Iterator<Item = &'r HandlerRef> + 'r {
    let ctx: &'r RenderContext = renderer.ctx();
    ctx.this().into_iter().chain(ctx.global())
}

/// Walk the handler segments of a path; `Err` carries the failed segment
fn resolve_handler(segments: &[String], renderer: &Renderer<'_>) -> Result<HandlerRef, String> {
    let Some((first, rest)) = segments.split_first() else {
        return Err(String::new());
    };
    let mut current = first_handler(first, renderer).ok_or_else(|| first.clone())?;
    for segment in rest {
        current = descend(current.as_ref(), segment).ok_or_else(|| segment.clone())?;
    }
    Ok(current)
}

fn first_handler(name: &str, renderer: &Renderer<'_>) -> Option<HandlerRef> {
    let ctx = renderer.ctx();
    match name {
        "this" => ctx.this().cloned(),
        "param" => Some(renderer.params().clone()),
        "request" => Some(ctx.request_handler()),
        "response" => Some(ctx.response_handler()),
        "session" => ctx.session_handler(),
        _ => {
            let (scope, value) = ctx.scope_chain().lookup(name)?;
            let handler = value.into_handler();
            if handler.is_none() {
                debug!(name, scope, "name is defined but is not an object");
            }
            handler
        }
    }
}

/// Nested handler for `segment`: delegation first, then an object property
fn descend(handler: &dyn MacroHandler, segment: &str) -> Option<HandlerRef> {
    handler
        .get_macro_handler(segment)
        .or_else(|| handler.get_property(segment).and_then(|v| v.into_handler()))
}
