//! Attribute evaluation
//!
//! Reserved names (`failmode`, `default`, `prefix`, `suffix`, `encoding`) are
//! read by the invoker but stay in the parameters the macro sees.

use crate::handler::Params;
use crate::parser::{AttrValue, Attribute, Spanned};
use crate::RenderError;

use super::Renderer;

/// Evaluate attributes in source order, rendering fragment values first
pub(crate) fn evaluate(
    attributes: &[Spanned<Attribute>],
    renderer: &Renderer<'_>,
) -> Result<Params, RenderError> {
    let mut params = Params::new();
    for attr in attributes {
        let value = match &attr.node.value {
            AttrValue::Literal(text) => text.clone(),
            AttrValue::Fragment(fragment) => renderer.render_fragment(fragment)?,
        };
        match &attr.node.name {
            Some(name) => params.insert(name.clone(), value),
            None => params.push(value),
        }
    }
    Ok(params)
}
