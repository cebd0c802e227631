//! Skin renderer
//!
//! Rendering walks the nodes of one subskin left to right. Literal text is
//! copied through; each macro tag has its attributes evaluated (nested
//! fragments first), its path resolved against the [`RenderContext`], and
//! its macro invoked with filters and standard parameters applied.

mod attributes;
pub mod config;
mod encoding;
mod invoker;
mod resolver;

use std::sync::Arc;

use tracing::{debug, trace};

use crate::context::RenderContext;
use crate::handler::{DataBag, HandlerRef};
use crate::parser::{Fragment, MacroTag, Node, MAIN_SUBSKIN};
use crate::skin::Skin;
use crate::RenderError;

pub use config::{
    ConfigError, FailMode, InvocationErrors, RenderConfig, SkinsConfig, UnknownSubskin,
};
pub use encoding::encode;

/// State shared by all tags of one render call
pub(crate) struct Renderer<'a> {
    ctx: &'a RenderContext,
    params: HandlerRef,
    skin: &'a str,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(ctx: &'a RenderContext, params: HandlerRef, skin: &'a str) -> Self {
        Self { ctx, params, skin }
    }

    pub(crate) fn ctx(&self) -> &'a RenderContext {
        self.ctx
    }

    /// Parameter bag of the render call, reachable as `param.*`
    pub(crate) fn params(&self) -> &HandlerRef {
        &self.params
    }

    pub(crate) fn skin_name(&self) -> &'a str {
        self.skin
    }

    pub(crate) fn render_nodes<'n>(
        &self,
        nodes: impl IntoIterator<Item = &'n Node>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            match node {
                Node::Literal(text) => out.push_str(&text.node),
                Node::Macro(tag) => self.render_tag(tag, out)?,
            }
        }
        Ok(())
    }

    fn render_tag(&self, tag: &MacroTag, out: &mut String) -> Result<(), RenderError> {
        trace!(skin = self.skin, tag = %tag.path.node, "rendering macro tag");
        let params = attributes::evaluate(&tag.attributes, self)?;
        invoker::invoke(tag, &params, self, out)
    }

    /// Render a nested fragment to text
    pub(crate) fn render_fragment(&self, fragment: &Fragment) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_nodes(&fragment.nodes, &mut out)?;
        Ok(out)
    }
}

impl Skin {
    /// Render the `main` section
    pub fn render(&self, ctx: &RenderContext) -> Result<String, RenderError> {
        self.render_with(None, &DataBag::new(), ctx)
    }

    /// Render a named section
    pub fn render_subskin(&self, subskin: &str, ctx: &RenderContext) -> Result<String, RenderError> {
        self.render_with(Some(subskin), &DataBag::new(), ctx)
    }

    /// Render a section with a parameter bag reachable as `param.*`
    ///
    /// `None` selects `main`.
    pub fn render_with(
        &self,
        subskin: Option<&str>,
        params: &DataBag,
        ctx: &RenderContext,
    ) -> Result<String, RenderError> {
        let section = self.select_subskin(subskin, ctx)?;
        debug!(skin = self.display_name(), subskin = section, "rendering skin");

        let mut out = String::new();
        let Some(nodes) = self.subskin_nodes(section) else {
            return Ok(out);
        };
        let params: HandlerRef = Arc::new(params.clone());
        Renderer::new(ctx, params, self.display_name()).render_nodes(nodes, &mut out)?;
        Ok(out)
    }

    /// Render into the context's output buffer
    ///
    /// Nothing is appended if the render fails.
    pub fn render_to_buffer(
        &self,
        ctx: &mut RenderContext,
        subskin: Option<&str>,
        params: &DataBag,
    ) -> Result<(), RenderError> {
        let text = self.render_with(subskin, params, ctx)?;
        ctx.append_output(&text);
        Ok(())
    }

    fn select_subskin<'s>(
        &'s self,
        requested: Option<&'s str>,
        ctx: &RenderContext,
    ) -> Result<&'s str, RenderError> {
        let name = requested.unwrap_or(MAIN_SUBSKIN);
        if self.has_subskin(name) {
            return Ok(name);
        }
        match ctx.config().unknown_subskin {
            UnknownSubskin::Error => Err(RenderError::UnknownSubskin {
                skin: self.display_name().to_string(),
                subskin: name.to_string(),
            }),
            UnknownSubskin::Main => {
                debug!(
                    skin = self.display_name(),
                    subskin = name,
                    "unknown subskin, rendering main"
                );
                Ok(MAIN_SUBSKIN)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Macro, ObjectHandler};
    use pretty_assertions::assert_eq;

    fn skin(source: &str) -> Skin {
        Skin::parse(source).expect("Should parse")
    }

    #[test]
    fn test_passthrough() {
        let ctx = RenderContext::new();
        assert_eq!(skin("plain text, no tags").render(&ctx).unwrap(), "plain text, no tags");
        assert_eq!(skin("").render(&ctx).unwrap(), "");
    }

    #[test]
    fn test_param_bag_is_reachable() {
        let ctx = RenderContext::new();
        let params = DataBag::new().with("who", "world");
        let out = skin("hello <% param.who %>")
            .render_with(None, &params, &ctx)
            .unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn test_subskins() {
        let ctx = RenderContext::new();
        let s = skin("A<% #one %>B<% #main %>C");
        assert_eq!(s.render(&ctx).unwrap(), "AC");
        assert_eq!(s.render_subskin("one", &ctx).unwrap(), "B");
    }

    #[test]
    fn test_unknown_subskin_errors_by_default() {
        let ctx = RenderContext::new();
        let result = skin("A").render_subskin("nope", &ctx);
        assert!(matches!(
            result,
            Err(RenderError::UnknownSubskin { ref subskin, .. }) if subskin == "nope"
        ));
    }

    #[test]
    fn test_unknown_subskin_can_fall_back_to_main() {
        let ctx = RenderContext::new()
            .with_config(RenderConfig::new().with_unknown_subskin(UnknownSubskin::Main));
        assert_eq!(skin("A").render_subskin("nope", &ctx).unwrap(), "A");
    }

    #[test]
    fn test_render_to_buffer_appends() {
        let mut ctx =
            RenderContext::new().with_this(ObjectHandler::new("this").with_macro("x", Macro::text("X")));
        let s = skin("<% this.x %>.");
        s.render_to_buffer(&mut ctx, None, &DataBag::new()).unwrap();
        s.render_to_buffer(&mut ctx, None, &DataBag::new()).unwrap();
        assert_eq!(ctx.output(), "X.X.");
    }

    #[test]
    fn test_failed_render_leaves_buffer_untouched() {
        let mut ctx = RenderContext::new();
        ctx.append_output("before");
        let result = skin("A").render_to_buffer(&mut ctx, Some("nope"), &DataBag::new());
        assert!(result.is_err());
        assert_eq!(ctx.output(), "before");
    }
}
