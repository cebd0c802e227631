//! Macro invocation and failure policy
//!
//! On the resolved handler a name is tried as a macro, then as a scalar
//! property, then through the handler's catch-all. Output passes through the
//! tag's filters and then the standard parameters. Unresolved names and
//! failing macros are contained per tag.

use tracing::{debug, warn};

use crate::handler::{HandlerRef, MacroCall, MacroError, Params};
use crate::parser::MacroTag;
use crate::RenderError;

use super::config::{FailMode, InvocationErrors};
use super::resolver::{self, Resolution};
use super::{attributes, encoding, Renderer};

enum Outcome {
    Output(String),
    /// Diagnostic label, e.g. `Unhandled macro: a.b`
    Unhandled(String),
    /// The name is a plain function or object
    NotAMacro,
    Failed { what: String, error: MacroError },
}

/// Invoke the macro of `tag` and write its result to `out`
pub(crate) fn invoke(
    tag: &MacroTag,
    params: &Params,
    renderer: &Renderer<'_>,
    out: &mut String,
) -> Result<(), RenderError> {
    let path = tag.path.node.to_string();
    let outcome = match resolver::resolve_macro(&tag.path.node, renderer) {
        Resolution::Resolved { handler, name } => call_target(&handler, &name, params, &path),
        Resolution::Undefined { candidates, name } => candidates
            .iter()
            .find_map(|handler| catch_all(handler, &name, params, &path))
            .unwrap_or_else(|| unhandled(&path)),
        Resolution::Unresolved { .. } => Outcome::Unhandled(format!("Unhandled macro: {}", path)),
    };
    let outcome = match outcome {
        Outcome::Output(text) => apply_filters(text, tag, renderer)?,
        other => other,
    };

    match outcome {
        Outcome::Output(text) => write_standard(&text, params, out),
        Outcome::Unhandled(label) => {
            if let Some(default) = params.get("default") {
                out.push_str(default);
            } else if failmode(params, renderer) == FailMode::Verbose {
                out.push_str(&format!("[{}]", label));
            }
        }
        Outcome::NotAMacro => {
            debug!(skin = renderer.skin_name(), path = %path, "not a macro");
            if let Some(default) = params.get("default") {
                out.push_str(default);
            } else if explicit_failmode(params) == Some(FailMode::Verbose) {
                out.push_str(&format!("[Unhandled macro: {} is not a macro]", path));
            }
        }
        Outcome::Failed { what, error } => match renderer.ctx().config().invocation_errors {
            InvocationErrors::Inline => {
                warn!(skin = renderer.skin_name(), path = %what, %error, "macro failed");
                out.push_str(&format!("[Error in macro {}: {}]", what, error));
            }
            InvocationErrors::Abort => {
                return Err(RenderError::Invocation {
                    skin: renderer.skin_name().to_string(),
                    path: what,
                    source: error,
                });
            }
        },
    }
    Ok(())
}

fn call_target(handler: &HandlerRef, name: &str, params: &Params, path: &str) -> Outcome {
    let mut buf = String::new();

    if let Some(body) = handler.get_macro(name) {
        let mut call = MacroCall::new(name, params, &mut buf);
        return match body.call(&mut call) {
            Ok(()) => Outcome::Output(buf),
            Err(error) => failed(path, error),
        };
    }

    let property = handler.get_property(name);
    if let Some(text) = property.as_ref().and_then(|value| value.to_text()) {
        return Outcome::Output(text);
    }

    if let Some(outcome) = catch_all(handler, name, params, path) {
        return outcome;
    }

    match property {
        Some(_) => Outcome::NotAMacro,
        None => unhandled(path),
    }
}

/// Hand `name` to the handler's catch-all; `None` if it declines
fn catch_all(handler: &HandlerRef, name: &str, params: &Params, path: &str) -> Option<Outcome> {
    let mut buf = String::new();
    let mut call = MacroCall::new(name, params, &mut buf);
    let result = handler.on_unhandled_macro(name, &mut call)?;
    Some(match result {
        Ok(()) => Outcome::Output(buf),
        Err(error) => failed(path, error),
    })
}

fn unhandled(path: &str) -> Outcome {
    debug!(path, "unresolved macro");
    Outcome::Unhandled(format!("Unhandled macro: {}", path))
}

fn failed(what: &str, error: MacroError) -> Outcome {
    Outcome::Failed {
        what: what.to_string(),
        error,
    }
}

/// Run the tag's filters left to right over the macro output
fn apply_filters(
    mut text: String,
    tag: &MacroTag,
    renderer: &Renderer<'_>,
) -> Result<Outcome, RenderError> {
    for filter in &tag.filters {
        let filter_path = &filter.node.path.node;
        let filter_params = attributes::evaluate(&filter.node.attributes, renderer)?;
        let Some(body) = resolver::resolve_filter(filter_path, renderer) else {
            return Ok(Outcome::Unhandled(format!("Unhandled filter: {}", filter_path)));
        };
        text = match body.call(&text, &filter_params) {
            Ok(text) => text,
            Err(error) => return Ok(failed(&filter_path.to_string(), error)),
        };
    }
    Ok(Outcome::Output(text))
}

/// Apply `encoding`, then `default` for empty output or `prefix`/`suffix`
fn write_standard(text: &str, params: &Params, out: &mut String) {
    let encoded;
    let text = match params.get("encoding") {
        Some(name) => {
            encoded = encoding::encode(text, name);
            encoded.as_str()
        }
        None => text,
    };

    if text.is_empty() {
        if let Some(default) = params.get("default") {
            out.push_str(default);
        }
        return;
    }
    if let Some(prefix) = params.get("prefix") {
        out.push_str(prefix);
    }
    out.push_str(text);
    if let Some(suffix) = params.get("suffix") {
        out.push_str(suffix);
    }
}

fn explicit_failmode(params: &Params) -> Option<FailMode> {
    let raw = params.get("failmode")?;
    let mode = FailMode::parse(raw);
    if mode.is_none() {
        debug!(failmode = raw, "ignoring unknown failmode");
    }
    mode
}

fn failmode(params: &Params, renderer: &Renderer<'_>) -> FailMode {
    explicit_failmode(params).unwrap_or(renderer.ctx().config().failmode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RenderContext;
    use crate::handler::{Macro, ObjectHandler};
    use crate::renderer::RenderConfig;
    use crate::skin::Skin;
    use pretty_assertions::assert_eq;

    fn render(source: &str, ctx: &RenderContext) -> String {
        Skin::parse(source)
            .expect("Should parse")
            .render(ctx)
            .expect("Should render")
    }

    fn ctx_with_this(this: ObjectHandler) -> RenderContext {
        RenderContext::new().with_this(this)
    }

    #[test]
    fn test_macro_before_property() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this")
                .with_macro("x", Macro::text("macro"))
                .with_property("x", "property"),
        );
        assert_eq!(render("<% this.x %>", &ctx), "macro");
    }

    #[test]
    fn test_scalar_properties_render_as_text() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this")
                .with_property("s", "bar")
                .with_property("n", 42)
                .with_property("b", false)
                .with_property("z", None::<&str>),
        );
        assert_eq!(render("<% this.s %>|<% this.n %>|<% this.b %>|<% this.z %>", &ctx), "bar|42|false|");
    }

    #[test]
    fn test_catch_all_gets_unknown_names() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_unhandled_macro(|name, call| {
            call.write(&format!("<{}:{}>", name, call.param("a").unwrap_or("")));
            Ok(())
        }));
        assert_eq!(render("<% this.anything a=1 %>", &ctx), "<anything:1>");
    }

    #[test]
    fn test_bare_name_reaches_this_catch_all_with_global() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_unhandled_macro(|name, call| {
            call.write(&format!("caught {}", name));
            Ok(())
        }))
        .with_global(ObjectHandler::new("global"));
        assert_eq!(render("<% foo %>", &ctx), "caught foo");
    }

    #[test]
    fn test_bare_name_defined_on_global_skips_this_catch_all() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_unhandled_macro(|_, call| {
            call.write("caught");
            Ok(())
        }))
        .with_global(ObjectHandler::new("global").with_macro("foo", Macro::text("global")));
        assert_eq!(render("<% foo %>", &ctx), "global");
    }

    #[test]
    fn test_bare_name_falls_through_to_global_catch_all() {
        let ctx = ctx_with_this(ObjectHandler::new("this")).with_global(
            ObjectHandler::new("global").with_unhandled_macro(|name, call| {
                call.write(&format!("global {}", name));
                Ok(())
            }),
        );
        assert_eq!(render("<% foo %>", &ctx), "global foo");
        let bare = RenderContext::new()
            .with_this(ObjectHandler::new("this"))
            .with_global(ObjectHandler::new("global"));
        assert_eq!(render("<% foo %>", &bare), "[Unhandled macro: foo]");
    }

    #[test]
    fn test_property_wins_over_catch_all() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this")
                .with_property("x", "prop")
                .with_unhandled_macro(|_, call| {
                    call.write("caught");
                    Ok(())
                }),
        );
        assert_eq!(render("<% this.x %>", &ctx), "prop");
    }

    #[test]
    fn test_function_property_is_not_a_macro() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_function("fn"));
        assert_eq!(render("[<% this.fn %>]", &ctx), "[]");
        assert_eq!(render("<% this.fn default=d %>", &ctx), "d");
        assert_eq!(
            render("<% this.fn failmode=verbose %>", &ctx),
            "[Unhandled macro: this.fn is not a macro]"
        );
    }

    #[test]
    fn test_unresolved_policy() {
        let ctx = RenderContext::new();
        assert_eq!(render("<% this.foo %>", &ctx), "[Unhandled macro: this.foo]");
        assert_eq!(render("<% this.foo failmode=silent %>", &ctx), "");
        assert_eq!(render("<% this.foo default=ok %>", &ctx), "ok");
        assert_eq!(render("<% this.foo failmode=bogus %>", &ctx), "[Unhandled macro: this.foo]");
    }

    #[test]
    fn test_configured_silent_failmode() {
        let ctx = RenderContext::new().with_config(RenderConfig::new().with_failmode(FailMode::Silent));
        assert_eq!(render("<% this.foo %>", &ctx), "");
        assert_eq!(
            render("<% this.foo failmode=verbose %>", &ctx),
            "[Unhandled macro: this.foo]"
        );
    }

    #[test]
    fn test_diagnostics_are_not_wrapped() {
        let ctx = RenderContext::new();
        assert_eq!(
            render("<% this.foo prefix=< suffix=> %>", &ctx),
            "[Unhandled macro: this.foo]"
        );
    }

    #[test]
    fn test_invocation_error_inline() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this").with_returning("bad", |_| Err(MacroError::msg("boom"))),
        );
        assert_eq!(render("a<% this.bad %>b", &ctx), "a[Error in macro this.bad: boom]b");
    }

    #[test]
    fn test_invocation_error_abort() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this").with_returning("bad", |_| Err(MacroError::msg("boom"))),
        )
        .with_config(RenderConfig::new().with_invocation_errors(InvocationErrors::Abort));
        let result = Skin::parse("<% this.bad %>").unwrap().render(&ctx);
        match result {
            Err(RenderError::Invocation { path, source, .. }) => {
                assert_eq!(path, "this.bad");
                assert_eq!(source, MacroError::msg("boom"));
            }
            other => panic!("Expected invocation error, got {:?}", other),
        }
    }

    #[test]
    fn test_standard_parameters() {
        let ctx = ctx_with_this(
            ObjectHandler::new("this")
                .with_property("name", "<b>")
                .with_property("empty", ""),
        );
        assert_eq!(render("<% this.name prefix=( suffix=) %>", &ctx), "(<b>)");
        assert_eq!(render("<% this.name encoding=html %>", &ctx), "&lt;b&gt;");
        assert_eq!(render("<% this.empty prefix=( suffix=) %>", &ctx), "");
        assert_eq!(render("<% this.empty default=none prefix=( %>", &ctx), "none");
    }

    #[test]
    fn test_filters_apply_left_to_right() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_property("x", "ab")).with_global(
            ObjectHandler::new("global")
                .with_filter("double", |s, _| Ok(format!("{}{}", s, s)))
                .with_filter("wrap", |s, p| {
                    let with = p.get("with").unwrap_or("*");
                    Ok(format!("{}{}{}", with, s, with))
                }),
        );
        assert_eq!(render("<% this.x | double | wrap with=- %>", &ctx), "-abab-");
        assert_eq!(render("<% this.x prefix=[ suffix=] | wrap | double %>", &ctx), "[*ab**ab*]");
    }

    #[test]
    fn test_unresolved_and_failing_filters() {
        let ctx = ctx_with_this(ObjectHandler::new("this").with_property("x", "ab")).with_global(
            ObjectHandler::new("global").with_filter("bad", |_, _| Err(MacroError::msg("nope"))),
        );
        assert_eq!(render("<% this.x | missing %>", &ctx), "[Unhandled filter: missing]");
        assert_eq!(render("<% this.x failmode=silent | missing %>", &ctx), "");
        assert_eq!(render("<% this.x default=d | missing %>", &ctx), "d");
        assert_eq!(render("<% this.x | bad %>", &ctx), "[Error in macro bad: nope]");
    }
}
