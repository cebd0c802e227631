//! Integration tests for the render pipeline

use std::sync::Arc;
use std::thread;

use macroskin::{
    builtins, render, DataBag, FailMode, InvocationErrors, Macro, MacroError, ObjectHandler,
    RenderConfig, RenderContext, RenderError, Skin, UnknownSubskin, Value,
};
use pretty_assertions::assert_eq;

fn tier(label: &str) -> ObjectHandler {
    ObjectHandler::new(label).with_macro("who", Macro::text(label))
}

#[test]
fn test_passthrough_without_tags() {
    let ctx = RenderContext::new();
    for source in ["", "plain", "50% off <b>now</b>", "multi\nline\n  text %> stray"] {
        assert_eq!(render(source, &ctx).unwrap(), source);
    }
}

#[test]
fn test_precedence_chain() {
    let full = RenderContext::new()
        .with_handler("x", tier("registry"))
        .with_response(DataBag::new().with("x", Value::object(tier("response"))))
        .with_session(DataBag::new().with("x", Value::object(tier("session"))))
        .with_root(ObjectHandler::new("root").with_child("x", tier("root")))
        .with_global(ObjectHandler::new("global").with_child("x", tier("global")));
    assert_eq!(render("<% x.who %>", &full).unwrap(), "registry");

    let without_registry = RenderContext::new()
        .with_response(DataBag::new().with("x", Value::object(tier("response"))))
        .with_session(DataBag::new().with("x", Value::object(tier("session"))))
        .with_root(ObjectHandler::new("root").with_child("x", tier("root")))
        .with_global(ObjectHandler::new("global").with_child("x", tier("global")));
    assert_eq!(render("<% x.who %>", &without_registry).unwrap(), "response");

    let session_first = RenderContext::new()
        .with_session(DataBag::new().with("x", Value::object(tier("session"))))
        .with_root(ObjectHandler::new("root").with_child("x", tier("root")))
        .with_global(ObjectHandler::new("global").with_child("x", tier("global")));
    assert_eq!(render("<% x.who %>", &session_first).unwrap(), "session");

    let root_first = RenderContext::new()
        .with_root(ObjectHandler::new("root").with_child("x", tier("root")))
        .with_global(ObjectHandler::new("global").with_child("x", tier("global")));
    assert_eq!(render("<% x.who %>", &root_first).unwrap(), "root");

    let global_only =
        RenderContext::new().with_global(ObjectHandler::new("global").with_child("x", tier("global")));
    assert_eq!(render("<% x.who %>", &global_only).unwrap(), "global");
}

#[test]
fn test_idempotent_rendering() {
    let page = ObjectHandler::new("page")
        .with_property("title", "Home")
        .with_returning("items", |params| {
            Ok(params.positional().join("|"))
        });
    let ctx = RenderContext::new()
        .with_handler("page", page)
        .with_global(builtins::standard_global());
    let skin = Skin::parse("<h1><% page.title | uppercase %></h1><% page.items a b c prefix=[ suffix=] %>")
        .unwrap();

    let first = skin.render(&ctx).unwrap();
    let second = skin.render(&ctx).unwrap();
    assert_eq!(first, "<h1>HOME</h1>[a|b|c]");
    assert_eq!(first, second);
}

#[test]
fn test_shared_skin_across_threads() {
    let skin = Arc::new(Skin::parse("Hello <% param.name %>!").unwrap());
    let handles: Vec<_> = ["ann", "bob", "cy"]
        .into_iter()
        .map(|name| {
            let skin = Arc::clone(&skin);
            thread::spawn(move || {
                let ctx = RenderContext::new();
                let params = DataBag::new().with("name", name);
                skin.render_with(None, &params, &ctx).unwrap()
            })
        })
        .collect();
    let outputs: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(outputs, vec!["Hello ann!", "Hello bob!", "Hello cy!"]);
}

#[test]
fn test_this_catch_all_with_standard_global() {
    let ctx = RenderContext::new()
        .with_global(builtins::standard_global())
        .with_this(ObjectHandler::new("story").with_unhandled_macro(|name, call| {
            call.write(&format!("story:{}", name));
            Ok(())
        }));
    assert_eq!(
        render("<% headline %> <% echo hi %>", &ctx).unwrap(),
        "story:headline hi"
    );
}

#[test]
fn test_failmode_and_default_on_unresolved() {
    let ctx = RenderContext::new();
    assert!(render("<% nowhere.foo %>", &ctx).unwrap().contains("Unhandled"));
    assert_eq!(render("<% nowhere.foo failmode=silent %>", &ctx).unwrap(), "");
    assert_eq!(render("<% nowhere.foo default=ok %>", &ctx).unwrap(), "ok");
    assert_eq!(
        render("<% nowhere.foo failmode=silent default=ok %>", &ctx).unwrap(),
        "ok"
    );
}

#[test]
fn test_silent_by_configuration() {
    let ctx =
        RenderContext::new().with_config(RenderConfig::new().with_failmode(FailMode::Silent));
    assert_eq!(render("a<% nowhere.foo %>b", &ctx).unwrap(), "ab");
}

#[test]
fn test_abort_on_invocation_error() {
    let handler = ObjectHandler::new("h").with_returning("bad", |_| Err(MacroError::msg("boom")));
    let inline = RenderContext::new().with_handler("h", handler.clone());
    assert_eq!(
        render("x<% h.bad %>y", &inline).unwrap(),
        "x[Error in macro h.bad: boom]y"
    );

    let abort = RenderContext::new()
        .with_handler("h", handler)
        .with_config(RenderConfig::new().with_invocation_errors(InvocationErrors::Abort));
    let err = render("x<% h.bad %>y", &abort).unwrap_err();
    assert!(matches!(err, RenderError::Invocation { ref path, .. } if path == "h.bad"));
}

#[test]
fn test_unknown_subskin_policy() {
    let skin = Skin::parse_named("page", "body<% #nav %>links").unwrap();
    let strict = RenderContext::new();
    let err = skin.render_subskin("footer", &strict).unwrap_err();
    assert_eq!(err.to_string(), "skin page has no subskin 'footer'");

    let lenient = RenderContext::new()
        .with_config(RenderConfig::new().with_unknown_subskin(UnknownSubskin::Main));
    assert_eq!(skin.render_subskin("footer", &lenient).unwrap(), "body");
}

#[test]
fn test_builtin_filters_and_encoding() {
    let ctx = RenderContext::new()
        .with_global(builtins::standard_global())
        .with_response(DataBag::new().with("text", "  <Fish & Chips>  "));
    assert_eq!(
        render("<% response.text encoding=html | trim | lowercase %>", &ctx).unwrap(),
        "&lt;fish &amp; chips&gt;"
    );
    assert_eq!(
        render("<% response.text | trim | truncate limit=5 ellipsis=… %>", &ctx).unwrap(),
        "<Fish…"
    );
    assert_eq!(
        render("<% join a b c separator=- %>", &ctx).unwrap(),
        "a-b-c"
    );
}

#[test]
fn test_filter_error_is_contained() {
    let ctx = RenderContext::new().with_global(builtins::standard_global());
    assert_eq!(
        render("<% echo x | truncate %>", &ctx).unwrap(),
        "[Error in macro truncate: missing required parameter 'limit']"
    );
}

#[test]
fn test_render_to_buffer_collects_output() {
    let skin = Skin::parse("<% param.n %>;").unwrap();
    let mut ctx = RenderContext::new();
    for n in 1..=3 {
        let params = DataBag::new().with("n", n);
        skin.render_to_buffer(&mut ctx, None, &params).unwrap();
    }
    assert_eq!(ctx.take_output(), "1;2;3;");
    assert_eq!(ctx.output(), "");
}

#[test]
fn test_page_snapshot() {
    let ctx = RenderContext::new()
        .with_global(builtins::standard_global())
        .with_root(ObjectHandler::new("root").with_property("name", "Site"))
        .with_response(DataBag::new().with("title", "Welcome & hello"))
        .with_this(
            ObjectHandler::new("story")
                .with_property("author", "ann")
                .with_function("save"),
        );
    let skin = Skin::parse(
        "<title><% response.title encoding=html %></title>\
         <% // header is rendered by the layout %>\
         <p>by <% this.author | uppercase %><% this.save %></p>\
         <% this.missing %><% root.name prefix=' @ ' %>",
    )
    .unwrap();

    insta::assert_snapshot!(
        skin.render(&ctx).unwrap(),
        @"<title>Welcome &amp; hello</title><p>by ANN</p>[Unhandled macro: this.missing] @ Site"
    );
}

#[test]
fn test_parse_error_snapshot() {
    let err = render("ok <% this.x 'open %>", &RenderContext::new()).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"parse errors in skin <inline>: Unterminated string at 13..19"
    );
}
