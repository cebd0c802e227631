//! Integration tests for loading skins from a directory

use std::path::PathBuf;

use macroskin::{
    DataBag, FailMode, ObjectHandler, RegistryError, RenderConfig, RenderContext, RenderError,
    SkinRegistry, UnknownSubskin,
};
use pretty_assertions::assert_eq;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn page_context() -> RenderContext {
    RenderContext::new()
        .with_root(ObjectHandler::new("root").with_property("name", "Site"))
        .with_this(ObjectHandler::new("story").with_property("body", "Once upon a time"))
        .with_response(DataBag::new().with("title", "Stories"))
}

#[test]
fn test_load_on_demand() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("skins"));
    assert!(registry.is_empty());

    let skin = registry.load("page").expect("Should load page.skin");
    assert_eq!(skin.name(), Some("page"));
    assert!(skin.has_subskin("footer"));
    assert_eq!(registry.names(), vec!["page"]);

    let again = registry.load("page").unwrap();
    assert!(std::sync::Arc::ptr_eq(&skin, &again));
}

#[test]
fn test_load_dir_names_by_relative_path() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("skins"));
    assert_eq!(registry.load_dir().unwrap(), 2);
    assert_eq!(registry.names(), vec!["Story/item", "page"]);
    assert_eq!(registry.load_dir().unwrap(), 0);
}

#[test]
fn test_render_by_id() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("skins"));
    let ctx = page_context();
    let params = DataBag::new();

    assert_eq!(
        registry.render("page", &ctx, &params).unwrap(),
        "<html><title>Stories</title><body>Once upon a time</body></html>"
    );
    assert_eq!(
        registry.render("page#footer", &ctx, &params).unwrap(),
        "<footer>Site</footer>"
    );
}

#[test]
fn test_render_nested_skin_with_params() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("skins"));
    let ctx = RenderContext::new();

    let params = DataBag::new().with("title", "Fish & Chips");
    assert_eq!(
        registry.render("Story/item", &ctx, &params).unwrap(),
        "<li>Fish &amp; Chips</li>"
    );
    assert_eq!(
        registry.render("Story/item#empty", &ctx, &DataBag::new()).unwrap(),
        r#"<li class="empty">Nothing here</li>"#
    );
}

#[test]
fn test_render_missing_skin() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("skins"));
    let err = registry
        .render("nope", &RenderContext::new(), &DataBag::new())
        .unwrap_err();
    assert!(matches!(err, RenderError::SkinNotFound { ref name } if name == "nope"));

    let err = registry
        .render("page#", &RenderContext::new(), &DataBag::new())
        .unwrap_err();
    assert!(matches!(
        err,
        RenderError::Registry(RegistryError::InvalidId { .. })
    ));
}

#[test]
fn test_ids_cannot_leave_the_skin_directory() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("broken"));
    let ctx = page_context();
    let absolute = fixtures().join("skins").join("page");
    let absolute = absolute.to_str().expect("Fixture path should be UTF-8");

    for id in ["../skins/page", "../skins/page#footer", absolute] {
        let err = registry.render(id, &ctx, &DataBag::new()).unwrap_err();
        assert!(
            matches!(err, RenderError::Registry(RegistryError::InvalidId { .. })),
            "{} gave {:?}",
            id,
            err
        );
    }
    assert!(registry.is_empty());
}

#[test]
fn test_broken_skin_reports_parse_errors() {
    let mut registry = SkinRegistry::with_base_path(fixtures().join("broken"));
    let err = registry
        .render("bad", &RenderContext::new(), &DataBag::new())
        .unwrap_err();
    match err {
        RenderError::Parse { skin, errors } => {
            assert_eq!(skin, "bad");
            assert!(!errors.is_empty());
        }
        other => panic!("Expected parse error, got {:?}", other),
    }
    assert!(!registry.contains("bad"));

    assert!(matches!(
        registry.load_dir(),
        Err(RegistryError::Parse { ref name, .. }) if name == "bad"
    ));
}

#[test]
fn test_registry_from_config_file() {
    let config = RenderConfig::from_file(&fixtures().join("render.toml")).expect("Should load");
    assert_eq!(config.failmode, FailMode::Silent);
    assert_eq!(config.unknown_subskin, UnknownSubskin::Main);
    assert_eq!(config.skins.path, Some(fixtures().join("skins")));

    let mut registry = SkinRegistry::from_config(&config.skins);
    let ctx = page_context().with_config(config);
    assert_eq!(
        registry.render("page#sidebar", &ctx, &DataBag::new()).unwrap(),
        "<html><title>Stories</title><body>Once upon a time</body></html>"
    );
}
