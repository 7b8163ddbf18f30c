//! End-to-end rendering against a theme laid out on disk.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::{fs, path::Path};
use tempfile::TempDir;
use wpbem::{
    Bem, BemError, BemOptions, Format, KnownDevice, LocateOptions, Platform, StaticHost,
    UserAgentClassifier,
};

const PAGE_BH: &str = r#"<!DOCTYPE html><html><head><title>{{ tree.title }}</title>{{ tree.head|default('')|safe }}</head><body class="{{ tree|bem_class }}">{% for post in tree.content|default([]) %}<article class="{{ post|bem_class(tree.block) }}">{{ post.content }}</article>{% endfor %}{{ tree.footer|default('')|safe }}</body></html>"#;

const PAGE_BTREE: &str = r#"{"block": "page", "mods": {"view": {{ tree.view|tojson }}}, "title": {{ tree.title|tojson }}, "head": {{ tree.head|tojson }}, "footer": {{ tree.footer|tojson }}, "content": [{% for p in tree.data.posts %}{"elem": "post", "content": {{ p|tojson }}}{% if not loop.last %},{% endif %}{% endfor %}]}"#;

const PHONE_BH: &str = r#"<main class="phone">{{ tree.title }}</main>"#;

fn write(root: &Path, rel: &str, text: &str) {
    let p = root.join(rel);
    fs::create_dir_all(p.parent().unwrap()).unwrap();
    fs::write(p, text).unwrap();
}

/// desktop has the full bundle, touch-phone only a renderer, and a legacy
/// `about.json` sits at the theme root.
fn theme() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "desktop.pages/index/index.bh.j2", PAGE_BH);
    write(tmp.path(), "desktop.pages/index/index.btree.j2", PAGE_BTREE);
    write(
        tmp.path(),
        "desktop.pages/index/index.json",
        r#"{"block": "page", "title": "Static"}"#,
    );
    write(tmp.path(), "touch-phone.pages/index/index.bh.j2", PHONE_BH);
    write(tmp.path(), "about.json", r#"{"block": "about", "text": "Привет"}"#);
    tmp
}

fn host(root: &Path) -> StaticHost {
    let mut h = StaticHost::new(root, "https://example.org/theme");
    h.theme_version = Some("1.2".to_string());
    h.title = "Ёлка & Co".to_string();
    h.head_html = r#"<meta name="generator" content="wpbem">"#.to_string();
    h.footer_html = "<!-- footer hooks -->".to_string();
    h
}

fn not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<BemError>()
        .is_some_and(BemError::is_not_found)
}

#[test]
fn renders_page_through_tree_builder_and_renderer() {
    let theme = theme();
    let mut h = host(theme.path());
    let bem = Bem::init(&mut h, &KnownDevice::desktop(), BemOptions::new("index")).unwrap();

    assert_eq!(bem.platform(), Platform::Desktop);
    assert!(bem.engines().tree_builder.is_some());

    let html = bem
        .render_to_string(&h, json!({"posts": ["First", "Second"]}))
        .unwrap();

    assert!(html.starts_with("<!DOCTYPE html><html><head><title>Ёлка &amp; Co</title>"));
    assert!(html.contains(r#"<meta name="generator" content="wpbem">"#));
    assert!(html.contains(
        r#"<link rel="stylesheet" id="index-css" href="https://example.org/theme/desktop.pages/index/index.css?ver=1.2" media="all">"#
    ));
    assert!(html.contains(r#"<body class="page page_view_index">"#));
    assert!(html.contains(
        r#"<article class="page__post">First</article><article class="page__post">Second</article>"#
    ));
    assert!(html.contains(
        r#"<script id="index-js" src="https://example.org/theme/desktop.pages/index/index.js?ver=1.2"></script>"#
    ));
    assert!(html.ends_with("<!-- footer hooks --></body></html>"));
}

#[test]
fn render_writes_to_output() {
    let theme = theme();
    let mut h = host(theme.path());
    let bem = Bem::init(&mut h, &KnownDevice::desktop(), BemOptions::new("index")).unwrap();

    let mut out = Vec::new();
    bem.render(&h, json!({"posts": []}), &mut out).unwrap();
    let html = String::from_utf8(out).unwrap();
    assert_eq!(html, bem.render_to_string(&h, json!({"posts": []})).unwrap());
}

#[test]
fn desktop_tree_builder_keeps_phone_renderer() {
    let theme = theme();
    let mut h = host(theme.path());
    let bem = Bem::init(&mut h, &KnownDevice::phone(), BemOptions::new("index")).unwrap();

    // The tree builder only exists under desktop, so the recorded platform
    // switches. The phone directory is still searched first for the renderer.
    assert_eq!(bem.platform(), Platform::Desktop);
    assert!(bem.engines().tree_builder.is_some());
    assert_eq!(
        bem.resolver().bundles_path(),
        theme.path().join("touch-phone.pages")
    );
    assert_eq!(
        h.styles()[0].src,
        "https://example.org/theme/touch-phone.pages/index/index.css"
    );

    let html = bem.render_to_string(&h, json!({"posts": []})).unwrap();
    assert_eq!(html, r#"<main class="phone">Ёлка &amp; Co</main>"#);
}

#[test]
fn phone_bundle_without_tree_builder_stays_on_phone() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "touch-phone.pages/index/index.bh.j2", PHONE_BH);
    let mut h = host(tmp.path());

    let bem = Bem::init(&mut h, &KnownDevice::phone(), BemOptions::new("index")).unwrap();
    assert_eq!(bem.platform(), Platform::TouchPhone);
    assert!(bem.engines().tree_builder.is_none());
    assert_eq!(
        h.styles()[0].src,
        "https://example.org/theme/touch-phone.pages/index/index.css"
    );

    // Without a tree builder the renderer sees the root node itself.
    let html = bem.render_to_string(&h, json!(null)).unwrap();
    assert_eq!(html, r#"<main class="phone">Ёлка &amp; Co</main>"#);
}

#[test]
fn tablet_falls_back_to_desktop_engines() {
    let theme = theme();
    let mut h = host(theme.path());
    let ipad = UserAgentClassifier::new("Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X)").unwrap();

    let bem = Bem::init(&mut h, &ipad, BemOptions::new("index")).unwrap();

    // Engines come from desktop, assets stay under the requested platform.
    assert_eq!(bem.platform(), Platform::Desktop);
    assert_eq!(bem.resolver().bundles_path(), theme.path().join("touch-pad.pages"));
    assert_eq!(
        h.scripts()[0].src,
        "https://example.org/theme/touch-pad.pages/index/index.js"
    );
    let html = bem.render_to_string(&h, json!({"posts": []})).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
}

#[test]
fn admin_flag_wins_over_device() {
    let theme = TempDir::new().unwrap();
    write(theme.path(), "admin.pages/index/index.bh.j2", "admin:{{ tree.view }}");
    let mut h = host(theme.path());
    h.admin = true;

    let bem = Bem::init(&mut h, &KnownDevice::tablet(), BemOptions::new("index")).unwrap();
    assert_eq!(bem.platform(), Platform::Admin);
    assert_eq!(bem.render_to_string(&h, json!({})).unwrap(), "admin:index");
}

#[test]
fn explicit_platform_skips_detection() {
    let theme = theme();
    let mut h = host(theme.path());
    let opts = BemOptions::new("index").platform(Some(Platform::TouchPhone));

    // The desktop tree builder is still picked up, which moves us to desktop.
    let bem = Bem::init(&mut h, &KnownDevice::desktop(), opts).unwrap();
    assert_eq!(bem.platform(), Platform::Desktop);

    let opts = BemOptions::new("index").platform(Some(Platform::TouchPhone));
    let mut h = host(theme.path());
    let bem = Bem::with_engines(
        &mut h,
        &KnownDevice::desktop(),
        opts,
        wpbem::Engines::new(wpbem::TemplateRenderer::from_source("x", "ok").unwrap()),
    )
    .unwrap();
    assert_eq!(bem.platform(), Platform::TouchPhone);
}

#[test]
fn missing_renderer_is_fatal_even_with_root_file() {
    let tmp = TempDir::new().unwrap();
    // Engines never come from the theme root.
    write(tmp.path(), "index.bh.j2", PHONE_BH);
    let mut h = host(tmp.path());

    let err = Bem::init(&mut h, &KnownDevice::desktop(), BemOptions::new("index")).unwrap_err();
    assert!(not_found(&err));
    assert!(err.to_string().contains("Bundle 'index' not found"));
}

#[test]
fn json_output_is_valid_and_keeps_unicode() {
    let theme = theme();
    let mut h = host(theme.path());
    let bem = Bem::init(&mut h, &KnownDevice::desktop(), BemOptions::new("index")).unwrap();

    let mut out = Vec::new();
    bem.render_json(&h, json!({"posts": ["Съешь ещё"]}), &mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("Съешь ещё"));
    assert!(text.contains("Ёлка & Co"));
    assert!(!text.contains("\\u"));

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["block"], "page");
    assert_eq!(parsed["content"][0]["content"], "Съешь ещё");
}

#[test]
fn static_bemjson_is_rendered_when_included() {
    let theme = theme();
    let mut h = host(theme.path());
    let bem = Bem::init(
        &mut h,
        &KnownDevice::desktop(),
        BemOptions::new("index").include_bemjson(true),
    )
    .unwrap();

    assert_eq!(bem.bemjson(), &json!({"block": "page", "title": "Static"}));
    assert_eq!(
        bem.res(None, Format::Bemjson).unwrap(),
        r#"{"block":"page","title":"Static"}"#
    );
    let html = bem.get_html(None).unwrap();
    assert!(html.contains("<title>Static</title>"));
}

#[test]
fn get_bundle_uses_root_fallback_unless_disabled() {
    let theme = theme();
    let mut h = host(theme.path());
    let mut bem = Bem::init(&mut h, &KnownDevice::desktop(), BemOptions::new("index")).unwrap();

    let about = bem.get_bundle("about", false).unwrap();
    assert_eq!(about["text"], "Привет");

    let err = bem.get_bundle("about", true).unwrap_err();
    assert!(not_found(&err));
}

#[test]
fn locate_bundle_reports_desktop_switch() {
    let theme = theme();
    let mut h = host(theme.path());
    let opts = BemOptions::new("index").platform(Some(Platform::TouchPad));
    let mut bem = Bem::with_engines(
        &mut h,
        &KnownDevice::desktop(),
        opts,
        wpbem::Engines::new(wpbem::TemplateRenderer::from_source("x", "ok").unwrap()),
    )
    .unwrap();
    assert_eq!(bem.platform(), Platform::TouchPad);

    let found = bem
        .locate_bundle("index", "json", LocateOptions::default().rewrite_platform(true))
        .unwrap();
    assert!(found.switched_to_desktop());
    assert_eq!(found.path, theme.path().join("desktop.pages/index/index.json"));
    assert_eq!(bem.platform(), Platform::Desktop);
}
