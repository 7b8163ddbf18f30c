//! MiniJinja-backed engines.
//!
//! A bundle directory may carry two templates next to its assets:
//! `<bundle>.btree.j2` renders the incoming tree into BEMJSON text (the tree
//! builder) and `<bundle>.bh.j2` renders the final tree into HTML (the
//! renderer). Both see the tree as `tree`.

use anyhow::{Context as _, Result};
use minijinja::{AutoEscape, Environment, Value};
use serde_json::json;
use std::{fs, path::Path};

use crate::{
    engine::{bem_class, BemJson, Renderer, TreeBuilder},
    error::BemError,
};

const TEMPLATE_NAME: &str = "bundle";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Html,
    Json,
}

#[derive(Debug, Clone)]
struct BundleTemplate {
    name: String,
    source: String,
    output: Output,
}

impl BundleTemplate {
    fn new(name: String, source: String, output: Output) -> Result<Self> {
        let tpl = Self {
            name,
            source,
            output,
        };
        // Fail on syntax errors now rather than at render time.
        tpl.environment()?;
        Ok(tpl)
    }

    fn read(path: &Path, output: Output) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read template file: {}", path.display()))?;
        Self::new(path.display().to_string(), source, output)
    }

    fn environment(&self) -> Result<Environment<'_>> {
        let mut env = Environment::new();
        let output = self.output;
        env.set_auto_escape_callback(move |_| match output {
            Output::Html => AutoEscape::Html,
            Output::Json => AutoEscape::None,
        });

        // Any value as a JSON literal, non-ASCII left as is.
        env.add_filter("tojson", |v: Value| -> Result<Value, minijinja::Error> {
            serde_json::to_string(&v)
                .map(|json| Value::from_safe_string(escape_json_for_html(&json)))
                .map_err(|e| minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string()))
        });

        env.add_filter(
            "bem_class",
            |node: Value, parent: Option<String>| -> Result<String, minijinja::Error> {
                let node = serde_json::to_value(&node).map_err(|e| {
                    minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
                })?;
                Ok(bem_class(&node, parent.as_deref()).unwrap_or_default())
            },
        );

        env.add_template(TEMPLATE_NAME, &self.source)
            .map_err(|source| self.error(source))?;
        Ok(env)
    }

    fn render(&self, tree: &BemJson) -> Result<String> {
        let env = self.environment()?;
        let tpl = env
            .get_template(TEMPLATE_NAME)
            .map_err(|source| self.error(source))?;
        let ctx = Value::from_serialize(json!({ "tree": tree }));
        tpl.render(ctx).map_err(|source| self.error(source))
    }

    fn error(&self, source: minijinja::Error) -> anyhow::Error {
        BemError::Template {
            name: self.name.clone(),
            source,
        }
        .into()
    }
}

/// `<`, `>`, `&` and `'` only occur inside JSON strings, where the `\uXXXX`
/// forms are equivalent. Escaping them keeps the literal inert inside
/// `<script>` tags and single-quoted attributes.
fn escape_json_for_html(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\'' => out.push_str("\\u0027"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML renderer driven by a `*.bh.j2` template. Output is HTML-escaped
/// unless a value is marked `|safe`.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: BundleTemplate,
}

impl TemplateRenderer {
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        Ok(Self {
            template: BundleTemplate::new(name.into(), source.into(), Output::Html)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            template: BundleTemplate::read(path, Output::Html)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }
}

impl Renderer for TemplateRenderer {
    fn apply(&self, tree: &BemJson) -> Result<String> {
        self.template.render(tree)
    }
}

/// Tree builder driven by a `*.btree.j2` template whose output is parsed
/// back as JSON.
#[derive(Debug, Clone)]
pub struct TemplateTreeBuilder {
    template: BundleTemplate,
}

impl TemplateTreeBuilder {
    pub fn from_source(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        Ok(Self {
            template: BundleTemplate::new(name.into(), source.into(), Output::Json)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            template: BundleTemplate::read(path, Output::Json)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }
}

impl TreeBuilder for TemplateTreeBuilder {
    fn transform(&self, tree: BemJson) -> Result<BemJson> {
        let text = self.template.render(&tree)?;
        serde_json::from_str(&text).with_context(|| {
            format!("tree builder {} produced invalid BEMJSON", self.template.name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn renderer_escapes_by_default() {
        let r = TemplateRenderer::from_source(
            "page.bh.j2",
            "<title>{{ tree.title }}</title>{{ tree.head|safe }}",
        )
        .unwrap();
        let html = r
            .apply(&json!({"title": "Fish & Chips", "head": "<meta name=\"x\">"}))
            .unwrap();
        assert_eq!(html, "<title>Fish &amp; Chips</title><meta name=\"x\">");
    }

    #[test]
    fn renderer_bem_class_filter() {
        let r = TemplateRenderer::from_source(
            "page.bh.j2",
            r#"<div class="{{ tree|bem_class }}">{% for c in tree.content %}<span class="{{ c|bem_class(tree.block) }}"></span>{% endfor %}</div>"#,
        )
        .unwrap();
        let html = r
            .apply(&json!({
                "block": "card",
                "mods": {"size": "m"},
                "content": [{"elem": "title"}]
            }))
            .unwrap();
        assert_eq!(
            html,
            r#"<div class="card card_size_m"><span class="card__title"></span></div>"#
        );
    }

    #[test]
    fn tree_builder_round_trips_through_json() {
        let b = TemplateTreeBuilder::from_source(
            "page.btree.j2",
            r#"{"block": "page", "title": {{ tree.title|tojson }}, "content": {{ tree.data|tojson }}}"#,
        )
        .unwrap();
        let out = b
            .transform(json!({"block": "root", "title": "Привет \"мир\"", "data": [1, 2]}))
            .unwrap();
        assert_eq!(
            out,
            json!({"block": "page", "title": "Привет \"мир\"", "content": [1, 2]})
        );
    }

    #[test]
    fn tojson_cannot_close_a_script_tag() {
        let r = TemplateRenderer::from_source(
            "page.bh.j2",
            "<script>var d = {{ tree.x|tojson }};</script>",
        )
        .unwrap();
        let html = r
            .apply(&json!({"x": "</script><script>alert('&')</script>"}))
            .unwrap();
        assert_eq!(
            html,
            r#"<script>var d = "\u003c/script\u003e\u003cscript\u003ealert(\u0027\u0026\u0027)\u003c/script\u003e";</script>"#
        );
    }

    #[test]
    fn tree_builder_decodes_escaped_markup() {
        let b = TemplateTreeBuilder::from_source(
            "page.btree.j2",
            r#"{"block": "page", "head": {{ tree.head|tojson }}}"#,
        )
        .unwrap();
        let out = b
            .transform(json!({"head": "<link rel='x' href=\"/a?b&c\">"}))
            .unwrap();
        assert_eq!(out["head"], "<link rel='x' href=\"/a?b&c\">");
    }

    #[test]
    fn tree_builder_rejects_non_json_output() {
        let b = TemplateTreeBuilder::from_source("bad.btree.j2", "not json").unwrap();
        let err = b.transform(json!({})).unwrap_err();
        assert!(err.to_string().contains("produced invalid BEMJSON"));
    }

    #[test]
    fn syntax_errors_surface_at_load() {
        let err = TemplateRenderer::from_source("broken.bh.j2", "{% if %}").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BemError>(),
            Some(BemError::Template { name, .. }) if name == "broken.bh.j2"
        ));
    }
}
