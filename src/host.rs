//! Services the page host provides to the bridge.
//!
//! The host owns the theme directory, knows whether the request is an admin
//! one, and produces the head/footer markup that surrounds the rendered tree.
//! Static assets registered by a bundle end up in that markup.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub handle: String,
    pub src: String,
    pub version: Option<String>,
    /// Scripts only: print in the footer instead of the head.
    pub in_footer: bool,
}

impl Asset {
    pub fn href(&self) -> String {
        match &self.version {
            Some(v) => format!("{}?ver={}", self.src, v),
            None => self.src.clone(),
        }
    }
}

pub trait Host {
    fn theme_root(&self) -> &Path;
    fn template_url(&self) -> &str;
    fn is_admin(&self) -> bool;
    fn theme_version(&self) -> Option<&str>;

    fn title(&self) -> String;
    /// Markup the host prints inside `<head>`.
    fn head(&self) -> String;
    /// Markup the host prints before `</body>`.
    fn footer(&self) -> String;

    fn register_script(&mut self, asset: Asset);
    fn register_style(&mut self, asset: Asset);
    fn enqueue_script(&mut self, handle: &str);
    fn enqueue_style(&mut self, handle: &str);

    /// Extra markup appended to the head output.
    fn add_head_snippet(&mut self, html: String);
}

/// In-process host: everything is supplied up front, assets are kept in
/// memory and printed as `<link>`/`<script>` tags.
#[derive(Debug, Clone, Default)]
pub struct StaticHost {
    pub theme_root: PathBuf,
    pub template_url: String,
    pub admin: bool,
    pub theme_version: Option<String>,
    pub title: String,
    pub head_html: String,
    pub footer_html: String,

    scripts: Vec<Asset>,
    styles: Vec<Asset>,
    enqueued_scripts: Vec<String>,
    enqueued_styles: Vec<String>,
    head_snippets: Vec<String>,
}

impl StaticHost {
    pub fn new(theme_root: impl Into<PathBuf>, template_url: impl Into<String>) -> Self {
        Self {
            theme_root: theme_root.into(),
            template_url: template_url.into(),
            ..Self::default()
        }
    }

    pub fn scripts(&self) -> &[Asset] {
        &self.scripts
    }

    pub fn styles(&self) -> &[Asset] {
        &self.styles
    }

    pub fn enqueued_scripts(&self) -> impl Iterator<Item = &Asset> {
        enqueued(&self.scripts, &self.enqueued_scripts)
    }

    pub fn enqueued_styles(&self) -> impl Iterator<Item = &Asset> {
        enqueued(&self.styles, &self.enqueued_styles)
    }
}

fn enqueued<'a>(registered: &'a [Asset], handles: &'a [String]) -> impl Iterator<Item = &'a Asset> {
    handles
        .iter()
        .filter_map(move |h| registered.iter().find(|a| &a.handle == h))
}

fn upsert(list: &mut Vec<Asset>, asset: Asset) {
    match list.iter_mut().find(|a| a.handle == asset.handle) {
        Some(existing) => *existing = asset,
        None => list.push(asset),
    }
}

fn style_tag(a: &Asset) -> String {
    format!(
        "<link rel=\"stylesheet\" id=\"{}\" href=\"{}\" media=\"all\">\n",
        escape_attr(&a.handle),
        escape_attr(&a.href())
    )
}

fn script_tag(a: &Asset) -> String {
    format!(
        "<script id=\"{}\" src=\"{}\"></script>\n",
        escape_attr(&a.handle),
        escape_attr(&a.href())
    )
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

impl Host for StaticHost {
    fn theme_root(&self) -> &Path {
        &self.theme_root
    }

    fn template_url(&self) -> &str {
        &self.template_url
    }

    fn is_admin(&self) -> bool {
        self.admin
    }

    fn theme_version(&self) -> Option<&str> {
        self.theme_version.as_deref()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn head(&self) -> String {
        let mut out = String::new();
        for a in self.enqueued_styles() {
            out.push_str(&style_tag(a));
        }
        for a in self.enqueued_scripts().filter(|a| !a.in_footer) {
            out.push_str(&script_tag(a));
        }
        out.push_str(&self.head_html);
        for s in &self.head_snippets {
            out.push_str(s);
        }
        out
    }

    fn footer(&self) -> String {
        let mut out = String::new();
        for a in self.enqueued_scripts().filter(|a| a.in_footer) {
            out.push_str(&script_tag(a));
        }
        out.push_str(&self.footer_html);
        out
    }

    fn register_script(&mut self, asset: Asset) {
        upsert(&mut self.scripts, asset);
    }

    fn register_style(&mut self, asset: Asset) {
        upsert(&mut self.styles, asset);
    }

    fn enqueue_script(&mut self, handle: &str) {
        if !self.enqueued_scripts.iter().any(|h| h == handle) {
            self.enqueued_scripts.push(handle.to_string());
        }
    }

    fn enqueue_style(&mut self, handle: &str) {
        if !self.enqueued_styles.iter().any(|h| h == handle) {
            self.enqueued_styles.push(handle.to_string());
        }
    }

    fn add_head_snippet(&mut self, html: String) {
        self.head_snippets.push(html);
    }
}
