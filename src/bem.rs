//! The render façade.
//!
//! One [`Bem`] is built per request. Construction runs the whole setup:
//! pick the platform, load the bundle's engines (which may move the platform
//! to desktop), register the bundle's assets with the host and optionally
//! load the bundle's static BEMJSON. After that the instance only renders.

use anyhow::{Context as _, Result};
use serde_json::{Map, Value};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::{
    assets::register_bundle_static,
    config::{Config, LayoutConfig, MakeConfig, Platform, SuffixConfig},
    device::DeviceClassifier,
    engine::{BemJson, Engines},
    error::BemError,
    host::Host,
    locate::{BundleLocator, LocateOptions, Located},
    make::{make_bundle, MakeStat},
    platform::select_platform,
    templates::{TemplateRenderer, TemplateTreeBuilder},
};

#[derive(Debug, Clone)]
pub struct BemOptions {
    pub bundle: String,
    /// Load `<bundle>.<suffixes.bemjson>` during init.
    pub include_bemjson: bool,
    /// Skip detection and use this platform.
    pub platform: Option<Platform>,
    pub scope: Option<String>,
    pub layout: LayoutConfig,
    pub suffixes: SuffixConfig,
}

impl BemOptions {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            include_bemjson: false,
            platform: None,
            scope: None,
            layout: LayoutConfig::default(),
            suffixes: SuffixConfig::default(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self {
            bundle: cfg.wpbem.default_bundle.clone(),
            include_bemjson: cfg.wpbem.include_bemjson,
            platform: cfg.wpbem.platform,
            scope: cfg.wpbem.scope.clone(),
            layout: cfg.layout.clone(),
            suffixes: cfg.suffixes.clone(),
        }
    }

    pub fn platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    pub fn include_bemjson(mut self, include: bool) -> Self {
        self.include_bemjson = include;
        self
    }

    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Bemjson,
}

/// Platform-aware bundle lookup.
///
/// The directory/URL prefixes are fixed to the platform the resolver was
/// created for. A desktop fallback changes the recorded platform only, so
/// later lookups still try the requested platform's directory first.
#[derive(Debug, Clone)]
pub struct BundleResolver {
    bundle: String,
    platform: Platform,
    pages_platform: Platform,
    locator: BundleLocator,
    template_url: String,
    bundles_path: PathBuf,
    bundles_url: String,
}

impl BundleResolver {
    pub fn new(
        locator: BundleLocator,
        template_url: impl Into<String>,
        bundle: impl Into<String>,
        platform: Platform,
    ) -> Result<Self> {
        let mut r = Self {
            bundle: bundle.into(),
            platform,
            pages_platform: platform,
            locator,
            template_url: template_url.into(),
            bundles_path: PathBuf::new(),
            bundles_url: String::new(),
        };
        r.init_platform()?;
        Ok(r)
    }

    fn init_platform(&mut self) -> Result<()> {
        let dir = self.locator.pages_dir_name(self.pages_platform)?;
        self.bundles_path = self.locator.theme_root().join(&dir);
        self.bundles_url = format!("{}/{dir}/", self.template_url.trim_end_matches('/'));
        Ok(())
    }

    /// Records `platform`; the directory prefixes are left alone.
    pub fn set_platform(&mut self, platform: Platform) {
        self.platform = platform;
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Platform whose directory is searched first and whose URL assets use.
    pub fn pages_platform(&self) -> Platform {
        self.pages_platform
    }

    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    pub fn bundles_path(&self) -> &Path {
        &self.bundles_path
    }

    pub fn bundles_url(&self) -> &str {
        &self.bundles_url
    }

    pub fn locator(&self) -> &BundleLocator {
        &self.locator
    }

    /// Looks up `<name>.<suffix>` starting from the requested platform's
    /// directory. With `opts.rewrite_platform`, a desktop fallback hit records
    /// desktop as the platform; the returned [`Located`] says whether the
    /// desktop directory was used.
    pub fn locate_bundle(&mut self, name: &str, suffix: &str, opts: LocateOptions) -> Result<Located> {
        let opts = if self.locator.layout().allow_root_fallback {
            opts
        } else {
            opts.root_fallback(false)
        };

        let found = self.locator.locate(self.pages_platform, name, suffix, opts)?;
        if found.switched_to_desktop() && opts.rewrite_platform && self.platform != Platform::Desktop {
            info!(from = %self.platform, bundle = name, "falling back to desktop platform");
            self.set_platform(Platform::Desktop);
        }
        Ok(found)
    }
}

pub struct Bem {
    resolver: BundleResolver,
    engines: Engines,
    scope: Option<String>,
    suffixes: SuffixConfig,
    bemjson: BemJson,
}

impl std::fmt::Debug for Bem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bem")
            .field("bundle", &self.resolver.bundle)
            .field("platform", &self.resolver.platform)
            .field("engines", &self.engines)
            .finish_non_exhaustive()
    }
}

impl Bem {
    /// Full setup, loading the engines from the bundle's template files.
    pub fn init(host: &mut dyn Host, device: &dyn DeviceClassifier, opts: BemOptions) -> Result<Self> {
        let mut resolver = Self::resolve_platform(&*host, device, &opts)?;
        let engines = load_engines(&mut resolver, &opts.suffixes)?;
        Self::finish(host, resolver, engines, opts)
    }

    /// Same setup with engines supplied by the caller.
    pub fn with_engines(
        host: &mut dyn Host,
        device: &dyn DeviceClassifier,
        opts: BemOptions,
        engines: Engines,
    ) -> Result<Self> {
        let resolver = Self::resolve_platform(&*host, device, &opts)?;
        Self::finish(host, resolver, engines, opts)
    }

    fn resolve_platform(
        host: &dyn Host,
        device: &dyn DeviceClassifier,
        opts: &BemOptions,
    ) -> Result<BundleResolver> {
        let platform = opts
            .platform
            .unwrap_or_else(|| select_platform(host.is_admin(), device));
        debug!(%platform, bundle = %opts.bundle, "platform selected");

        let locator = BundleLocator::with_layout(host.theme_root(), opts.layout.clone());
        BundleResolver::new(locator, host.template_url(), opts.bundle.clone(), platform)
    }

    fn finish(
        host: &mut dyn Host,
        resolver: BundleResolver,
        engines: Engines,
        opts: BemOptions,
    ) -> Result<Self> {
        register_bundle_static(host, resolver.bundle(), resolver.bundles_url(), &opts.suffixes);

        let mut bem = Self {
            resolver,
            engines,
            scope: opts.scope,
            suffixes: opts.suffixes,
            bemjson: Value::Null,
        };

        if opts.include_bemjson {
            let bundle = bem.resolver.bundle().to_string();
            bem.bemjson = match bem.get_bundle(&bundle, false) {
                Ok(tree) => tree,
                Err(e) if is_not_found(&e) => {
                    debug!(bundle = %bundle, "no static BEMJSON for bundle");
                    Value::Null
                }
                Err(e) => return Err(e),
            };
        }

        info!(
            bundle = %bem.resolver.bundle(),
            platform = %bem.resolver.platform(),
            "bundle ready"
        );
        Ok(bem)
    }

    pub fn platform(&self) -> Platform {
        self.resolver.platform()
    }

    pub fn bundle(&self) -> &str {
        self.resolver.bundle()
    }

    pub fn resolver(&self) -> &BundleResolver {
        &self.resolver
    }

    pub fn engines(&self) -> &Engines {
        &self.engines
    }

    /// The static BEMJSON loaded at init (null when none was loaded).
    pub fn bemjson(&self) -> &BemJson {
        &self.bemjson
    }

    pub fn locate_bundle(&mut self, name: &str, suffix: &str, opts: LocateOptions) -> Result<Located> {
        self.resolver.locate_bundle(name, suffix, opts)
    }

    /// Static BEMJSON of any bundle, with the usual fallbacks.
    pub fn get_bundle(&mut self, name: &str, no_root_fallback: bool) -> Result<BemJson> {
        let suffix = self.suffixes.bemjson.clone();
        let found = self.resolver.locate_bundle(
            name,
            &suffix,
            LocateOptions::default().root_fallback(!no_root_fallback),
        )?;
        read_bemjson(&found.path)
    }

    /// Runs the bundle build and exposes its status in the host's head.
    pub fn make(&self, host: &mut dyn Host, cfg: &MakeConfig) -> Result<MakeStat> {
        let stat = make_bundle(cfg, host.theme_root(), self.platform(), self.bundle())?;
        host.add_head_snippet(stat.inject_stat());
        Ok(stat)
    }

    /// The `root` block wrapping `data` with the host's page furniture.
    pub fn root_node(&self, host: &dyn Host, data: BemJson) -> BemJson {
        let mut root = Map::new();
        root.insert("block".to_string(), Value::from("root"));
        root.insert("view".to_string(), Value::from(self.bundle()));
        root.insert("head".to_string(), Value::from(host.head()));
        root.insert("footer".to_string(), Value::from(host.footer()));
        root.insert("title".to_string(), Value::from(host.title()));
        if let Some(scope) = &self.scope {
            root.insert("scope".to_string(), Value::from(scope.as_str()));
        }
        root.insert("data".to_string(), data);
        Value::Object(root)
    }

    pub fn build_tree(&self, tree: BemJson) -> Result<BemJson> {
        self.engines.build_tree(tree)
    }

    /// Root node passed through the tree builder.
    pub fn page_tree(&self, host: &dyn Host, data: BemJson) -> Result<BemJson> {
        self.build_tree(self.root_node(host, data))
    }

    /// `tree` as HTML or JSON. A missing or null tree means the loaded
    /// static BEMJSON.
    pub fn res(&self, tree: Option<&BemJson>, format: Format) -> Result<String> {
        let tree = match tree {
            Some(t) if !t.is_null() => t,
            _ => &self.bemjson,
        };
        match format {
            Format::Html => self.engines.renderer.apply(tree),
            Format::Bemjson => to_json(tree),
        }
    }

    pub fn get_html(&self, tree: Option<&BemJson>) -> Result<String> {
        self.res(tree, Format::Html)
    }

    pub fn html(&self, out: &mut dyn Write, tree: Option<&BemJson>) -> Result<()> {
        let html = self.res(tree, Format::Html)?;
        out.write_all(html.as_bytes()).context("failed to write HTML")
    }

    pub fn json(&self, out: &mut dyn Write, tree: Option<&BemJson>) -> Result<()> {
        let json = self.res(tree, Format::Bemjson)?;
        out.write_all(json.as_bytes()).context("failed to write JSON")
    }

    pub fn render_to_string(&self, host: &dyn Host, data: BemJson) -> Result<String> {
        let tree = self.page_tree(host, data)?;
        self.res(Some(&tree), Format::Html)
    }

    pub fn render(&self, host: &dyn Host, data: BemJson, out: &mut dyn Write) -> Result<()> {
        let tree = self.page_tree(host, data)?;
        self.html(out, Some(&tree))
    }

    /// Like [`Bem::render`] but prints the final tree as JSON.
    pub fn render_json(&self, host: &dyn Host, data: BemJson, out: &mut dyn Write) -> Result<()> {
        let tree = self.page_tree(host, data)?;
        self.json(out, Some(&tree))
    }
}

fn load_engines(resolver: &mut BundleResolver, suffixes: &SuffixConfig) -> Result<Engines> {
    let bundle = resolver.bundle().to_string();
    let opts = LocateOptions::default()
        .root_fallback(false)
        .rewrite_platform(true);

    let tree_builder = match resolver.locate_bundle(&bundle, &suffixes.tree_builder, opts) {
        Ok(found) => Some(TemplateTreeBuilder::from_file(&found.path)?),
        Err(e) if is_not_found(&e) => {
            debug!(bundle = %bundle, "bundle has no tree builder");
            None
        }
        Err(e) => return Err(e),
    };

    let found = resolver.locate_bundle(&bundle, &suffixes.renderer, opts)?;
    let renderer = TemplateRenderer::from_file(&found.path)?;

    let mut engines = Engines::new(renderer);
    if let Some(b) = tree_builder {
        engines = engines.with_tree_builder(b);
    }
    Ok(engines)
}

fn read_bemjson(path: &Path) -> Result<BemJson> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read BEMJSON file: {}", path.display()))?;
    serde_json::from_str(&text).map_err(|source| {
        BemError::InvalidBemJson {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}

/// Compact JSON; non-ASCII characters are written as is.
pub fn to_json(tree: &BemJson) -> Result<String> {
    serde_json::to_string(tree).context("failed to serialize BEMJSON")
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<BemError>().is_some_and(BemError::is_not_found)
}
