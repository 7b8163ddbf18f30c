//! Bundle lookup on disk.
//!
//! A bundle file is searched in three places, in order:
//!
//! 1. `<theme_root>/<platform>.pages/<bundle>/<bundle>.<suffix>`
//! 2. `<theme_root>/desktop.pages/<bundle>/<bundle>.<suffix>`
//! 3. `<theme_root>/<bundle>.<suffix>`
//!
//! The locator never changes the platform itself. A hit in the desktop
//! directory is reported through [`LocatedIn::Desktop`] and it is up to the
//! caller to switch (see `Bem::locate_bundle`).

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{config::LayoutConfig, config::Platform, error::BemError, resolve::Resolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatedIn {
    Platform,
    Desktop,
    Root,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub source: LocatedIn,
}

impl Located {
    /// True when the file was only found in the desktop directory while
    /// looking up a different platform.
    pub fn switched_to_desktop(&self) -> bool {
        self.source == LocatedIn::Desktop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    pub allow_desktop_fallback: bool,
    pub allow_root_fallback: bool,
    /// Ask the caller to adopt `desktop` when the desktop fallback is used.
    pub rewrite_platform: bool,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            allow_desktop_fallback: true,
            allow_root_fallback: true,
            rewrite_platform: false,
        }
    }
}

impl LocateOptions {
    pub fn root_fallback(mut self, allow: bool) -> Self {
        self.allow_root_fallback = allow;
        self
    }

    pub fn desktop_fallback(mut self, allow: bool) -> Self {
        self.allow_desktop_fallback = allow;
        self
    }

    pub fn rewrite_platform(mut self, rewrite: bool) -> Self {
        self.rewrite_platform = rewrite;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BundleLocator {
    theme_root: PathBuf,
    layout: LayoutConfig,
}

impl BundleLocator {
    pub fn new(theme_root: impl Into<PathBuf>) -> Self {
        Self::with_layout(theme_root, LayoutConfig::default())
    }

    pub fn with_layout(theme_root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            theme_root: theme_root.into(),
            layout,
        }
    }

    pub fn theme_root(&self) -> &Path {
        &self.theme_root
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Name of the per-platform directory, e.g. `touch-pad.pages`.
    pub fn pages_dir_name(&self, platform: Platform) -> Result<String> {
        Resolver::new()
            .platform(platform)
            .theme_root(&self.theme_root)
            .resolve(&self.layout.pages_dir)
            .with_context(|| format!("failed to resolve layout.pages_dir: {}", self.layout.pages_dir))
    }

    pub fn pages_dir(&self, platform: Platform) -> Result<PathBuf> {
        Ok(self.theme_root.join(self.pages_dir_name(platform)?))
    }

    /// Candidate paths in lookup order, filtered by `opts`.
    pub fn candidates(
        &self,
        platform: Platform,
        bundle: &str,
        suffix: &str,
        opts: LocateOptions,
    ) -> Result<Vec<(PathBuf, LocatedIn)>> {
        let file_name = format!("{bundle}.{suffix}");
        let mut out = vec![(
            self.pages_dir(platform)?.join(bundle).join(&file_name),
            LocatedIn::Platform,
        )];

        if opts.allow_desktop_fallback && platform != Platform::Desktop {
            out.push((
                self.pages_dir(Platform::Desktop)?.join(bundle).join(&file_name),
                LocatedIn::Desktop,
            ));
        }

        if opts.allow_root_fallback {
            let root_file = Resolver::new()
                .platform(platform)
                .bundle(bundle)
                .suffix(suffix)
                .theme_root(&self.theme_root)
                .resolve(&self.layout.root_file)
                .with_context(|| {
                    format!("failed to resolve layout.root_file: {}", self.layout.root_file)
                })?;
            out.push((self.theme_root.join(root_file), LocatedIn::Root));
        }

        Ok(out)
    }

    pub fn locate(
        &self,
        platform: Platform,
        bundle: &str,
        suffix: &str,
        opts: LocateOptions,
    ) -> Result<Located> {
        let candidates = self.candidates(platform, bundle, suffix, opts)?;

        for (path, source) in candidates.iter() {
            if path.is_file() {
                debug!(bundle, suffix, ?source, path = %path.display(), "bundle file located");
                return Ok(Located {
                    path: path.clone(),
                    source: *source,
                });
            }
        }

        debug!(bundle, suffix, %platform, "bundle file not found");
        Err(BemError::BundleNotFound {
            bundle: bundle.to_string(),
            suffix: suffix.to_string(),
            searched: candidates.into_iter().map(|(p, _)| p).collect(),
        }
        .into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub platform: Platform,
    pub name: String,
    pub dir: PathBuf,
}

/// Every bundle directory under every platform's pages directory.
pub fn list_bundles(locator: &BundleLocator) -> Result<Vec<BundleEntry>> {
    let mut out = Vec::new();

    for platform in Platform::ALL {
        let dir = locator.pages_dir(platform)?;
        let pattern = format!(
            "{}/*",
            glob::Pattern::escape(&dir.to_string_lossy())
        );

        let entries = glob::glob(&pattern)
            .with_context(|| format!("invalid bundle glob: {pattern}"))?;

        for entry in entries {
            let path = entry.with_context(|| format!("failed to read {}", dir.display()))?;
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            out.push(BundleEntry {
                platform,
                name,
                dir: path,
            });
        }
    }

    out.sort_by(|a, b| (a.platform.as_str(), &a.name).cmp(&(b.platform.as_str(), &b.name)));
    Ok(out)
}
