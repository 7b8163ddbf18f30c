use anyhow::{Context as _, Result};
use std::{path::Path, process::Command};
use tracing::{info, warn};

use crate::{config::MakeConfig, config::Platform, resolve::Resolver};

/// Outcome of a bundle build: the last non-empty output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeStat {
    pub platform: Platform,
    pub bundle: String,
    pub status: String,
}

impl MakeStat {
    /// Script tag logging the build result to the browser console.
    pub fn inject_stat(&self) -> String {
        format!(
            "<script>console.log({});</script>",
            js_string(&format!("{}.{}: {}", self.platform, self.bundle, self.status))
        )
    }
}

/// Runs the configured build command for one bundle from the theme root.
pub fn make_bundle(
    cfg: &MakeConfig,
    theme_root: &Path,
    platform: Platform,
    bundle: &str,
) -> Result<MakeStat> {
    let r = cfg.vars.iter().fold(
        Resolver::new()
            .platform(platform)
            .bundle(bundle)
            .theme_root(theme_root),
        |r, (k, v)| r.var(k, v),
    );

    let command = r
        .resolve(&cfg.command)
        .with_context(|| format!("failed to resolve make.command: {}", cfg.command))?;
    let args = cfg
        .args
        .iter()
        .map(|a| r.resolve(a).with_context(|| format!("failed to resolve make arg: {a}")))
        .collect::<Result<Vec<_>>>()?;

    info!(%command, ?args, dir = %theme_root.display(), "building bundle");

    let out = Command::new(&command)
        .args(&args)
        .current_dir(theme_root)
        .output()
        .with_context(|| format!("failed to run bundle build command: {command}"))?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    if !out.status.success() {
        warn!(status = ?out.status, "bundle build failed");
    }

    let status = last_line(&stdout)
        .or_else(|| last_line(&stderr))
        .unwrap_or_default()
        .to_string();

    Ok(MakeStat {
        platform,
        bundle: bundle.to_string(),
        status,
    })
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Single-quoted JS string literal safe to place inside a `<script>` tag.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\x3c"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}
