use anyhow::{bail, Result};
use std::{collections::BTreeMap, path::Path};

use crate::config::Platform;

/// Expands `{token}` placeholders in layout templates such as
/// `"{platform}.pages"` or `"{bundle}.{suffix}"`.
#[derive(Debug, Clone, Default)]
pub struct Resolver<'a> {
    pub platform: Option<Platform>,
    pub bundle: Option<&'a str>,
    pub suffix: Option<&'a str>,
    pub theme_root: Option<&'a Path>,
    pub vars: BTreeMap<&'a str, &'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn bundle(mut self, bundle: &'a str) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn suffix(mut self, suffix: &'a str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn theme_root(mut self, root: &'a Path) -> Self {
        self.theme_root = Some(root);
        self
    }

    pub fn var(mut self, key: &'a str, value: &'a str) -> Self {
        self.vars.insert(key, value);
        self
    }

    pub fn resolve(&self, input: &str) -> Result<String> {
        // Fast path
        if !input.contains('{') {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                bail!("unclosed token in string: {input}");
            };

            let token = &after[..close];
            let repl = self
                .token_value(token)
                .ok_or_else(|| anyhow::anyhow!("unknown token: {{{token}}} in: {input}"))?;

            out.push_str(&repl);
            rest = &after[close + 1..];
        }
        out.push_str(rest);

        Ok(out)
    }

    fn token_value(&self, token: &str) -> Option<String> {
        match token {
            "platform" => self.platform.map(|p| p.to_string()),
            "bundle" => self.bundle.map(str::to_string),
            "suffix" => self.suffix.map(str::to_string),
            "theme_root" => self.theme_root.map(|p| p.to_string_lossy().to_string()),
            other => self.vars.get(other).map(|v| v.to_string()),
        }
    }
}
