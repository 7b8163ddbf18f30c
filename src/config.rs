use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::error::BemError;

pub fn default_config_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg).join("wpbem").join("config.toml");
        }
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("wpbem").join("config.toml");
    }
    PathBuf::from("wpbem/config.toml")
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub wpbem: WpbemMeta,

    #[serde(default)]
    pub theme: ThemeConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub suffixes: SuffixConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub make: MakeConfig,
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpbemMeta {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default = "default_bundle")]
    pub default_bundle: String,

    /// Load `<bundle>.<suffixes.bemjson>` into the instance at init.
    #[serde(default)]
    pub include_bemjson: bool,

    /// Skip device detection and always use this platform.
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Added to the root node as `scope` when set.
    #[serde(default)]
    pub scope: Option<String>,
}

impl Default for WpbemMeta {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            default_bundle: default_bundle(),
            include_bemjson: false,
            platform: None,
            scope: None,
        }
    }
}

fn default_schema_version() -> u32 {
    1
}

fn default_bundle() -> String {
    "index".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    #[serde(default = "default_root_file")]
    pub root_file: String,

    #[serde(default = "default_true")]
    pub allow_root_fallback: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            root_file: default_root_file(),
            allow_root_fallback: true,
        }
    }
}

fn default_pages_dir() -> String {
    "{platform}.pages".to_string()
}

fn default_root_file() -> String {
    "{bundle}.{suffix}".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuffixConfig {
    #[serde(default = "default_bemjson_suffix")]
    pub bemjson: String,
    #[serde(default = "default_tree_builder_suffix")]
    pub tree_builder: String,
    #[serde(default = "default_renderer_suffix")]
    pub renderer: String,
    #[serde(default = "default_script_suffix")]
    pub script: String,
    #[serde(default = "default_style_suffix")]
    pub style: String,
}

impl Default for SuffixConfig {
    fn default() -> Self {
        Self {
            bemjson: default_bemjson_suffix(),
            tree_builder: default_tree_builder_suffix(),
            renderer: default_renderer_suffix(),
            script: default_script_suffix(),
            style: default_style_suffix(),
        }
    }
}

fn default_bemjson_suffix() -> String {
    "json".to_string()
}

fn default_tree_builder_suffix() -> String {
    "btree.j2".to_string()
}

fn default_renderer_suffix() -> String {
    "bh.j2".to_string()
}

fn default_script_suffix() -> String {
    "js".to_string()
}

fn default_style_suffix() -> String {
    "css".to_string()
}

/// Extra user-agent patterns, checked before the built-in ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub tablet_patterns: Vec<String>,

    #[serde(default)]
    pub mobile_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MakeConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_make_command")]
    pub command: String,

    #[serde(default = "default_make_args")]
    pub args: Vec<String>,

    /// Extra `{name}` tokens for `command` and `args`.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_make_command(),
            args: default_make_args(),
            vars: BTreeMap::new(),
        }
    }
}

fn default_make_command() -> String {
    "./node_modules/enb/bin/enb".to_string()
}

fn default_make_args() -> Vec<String> {
    vec!["make".to_string(), "{platform}.pages/{bundle}".to_string()]
}

/// Parsed the same way everywhere (config, env, CLI): trimmed,
/// case-insensitive kebab-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Platform {
    Admin,
    TouchPhone,
    TouchPad,
    Desktop,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Admin,
        Platform::TouchPhone,
        Platform::TouchPad,
        Platform::Desktop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Admin => "admin",
            Platform::TouchPhone => "touch-phone",
            Platform::TouchPad => "touch-pad",
            Platform::Desktop => "desktop",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|p| p.as_str() == wanted)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = BemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| BemError::UnknownPlatform(s.to_string()))
    }
}

impl TryFrom<String> for Platform {
    type Error = BemError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
