use anyhow::{bail, Context as _, Result};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{
    config::{default_config_path, Config, Platform},
    device::UserAgentClassifier,
    host::StaticHost,
};

/// Per-request inputs: what the host would know about the incoming request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub vars: BTreeMap<String, String>,
    pub admin: bool,
    pub user_agent: String,
    pub platform: Option<Platform>,
    pub theme_root: Option<PathBuf>,
    pub title: String,
    pub head: String,
    pub footer: String,

    config_path: Option<PathBuf>,
}

impl RequestContext {
    pub fn new() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: BTreeMap<String, String>) -> Result<Self> {
        let admin = vars.get("WPBEM_ADMIN").is_some_and(|v| truthy(v));
        let user_agent = vars.get("HTTP_USER_AGENT").cloned().unwrap_or_default();

        let platform = match non_empty(&vars, "WPBEM_PLATFORM") {
            Some(p) => Some(
                p.parse::<Platform>()
                    .context("WPBEM_PLATFORM is set to an unknown platform")?,
            ),
            None => None,
        };

        let theme_root = non_empty(&vars, "WPBEM_THEME_ROOT").map(PathBuf::from);
        let title = vars.get("WPBEM_TITLE").cloned().unwrap_or_default();

        Ok(Self {
            vars,
            admin,
            user_agent,
            platform,
            theme_root,
            title,
            head: String::new(),
            footer: String::new(),
            config_path: None,
        })
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Config path precedence:
    /// 1) CLI --config (must exist)
    /// 2) WPBEM_CONFIG (must exist)
    /// 3) default XDG_CONFIG_HOME/wpbem/config.toml (optional)
    pub fn locate_config(&mut self, cli_config: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(p) = cli_config {
            if !p.exists() {
                bail!("--config was provided but file does not exist: {}", p.display());
            }
            self.config_path = Some(p.to_path_buf());
            return Ok(self.config_path.clone());
        }

        if let Some(p) = non_empty(&self.vars, "WPBEM_CONFIG").map(PathBuf::from) {
            if !p.exists() {
                bail!("WPBEM_CONFIG is set but file does not exist: {}", p.display());
            }
            self.config_path = Some(p);
            return Ok(self.config_path.clone());
        }

        let p = default_config_path();
        if p.exists() {
            self.config_path = Some(p);
        }
        Ok(self.config_path.clone())
    }

    pub fn load_config(&mut self, cli_config: Option<&Path>) -> Result<Config> {
        match self.locate_config(cli_config)? {
            Some(p) => Config::load_from_path(&p),
            None => Ok(Config::default()),
        }
    }

    /// Explicit platform from the request, else from the config.
    pub fn platform_override(&self, cfg: &Config) -> Option<Platform> {
        self.platform.or(cfg.wpbem.platform)
    }

    pub fn theme_root(&self, cfg: &Config) -> Result<PathBuf> {
        if let Some(p) = self.theme_root.as_ref().or(cfg.theme.root.as_ref()) {
            return Ok(p.clone());
        }
        std::env::current_dir().context("could not determine theme root")
    }

    pub fn classifier(&self, cfg: &Config) -> Result<UserAgentClassifier> {
        UserAgentClassifier::with_config(self.user_agent.clone(), &cfg.device)
    }

    pub fn host(&self, cfg: &Config) -> Result<StaticHost> {
        let mut host = StaticHost::new(self.theme_root(cfg)?, cfg.theme.url.clone());
        host.admin = self.admin;
        host.theme_version = cfg.theme.version.clone();
        host.title = self.title.clone();
        host.head_html = self.head.clone();
        host.footer_html = self.footer.clone();
        Ok(host)
    }

    pub fn debug_dump(&self) -> String {
        let mut out = String::new();

        out.push_str("wpbem request context (debug)\n");
        out.push_str("=============================\n");
        out.push_str(&format!("admin: {}\n", self.admin));
        out.push_str(&format!(
            "platform: {}\n",
            self.platform
                .map(|p| p.to_string())
                .unwrap_or_else(|| "<detect>".to_string())
        ));
        out.push_str(&format!("user_agent: {}\n", self.user_agent));
        out.push_str(&format!(
            "theme_root: {}\n",
            self.theme_root
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| "<unset>".to_string())
        ));
        out.push_str(&format!(
            "config_path: {}\n",
            self.config_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| "<defaults>".to_string())
        ));
        out.push_str(&format!("title: {}\n", self.title));
        out
    }
}

fn non_empty<'a>(vars: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}
