use anyhow::{Context as _, Result};
use regex::Regex;

use crate::config::DeviceConfig;

/// Tells tablets and phones apart from everything else.
pub trait DeviceClassifier {
    fn is_tablet(&self) -> bool;
    fn is_mobile(&self) -> bool;
}

/// Fixed answer, mostly for tests and for callers that already know the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KnownDevice {
    pub tablet: bool,
    pub mobile: bool,
}

impl KnownDevice {
    pub fn desktop() -> Self {
        Self::default()
    }

    pub fn tablet() -> Self {
        Self {
            tablet: true,
            mobile: true,
        }
    }

    pub fn phone() -> Self {
        Self {
            tablet: false,
            mobile: true,
        }
    }
}

impl DeviceClassifier for KnownDevice {
    fn is_tablet(&self) -> bool {
        self.tablet
    }

    fn is_mobile(&self) -> bool {
        self.mobile
    }
}

const TABLET_PATTERNS: &[&str] = &[
    r"(?i)ipad",
    r"(?i)tablet",
    r"(?i)kindle|silk/",
    r"(?i)playbook",
    r"(?i)nexus (7|9|10)",
    r"(?i)sm-t\d{3}",
];

const MOBILE_PATTERNS: &[&str] = &[
    r"(?i)iphone|ipod",
    r"(?i)android.*mobile",
    r"(?i)windows phone|iemobile",
    r"(?i)blackberry|bb10",
    r"(?i)opera mini|opera mobi",
    r"(?i)\bmobile\b",
];

/// User-agent sniffing classifier.
#[derive(Debug, Clone)]
pub struct UserAgentClassifier {
    user_agent: String,
    tablet: Vec<Regex>,
    mobile: Vec<Regex>,
    android: Regex,
    mobile_token: Regex,
}

impl UserAgentClassifier {
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        Self::with_config(user_agent, &DeviceConfig::default())
    }

    /// Patterns from `cfg` are tried before the built-in lists.
    pub fn with_config(user_agent: impl Into<String>, cfg: &DeviceConfig) -> Result<Self> {
        Ok(Self {
            user_agent: user_agent.into(),
            tablet: compile_all(&cfg.tablet_patterns, TABLET_PATTERNS)?,
            mobile: compile_all(&cfg.mobile_patterns, MOBILE_PATTERNS)?,
            android: Regex::new(r"(?i)\bandroid\b")?,
            mobile_token: Regex::new(r"(?i)\bmobile\b")?,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl DeviceClassifier for UserAgentClassifier {
    fn is_tablet(&self) -> bool {
        let ua = self.user_agent.as_str();
        // Android without a "Mobile" token is a tablet
        self.tablet.iter().any(|re| re.is_match(ua))
            || (self.android.is_match(ua) && !self.mobile_token.is_match(ua))
    }

    fn is_mobile(&self) -> bool {
        self.is_tablet() || self.mobile.iter().any(|re| re.is_match(&self.user_agent))
    }
}

fn compile_all(extra: &[String], builtin: &[&str]) -> Result<Vec<Regex>> {
    let mut out = Vec::with_capacity(extra.len() + builtin.len());
    for s in extra.iter().map(String::as_str).chain(builtin.iter().copied()) {
        let re = Regex::new(s).with_context(|| format!("invalid device pattern: {s}"))?;
        out.push(re);
    }
    Ok(out)
}
