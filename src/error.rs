use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by bundle lookup and the render pipeline.
#[derive(Debug, Error)]
pub enum BemError {
    /// None of the candidate paths for a bundle file exist.
    #[error("Bundle '{bundle}' not found (looked for *.{suffix} in {} location(s))", searched.len())]
    BundleNotFound {
        bundle: String,
        suffix: String,
        searched: Vec<PathBuf>,
    },

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("Invalid BEMJSON in {}: {source}", path.display())]
    InvalidBemJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A tree builder or renderer template failed to compile or render.
    #[error("Template error in {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },
}

impl BemError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BemError::BundleNotFound { .. })
    }
}
