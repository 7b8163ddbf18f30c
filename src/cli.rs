use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Platform;

#[derive(Parser, Debug)]
#[command(name = "wpbem", version, about)]
pub struct Args {
    /// Path to config.toml (overrides WPBEM_CONFIG and XDG default)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Theme directory holding the `*.pages` bundle directories
    #[arg(long)]
    pub theme_root: Option<PathBuf>,

    /// Bundle to render (defaults to wpbem.default_bundle)
    #[arg(long, short)]
    pub bundle: Option<String>,

    /// Force a platform instead of detecting one
    #[arg(long, value_parser = parse_platform)]
    pub platform: Option<Platform>,

    /// User agent used for device detection (default: HTTP_USER_AGENT)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Treat the request as an admin request
    #[arg(long, default_value_t = false)]
    pub admin: bool,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,

    /// File whose content is printed in the page head
    #[arg(long)]
    pub head_file: Option<PathBuf>,

    /// File whose content is printed before the end of the page body
    #[arg(long)]
    pub footer_file: Option<PathBuf>,

    /// JSON file with page data ("-" for stdin)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Load the bundle's static BEMJSON and render it instead of a page
    #[arg(long, default_value_t = false)]
    pub static_bemjson: bool,

    /// Print the final tree as JSON instead of HTML
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// List bundles found in the theme and exit
    #[arg(long, default_value_t = false)]
    pub list: bool,

    /// Run the bundle build command before rendering
    #[arg(long, default_value_t = false)]
    pub make: bool,

    /// Print a report to stderr
    #[arg(long, value_enum, default_value_t = ReportMode::Off)]
    pub report: ReportMode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportMode {
    Off,
    Summary,
    Full,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}
