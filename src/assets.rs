use tracing::debug;

use crate::{
    config::SuffixConfig,
    host::{Asset, Host},
};

/// Handles under which a bundle's script and style are registered.
pub fn script_handle(bundle: &str) -> String {
    format!("{bundle}-js")
}

pub fn style_handle(bundle: &str) -> String {
    format!("{bundle}-css")
}

/// Registers and enqueues `<bundle>/<bundle>.js` (footer) and
/// `<bundle>/<bundle>.css` below `bundles_url`, versioned with the theme.
pub fn register_bundle_static(
    host: &mut dyn Host,
    bundle: &str,
    bundles_url: &str,
    suffixes: &SuffixConfig,
) {
    let version = host.theme_version().map(str::to_string);
    let base = format!("{}/{bundle}/{bundle}", bundles_url.trim_end_matches('/'));

    let script = Asset {
        handle: script_handle(bundle),
        src: format!("{base}.{}", suffixes.script),
        version: version.clone(),
        in_footer: true,
    };
    let style = Asset {
        handle: style_handle(bundle),
        src: format!("{base}.{}", suffixes.style),
        version,
        in_footer: false,
    };

    debug!(bundle, script = %script.src, style = %style.src, "registering bundle assets");

    host.register_script(script);
    host.register_style(style);
    host.enqueue_script(&script_handle(bundle));
    host.enqueue_style(&style_handle(bundle));
}
