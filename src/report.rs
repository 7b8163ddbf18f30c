use crate::{bem::Bem, cli::ReportMode, config::Config, context::RequestContext};

pub fn build_report(cfg: &Config, ctx: &RequestContext, bem: &Bem, mode: ReportMode) -> String {
    match mode {
        ReportMode::Off => String::new(),
        ReportMode::Summary => summary(ctx, bem),
        ReportMode::Full => format!("{}\n{cfg:#?}\n{bem:#?}\n", summary(ctx, bem)),
    }
}

fn summary(ctx: &RequestContext, bem: &Bem) -> String {
    let r = bem.resolver();
    let mut out = ctx.debug_dump();

    out.push_str("\nbundle\n");
    out.push_str(&format!("  name: {}\n", bem.bundle()));
    out.push_str(&format!("  platform: {}\n", bem.platform()));
    out.push_str(&format!("  path: {}\n", r.bundles_path().display()));
    out.push_str(&format!("  url: {}\n", r.bundles_url()));
    out.push_str(&format!(
        "  tree_builder: {}\n",
        if bem.engines().tree_builder.is_some() { "yes" } else { "no" }
    ));
    out.push_str(&format!(
        "  static bemjson: {}\n",
        if bem.bemjson().is_null() { "no" } else { "yes" }
    ));

    out
}
