use anyhow::{Context as _, Result};
use clap::Parser;
use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::Path,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wpbem::{
    cli::{Args, ReportMode},
    list_bundles, report, Bem, BemJson, BemOptions, BundleLocator, RequestContext,
};

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the page.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wpbem=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut ctx = RequestContext::new()?;
    if let Some(p) = args.platform {
        ctx.platform = Some(p);
    }
    if let Some(ua) = &args.user_agent {
        ctx.user_agent = ua.clone();
    }
    if let Some(root) = &args.theme_root {
        ctx.theme_root = Some(root.clone());
    }
    if let Some(title) = &args.title {
        ctx.title = title.clone();
    }
    ctx.admin |= args.admin;
    if let Some(p) = &args.head_file {
        ctx.head = read_text(p)?;
    }
    if let Some(p) = &args.footer_file {
        ctx.footer = read_text(p)?;
    }

    let cfg = ctx.load_config(args.config.as_deref())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list {
        let locator = BundleLocator::with_layout(ctx.theme_root(&cfg)?, cfg.layout.clone());
        for entry in list_bundles(&locator)? {
            writeln!(out, "{}\t{}\t{}", entry.platform, entry.name, entry.dir.display())?;
        }
        return Ok(());
    }

    let mut host = ctx.host(&cfg)?;
    let device = ctx.classifier(&cfg)?;

    let mut opts = BemOptions::from_config(&cfg).platform(ctx.platform_override(&cfg));
    if let Some(bundle) = &args.bundle {
        opts.bundle = bundle.clone();
    }
    if args.static_bemjson {
        opts.include_bemjson = true;
    }

    let bem = Bem::init(&mut host, &device, opts)?;

    if args.make || cfg.make.enabled {
        bem.make(&mut host, &cfg.make)?;
    }

    if args.report != ReportMode::Off {
        eprint!("{}", report::build_report(&cfg, &ctx, &bem, args.report));
    }

    match (args.static_bemjson, args.json) {
        (true, false) => bem.html(&mut out, None)?,
        (true, true) => bem.json(&mut out, None)?,
        (false, json) => {
            let data = read_data(args.data.as_deref())?;
            if json {
                bem.render_json(&host, data, &mut out)?;
            } else {
                bem.render(&host, data, &mut out)?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_data(path: Option<&Path>) -> Result<BemJson> {
    let text = match path {
        None => return Ok(BemJson::Null),
        Some(p) if p == Path::new("-") => {
            let mut s = String::new();
            io::stdin()
                .read_to_string(&mut s)
                .context("failed to read page data from stdin")?;
            s
        }
        Some(p) => read_text(p)?,
    };
    serde_json::from_str(&text).context("page data is not valid JSON")
}
