//! Page rendering CLI.
//!
//! Renders a page document against the in-memory demo library and logs how
//! each instance was rendered.
//!
//! # Usage
//!
//! ```bash
//! render-page [page.json] [server|client]
//! ```
//!
//! Without arguments the bundled home page is rendered on the client.

use example::{HOME_PAGE, PageDocument, render_page};
use thunderbolt_components_loader::RenderEnv;
use thunderbolt_core::{TracingConfig, TracingFormat};

#[tokio::main]
async fn main() {
    TracingConfig::new()
        .with_format(TracingFormat::Compact)
        .with_env_filter("info,thunderbolt_components_loader=debug")
        .init();

    let args: Vec<String> = std::env::args().collect();

    let source = match args.get(1) {
        Some(path) => std::fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("Error: cannot read {path}: {e}");
            std::process::exit(1);
        }),
        None => HOME_PAGE.to_string(),
    };

    let mut document: PageDocument = serde_json::from_str(&source).unwrap_or_else(|e| {
        eprintln!("Error: invalid page document: {e}");
        std::process::exit(1);
    });

    match args.get(2).map(String::as_str) {
        Some("server") => document.env = RenderEnv::Server,
        Some("client") => document.env = RenderEnv::Client,
        Some(other) => {
            eprintln!("Error: unknown environment '{other}', expected server or client");
            std::process::exit(1);
        }
        None => {}
    }

    let page = match render_page(&document).await {
        Ok(page) => page,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    for instance in &page.instances {
        tracing::info!(
            comp_id = %instance.comp_id,
            key = %instance.key,
            mode = ?instance.mode,
            markup = instance.markup.as_deref().unwrap_or("-"),
            "rendered"
        );
    }
    for (key, err) in &page.report.failed {
        tracing::warn!(%key, error = %err, "failed to load");
    }
    tracing::info!(
        widgets = ?page.widgets,
        under_fold = ?page.under_fold.comp_types_under_fold,
        hydrated = page.manifest.len(),
        "page rendered"
    );
}
