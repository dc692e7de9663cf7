//! Mirror a chart repository example
//!
//! This example demonstrates:
//! - Building a configuration from a repository URL and local folder
//! - Optional basic auth and content rewriting
//! - Drawing progress on the console
//!
//! Usage:
//!
//! ```text
//! cargo run --example mirror_repository -- <repository-url> [local-folder] [old new]
//! ```
//!
//! `CHART_MIRROR_USERNAME` / `CHART_MIRROR_PASSWORD` are used for basic auth
//! when both are set.

use chart_mirror::{ChartMirror, Config, ConsoleReporter, RewriteConfig};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: mirror_repository <repository-url> [local-folder] [old new]");
        std::process::exit(2);
    };
    let local_dir = args.next().unwrap_or_else(|| "./charts".to_string());

    let mut config = Config::new(url, local_dir);
    config.repository.username = std::env::var("CHART_MIRROR_USERNAME").ok();
    config.repository.password = std::env::var("CHART_MIRROR_PASSWORD").ok();
    if let (Some(old), Some(new)) = (args.next(), args.next()) {
        config.rewrite = RewriteConfig::new(old, new);
    }

    let mirror = ChartMirror::new(config)?.with_reporter(Arc::new(ConsoleReporter));
    let report = mirror.run().await?;

    println!(
        "\n✓ {} downloaded ({} bytes), {} already present, {} rewritten",
        report.download.downloaded.len(),
        report.download.total_bytes(),
        report.download.skipped.len(),
        report.rewritten.len()
    );

    Ok(())
}
