//! # IdCard
//!
//! Command-line entry point.

use clap::Parser;
use idcard_cli::{run, CardConfig, CliArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,idcard_renderer=debug,idcard_core=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = CardConfig::from(args);
    tracing::info!(
        "Rendering {:?} card at {}x",
        config.format,
        config.engine.device_pixel_ratio
    );

    let summary = run(&config)?;
    if let Some(reason) = &summary.fallback_reason {
        tracing::warn!("Document export fell back to an image: {reason}");
    }
    println!("{}", summary.path.display());
    Ok(())
}
