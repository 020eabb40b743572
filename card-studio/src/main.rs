//! # Project Card Studio
//!
//! Command-line entry point.

use card_studio::{CliArgs, CommandRunner, StudioConfig};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing, logging to stderr so command output stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,card_core=debug,card_renderer=debug,card_synth=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

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

#[tokio::main]
async fn main() {
    init_tracing();

    let args = CliArgs::parse();
    let command = args.command.clone();
    let config = StudioConfig::from(args);

    tracing::debug!("Data directory: {}", config.data_dir.display());

    if let Err(e) = run(config, command).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: StudioConfig, command: card_studio::Command) -> anyhow::Result<()> {
    let mut runner = CommandRunner::open(config)?;
    let output = runner.run(command).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
