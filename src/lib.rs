pub mod cli;
pub mod clients;
pub mod clock;
pub mod config;
pub mod constants;
pub mod keys;
pub mod models;
pub mod scan;
pub mod services;
pub mod session;
pub mod store;
pub mod validation;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
pub use config::Config;
use config::LogFormat;
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from_path(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };
    config.validate()?;

    init_tracing(&config)?;

    cli::dispatch(cli, config).await
}

/// Logs go to stderr so stdout stays clean for payloads.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = match config.general.log_format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    initialized.context("Failed to initialize logging")
}
