use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vindex::cli::Cli;
use vindex::config::IndexConfig;
use vindex::pipeline;
use vindex::render::JsonRenderer;
use vindex_core::HttpFetcher;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())),
        )
        .with_target(false)
        .init();

    let mut config = IndexConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply(&mut config.settings);

    if cli.clean {
        match tokio::fs::remove_dir_all(&config.settings.build_dir).await {
            Ok(()) => tracing::info!("removed {}", config.settings.build_dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to clean {}", config.settings.build_dir.display())
                });
            }
        }
    }

    let fetcher = Arc::new(HttpFetcher::new(config.settings.timeout)?);
    let renderer = JsonRenderer::new(config.settings.build_dir.clone());

    let report = pipeline::run(&config, fetcher, &renderer).await?;

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in &report.failures {
            eprintln!("error: {}", failure.error);
        }
        Ok(ExitCode::FAILURE)
    }
}
