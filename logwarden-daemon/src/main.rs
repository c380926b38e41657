use anyhow::Result;
use clap::Parser;

use logwarden_core::config::LogwardenConfig;
use logwarden_daemon::app::App;
use logwarden_daemon::cli::DaemonCli;
use logwarden_daemon::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = LogwardenConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;

    // CLI overrides win over config file and environment
    if let Some(level) = &cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format = format.clone();
    }
    if let Some(rules) = &cli.rules {
        config.analyzer.rules_path = rules.display().to_string();
    }

    init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "logwarden-daemon starting");

    let app = App::build(config).await?;

    if cli.validate {
        tracing::info!("configuration and rules are valid");
        return Ok(());
    }

    let shutdown = app.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    app.run().await?;
    tracing::info!("logwarden-daemon shut down");
    Ok(())
}
