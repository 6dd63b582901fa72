use anyhow::Context;
use clap::Parser;

use taskboard_api::app::services::open_store;
use taskboard_api::cli::{Cli, Command, run_maintenance};
use taskboard_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ApiConfig::load().context("invalid configuration")?;
    taskboard_observability::init_with(config.log_format);

    let command = cli.command();
    if command != Command::Serve {
        if config.database_url.is_none() {
            tracing::warn!("TASKBOARD_DATABASE_URL not set; changes apply to a throwaway in-memory store");
        }
        let store = open_store(&config).await?;
        return run_maintenance(command, &store).await;
    }

    if config.uses_dev_secret() {
        tracing::warn!("TASKBOARD_JWT_SECRET not set; using insecure dev default");
    }

    let app = taskboard_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
