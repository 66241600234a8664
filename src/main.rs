use anyhow::{Context, Result};
use symptom_checker::{api, config::Config, llm::CompletionClient, store::LogStore};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    info!(
        "Starting symptom checker API (binding: {}, model: {})",
        config.provider.binding.as_str(),
        config.provider.model
    );

    let store = LogStore::new(&config.database_path)
        .await
        .context("Failed to open history database")?;
    let completion = CompletionClient::from_config(&config)?;

    api::serve(&config, api::AppState::new(completion, store)).await?;

    info!("Shutdown complete");
    Ok(())
}
