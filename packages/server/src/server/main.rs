// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use company_intel::{IntelService, IntelStore, MemoryStore, OpenAI, PostgresStore, RateLimitedAI, AI};
use openai_client::OpenAIClient;
use secrecy::ExposeSecret;
use server_core::{
    server::{build_app, AppState},
    Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,company_intel=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Company Intel API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(model = %config.openai_model, "Configuration loaded");

    let ai = build_ai(&config)?;
    let store = build_store(&config).await?;

    let service = IntelService::new(ai, store, config.intel.clone())
        .context("Failed to build intel service")?;
    let app = build_app(AppState::new(service));

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

fn build_ai(config: &Config) -> Result<Arc<dyn AI>> {
    // The HTTP deadline sits just past the pipeline's own per-call timeout
    let http_timeout = config.intel.completion_timeout() + Duration::from_secs(5);

    let mut client = OpenAIClient::new(config.openai_api_key.expose_secret())
        .with_timeout(http_timeout)
        .context("Failed to build OpenAI client")?;
    if let Some(base_url) = &config.openai_base_url {
        client = client.with_base_url(base_url);
    }

    let openai = OpenAI::from_client(client)
        .with_model(&config.openai_model)
        .with_embedding_model(&config.openai_embedding_model);

    let ai: Arc<dyn AI> = match config.openai_requests_per_second {
        Some(rps) => {
            tracing::info!(requests_per_second = rps.get(), "Rate limiting OpenAI calls");
            Arc::new(RateLimitedAI::new(openai, rps))
        }
        None => Arc::new(openai),
    };
    Ok(ai)
}

async fn build_store(config: &Config) -> Result<Arc<dyn IntelStore>> {
    let store: Arc<dyn IntelStore> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let store = PostgresStore::new(url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!(pgvector = store.has_pgvector(), "Database connected");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, ingested data lives in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
