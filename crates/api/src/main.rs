use anyhow::{Context, Result};
use api::config::AppConfig;
use api::{AppState, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("binding {}", config.server.bind))?;

    tracing::info!(
        bind = %config.server.bind,
        inference_url = %config.models.base_url,
        chunk_max_words = config.analysis.chunk_max_words,
        "Lexi-Synth listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
