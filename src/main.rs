use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use agrigenius_backend::{
    config::Config,
    routes,
    services::gemini::GeminiClient,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agrigenius_backend=info,tower_http=info")),
        )
        .init();

    if let Err(err) = run().await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    info!(?config, "configuration loaded");

    let client = GeminiClient::from_config(&config).context("failed to build Gemini client")?;
    let state: SharedState = Arc::new(
        AppState::new(Arc::new(client), config.session_ttl).with_admin_key(config.admin_key.clone()),
    );

    spawn_session_reaper(state.clone());

    let app = routes::create_router(&config.public_dir)
        .with_state(state)
        .layer(CorsLayer::very_permissive());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("🌱 AgriGenius running at http://{}", config.bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Drop idle chat sessions once per TTL/4 (at least every 5 seconds).
fn spawn_session_reaper(state: SharedState) {
    let period = (state.sessions.ttl() / 4).max(std::time::Duration::from_secs(5));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = state.sessions.purge_expired().await;
            if removed > 0 {
                info!(removed, "purged idle chat sessions");
            }
        }
    });
}
