mod config;
mod page;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::GatewayConfig::from_env().expect("invalid gateway configuration");
    let broker = services::broker::UpstreamBroker::new(&config.upstream).expect("upstream client init failed");
    tracing::info!(
        upstream = %config.upstream.base_url,
        assets = %config.asset_dir.display(),
        "session broker initialized"
    );

    let addr = config.bind_addr();
    let state = state::AppState::new(Arc::new(broker), config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind");

    tracing::info!(%addr, "preview gateway listening");
    axum::serve(listener, app).await.expect("server failed");
}
