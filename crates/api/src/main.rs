use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wes_core::registry::JobRegistry;

use wes_api::config::ServerConfig;
use wes_api::router::build_app_router;
use wes_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wes_api=debug,wes_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        runner = %config.runner.program,
        "Loaded server configuration",
    );

    // --- Job registry ---
    let state = AppState {
        registry: Arc::new(JobRegistry::new()),
        config: Arc::new(config.clone()),
    };

    // --- Router & server ---
    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("HOST/PORT must form a valid socket address");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(%addr, "Workflow execution service listening");

    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
