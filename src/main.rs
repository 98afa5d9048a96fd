use quizcraft_backend::{
    config::{get_config, init_config},
    routes,
    services::response_cache::run_sweeper,
    AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::new();
    if app_state.ai_service.is_initialized() {
        info!("AI service initialized");
    } else {
        warn!("GEMINI_API_KEY is not set; generation endpoints will fail fast");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(run_sweeper(
        app_state.cache.clone(),
        Duration::from_secs(config.cache_sweep_interval_secs),
        shutdown_rx,
    ));

    let app = routes::api_router()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    Ok(())
}
