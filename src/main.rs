// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{Router, routing::{get, post}};
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::analytics_service::AnalyticsService;
use crate::application::flow_store::FlowStore;
use crate::application::live_traffic_service::LiveTrafficService;
use crate::application::prediction_service::PredictionService;
use crate::infrastructure::artifact_store::FileArtifactStore;
use crate::infrastructure::config::{load_points_config, load_traffic_config};
use crate::infrastructure::reference_dataset::CsvReferenceRepository;
use crate::infrastructure::tomtom_repository::TomTomRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    analytics, health_check, list_locations, live_table, live_table_csv, predict,
    prediction_status, refresh_live,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let traffic_config = load_traffic_config()?;
    let points_config = load_points_config()?;
    tracing::info!("Monitoring {} geo-points", points_config.points.len());

    // Create repositories (infrastructure layer)
    let flow_repository = Arc::new(TomTomRepository::new(&traffic_config.tomtom)?);
    let artifact_store = Arc::new(FileArtifactStore::new(traffic_config.artifacts.clone()));
    let reference = Arc::new(CsvReferenceRepository::new(traffic_config.dataset.path.clone()));

    // Create services (application layer)
    let store = FlowStore::new();
    let live_service = LiveTrafficService::new(
        flow_repository,
        store.clone(),
        points_config.points,
        traffic_config.tomtom.max_concurrency,
    );
    let prediction_service = PredictionService::new(artifact_store);
    let analytics_service = AnalyticsService::new(store, reference);

    // Artifacts are loaded once; a failure leaves predictions disabled
    prediction_service.load_artifacts().await;

    let state = Arc::new(AppState {
        live_service,
        prediction_service,
        analytics_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/locations", get(list_locations))
        .route("/live", get(live_table))
        .route("/live.csv", get(live_table_csv))
        .route("/live/refresh", post(refresh_live))
        .route("/analytics", get(analytics))
        .route("/predict", post(predict))
        .route("/predict/status", get(prediction_status))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = traffic_config.server.bind.parse()?;
    tracing::info!("Starting vision-traffic service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down; releasing cached data and artifacts");
}
