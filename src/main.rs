use std::{net::SocketAddr, sync::Arc};

use actiserve::{config::Config, routes::build_routes, state::FederationRuntime, store::AcidJsonStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).json().init();

    let config = Config::load_or_write_default("actiserve.yaml");
    let addr: SocketAddr = config.base_url().parse().expect("listen/port must form a valid socket address");

    let store = AcidJsonStore::new(config.activitypub_dir.clone());
    let state = Arc::new(FederationRuntime::new(config, Arc::new(store)));

    tokio::spawn(drain_loop(state.clone()));

    tracing::info!(%addr, "starting actiserve");
    let app = build_routes(state);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .expect("server exited unexpectedly");
}

/// Periodically drains the outbound delivery queue, independent of the
/// request-handling loop.
async fn drain_loop(state: Arc<FederationRuntime>) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(5));
    loop {
        ticker.tick().await;
        if let Err(e) = actiserve::delivery::run_once(&state).await {
            tracing::warn!(error = %e, "delivery drain pass failed");
        }
    }
}
