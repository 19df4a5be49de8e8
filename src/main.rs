mod api;
mod app_error;
mod app_state;
mod args;
mod config;
mod domain;
mod ports;
mod routes;
mod services;

use crate::app_state::AppState;
use crate::args::Args;
use crate::routes::create_router::create_router;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::from_env();
    let state = AppState::build(&args).await;

    if args.connect_on_startup {
        let connectivity = Arc::clone(&state.connectivity);
        tokio::spawn(async move {
            if let Err(err) = connectivity.connect().await {
                tracing::error!(error = %err, "startup connect failed");
            }
        });
    }

    let app = create_router(Arc::clone(&state), args.allowed_origins());

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .expect("Failed to bind to address");

    tracing::info!(bind = %args.bind, "server started");

    axum::serve(listener, app).await.expect("Server failed");
}
