mod api;
mod config;
mod errors;
mod models;
mod openapi;
mod state;
mod tenants;
#[cfg(test)]
mod test_utils;

use crate::config::{ConfigError, Settings};
use crate::state::{AppState, StateError};
use axum::{routing::get, Json, Router};
use log::{error, info};
use std::net::SocketAddr;
use std::process::ExitCode;
use thiserror::Error;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize application state: {0}")]
    State(#[from] StateError),
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    match run().await {
        Ok(()) => {
            info!("Gateway stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let settings = Settings::new()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));

    let state = AppState::new(settings)?;
    info!(
        "Managing {} tenants through {}",
        state.tenants.len(),
        state.graph.endpoint()
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    info!("Admin gateway listening on {}", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

/// Router with the REST surface, `/openapi.json` and the Scalar UI
pub fn create_app(state: AppState) -> Router {
    let (docs_router, api_doc) =
        OpenApiRouter::with_openapi(openapi::ApiDoc::openapi()).split_for_parts();
    let spec_doc = api_doc.clone();

    Router::new()
        .merge(api::router(&state))
        .merge(docs_router)
        .route(
            "/openapi.json",
            get(move || {
                let doc = spec_doc.clone();
                async move { Json(doc) }
            }),
        )
        .merge(Scalar::with_url("/scalar", api_doc))
        .with_state(state)
}

/// Resolves on Ctrl+C, or SIGTERM on unix. A handler that cannot be
/// installed never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, draining connections"),
            Err(e) => {
                error!("Cannot listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM, draining connections");
            }
            Err(e) => {
                error!("Cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
