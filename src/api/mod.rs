//! HTTP surface.
//!
//! Handlers stay thin: they pull identity and parameters out of the request,
//! read the wall clock once, and hand everything to [`crate::core`].

pub mod doses;
pub mod error;
pub mod identity;
pub mod records;
pub mod reference;

use crate::{config::server::ServerConfig, errors::Result};
use axum::{
    Json, Router,
    http::{HeaderName, Method, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use chrono::NaiveDateTime;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database handle
    pub db: DatabaseConnection,
}

impl AppState {
    /// Wraps a connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Local wall-clock time, read once per request.
pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(identity::USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health))
        .route(
            "/vaccines",
            get(reference::list_vaccines).post(reference::create_vaccine),
        )
        .route(
            "/vaccines/:id",
            get(reference::get_vaccine).delete(reference::delete_vaccine),
        )
        .route(
            "/branches",
            get(reference::list_branches).post(reference::create_branch),
        )
        .route(
            "/branches/:id",
            get(reference::get_branch).delete(reference::delete_branch),
        )
        .route("/branches/:id/status", get(reference::branch_status))
        .route("/branches/:id/hours", get(reference::branch_hours))
        .route("/branches/:id/slots", get(reference::branch_slots))
        .route("/users", post(records::create_user))
        .route(
            "/users/:id",
            get(records::get_user).delete(records::delete_user),
        )
        .route(
            "/appointments",
            get(records::list_appointments).post(records::create_appointment),
        )
        .route(
            "/appointments/:id",
            put(records::update_appointment).delete(records::delete_appointment),
        )
        .route("/doses", get(doses::list_doses).post(doses::create_dose))
        .route("/doses/recent", get(doses::recent_doses))
        .route("/doses/link", post(doses::link_dose))
        .route("/doses/link-candidates", get(doses::link_candidates))
        .route("/doses/:id", axum::routing::delete(doses::delete_dose))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl+C or SIGTERM.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(address = %config.bind_addr, "Server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
