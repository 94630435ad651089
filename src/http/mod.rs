//! JSON-over-HTTP surface: public submission and tracking, token-gated admin
//! routes, health check.

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use middleware::require_admin;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal::{self, ctrl_c};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::TokenAuthority;
use crate::config::Config;
use crate::error::{CrmError, Result};
use crate::service::CrmService;
use crate::storage::SqliteStore;

/// Request bodies above this size are rejected.
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: CrmService,
    pub tokens: Arc<TokenAuthority>,
}

impl AppState {
    pub fn new(service: CrmService, tokens: TokenAuthority) -> Self {
        Self {
            service,
            tokens: Arc::new(tokens),
        }
    }
}

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let admin = Router::new()
        .route("/api/inquiries/admin", get(handlers::list_inquiries))
        .route(
            "/api/inquiries/admin/{id}",
            get(handlers::get_inquiry).put(handlers::update_status),
        )
        .route(
            "/api/inquiries/admin/{id}/followups",
            post(handlers::add_follow_up),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/inquiries", post(handlers::submit_inquiry))
        .route(
            "/api/inquiries/track/{reference_code}",
            get(handlers::track_inquiry),
        )
        .merge(admin)
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin when `origin` is unset, otherwise exactly that one.
pub fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let allow_origin = match origin {
        None => AllowOrigin::any(),
        Some(origin) => {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| CrmError::Config(format!("Invalid CORS origin '{}': {}", origin, e)))?;
            AllowOrigin::exact(value)
        }
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60)))
}

/// Open the store, bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: Config) -> Result<()> {
    let tokens = TokenAuthority::new(config.require_jwt_secret()?, config.token_ttl());
    let cors = cors_layer(config.cors_origin.as_deref())?;

    info!(database = %config.database.display(), "Opening store...");
    let store = SqliteStore::open(&config.database)?;
    let state = AppState::new(CrmService::new(store), tokens);
    let app = build_router(state, cors);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
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
