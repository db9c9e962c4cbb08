pub mod error;
pub mod frame;
pub mod join;
pub mod state;

use axum::{
    Router,
    routing::{any, get},
};
use tower_http::catch_panic::CatchPanicLayer;

pub use state::{AppState, AppStateInner};

/// All HTTP routes of the service.
///
/// Both whitelist paths are served by the same join handler. The join routes
/// accept any method so the handler can answer non-POST requests with its own
/// JSON 405 body.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/join-whitelist", any(join::join_whitelist))
        .route("/api/whitelist", any(join::join_whitelist))
        .route("/api/frame", get(frame::frame))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .with_state(state)
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
