use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/config", get(handlers::get_config))
        .route("/api/motion", post(handlers::motion))
        .route("/api/motion/reset", post(handlers::reset))
        .route("/api/motion/:session/diagnostics", get(handlers::diagnostics))
        .with_state(state)
}
