/*
 * Responsibility
 * - URL layout of the API
 * - Access tiers are not decided here; the gate classifies by path
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{auth, health::health};

/// Mounted at `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/validate", get(auth::validate))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
