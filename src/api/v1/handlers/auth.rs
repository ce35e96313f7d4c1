/*
 * Responsibility
 * - POST /api/auth/login, /api/auth/refresh, /api/auth/logout
 * - GET  /api/auth/me, /api/auth/validate
 */
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use tracing::{info, warn};

use crate::api::v1::dto::auth::{
    LoginRequest, LoginResponse, MeResponse, RefreshRequest, TokenResponse, ValidateResponse,
};
use crate::api::v1::extractors::CurrentUser;
use crate::error::{ApiResponse, AppError};
use crate::services::auth::error::AuthFailure;
use crate::services::auth::identity;
use crate::services::auth::principal;
use crate::state::AppState;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| AppError::bad_request(e.body_text()))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let req = json_body(payload)?;
    req.validate().map_err(AppError::bad_request)?;

    let principal = state
        .credentials
        .verify(&req.username, &req.password)
        .await
        .inspect_err(|e| warn!(username = %req.username, reason = %e, "login failed"))?;

    let pair = state.auth.issue_token_pair(&principal)?;

    // Bookkeeping only; a failed stamp does not fail the login.
    if let Err(e) = state.principals.record_login(principal.user_id).await {
        warn!(user_id = principal.user_id, error = %e, "failed to record last login");
    }

    info!(user_id = principal.user_id, "login succeeded");
    Ok(Json(ApiResponse::with_message(
        "login succeeded",
        LoginResponse::new(pair, &principal),
    )))
}

pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TokenResponse>>, AppError> {
    let req = json_body(payload)?;
    if req.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refreshToken is required"));
    }

    let pair = state.auth.refresh(req.refresh_token.trim())?;
    Ok(Json(ApiResponse::with_message(
        "token refreshed",
        TokenResponse::from(pair),
    )))
}

/// Tokens are not revoked server-side; the client discards them.
pub async fn logout(CurrentUser(ctx): CurrentUser) -> Json<ApiResponse<()>> {
    info!(
        user_id = identity::current_user_id(),
        username = %ctx.username,
        "logout"
    );
    Json(ApiResponse::message("logout succeeded"))
}

pub async fn me(
    State(state): State<AppState>,
    CurrentUser(ctx): CurrentUser,
) -> Result<Json<ApiResponse<MeResponse>>, AppError> {
    let principal = principal::load_active(state.principals.as_ref(), &ctx.username, ctx.user_id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = ctx.user_id, "principal vanished after authentication");
            AppError::from(AuthFailure::UnknownPrincipal)
        })?;

    Ok(Json(ApiResponse::ok(MeResponse::from(principal))))
}

pub async fn validate(CurrentUser(ctx): CurrentUser) -> Json<ApiResponse<ValidateResponse>> {
    Json(ApiResponse::ok(ValidateResponse {
        valid: true,
        username: ctx.username,
        expires_at: ctx.expires_at,
    }))
}
