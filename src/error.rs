/*
 * Responsibility
 * - Application-wide AppError
 * - IntoResponse (HTTP status / JSON envelope)
 * - Convert auth / credential / store errors into a single shape
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::codec::EncodeError;
use crate::services::auth::credentials::CredentialError;
use crate::services::auth::error::{AuthFailure, AuthorizationFailure};
use crate::services::auth::principal::StoreError;
use crate::services::auth::token_service::RefreshError;

/// Success body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
    pub timestamp: i64,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message("success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: Some(data),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: message.into(),
            data: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Failure body. `path` is filled in by the envelope middleware.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    pub data: Option<()>,
    pub timestamp: i64,
    pub path: Option<String>,
}

/// Attached to error responses so outer middleware can re-render them.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub timestamp: i64,
}

impl ErrorReport {
    pub fn render(&self, path: Option<&str>) -> Response {
        let body = ErrorResponse {
            code: self.status.as_u16(),
            message: self.message.clone(),
            data: None,
            timestamp: self.timestamp,
            path: path.map(str::to_string),
        };

        let mut res = (self.status, Json(body)).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res.extensions_mut().insert(self.clone());
        res
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthFailure),
    #[error(transparent)]
    Credential(CredentialError),
    #[error("forbidden: {0}")]
    Forbidden(AuthorizationFailure),
    #[error("not found")]
    NotFound,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            // The reason is logged where it happens; clients get one generic answer.
            AppError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "unauthenticated".into()),
            AppError::Credential(CredentialError::AccountDisabled) => {
                (StatusCode::UNAUTHORIZED, "account disabled".into())
            }
            AppError::Credential(CredentialError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
            AppError::Credential(_) => (
                StatusCode::UNAUTHORIZED,
                "invalid username or password".into(),
            ),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "insufficient permission".into()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".into()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".into(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        ErrorReport {
            status,
            message,
            timestamp: Utc::now().timestamp_millis(),
        }
        .render(None)
    }
}

impl From<AuthFailure> for AppError {
    fn from(e: AuthFailure) -> Self {
        AppError::Unauthenticated(e)
    }
}

impl From<AuthorizationFailure> for AppError {
    fn from(e: AuthorizationFailure) -> Self {
        AppError::Forbidden(e)
    }
}

impl From<CredentialError> for AppError {
    fn from(e: CredentialError) -> Self {
        if let CredentialError::Store(inner) = &e {
            tracing::error!(error = %inner, "principal store failed during login");
        }
        AppError::Credential(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "principal store failed");
        AppError::Internal
    }
}

impl From<EncodeError> for AppError {
    fn from(_: EncodeError) -> Self {
        AppError::Internal
    }
}

impl From<RefreshError> for AppError {
    fn from(e: RefreshError) -> Self {
        match e {
            RefreshError::Rejected(failure) => {
                tracing::warn!(reason = %failure, "refresh token rejected");
                AppError::Unauthenticated(failure)
            }
            RefreshError::Issue(_) => AppError::Internal,
        }
    }
}
