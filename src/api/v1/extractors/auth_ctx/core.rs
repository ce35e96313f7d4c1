use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::error::AuthFailure;
use crate::state::AppState;

use super::AuthCtx;

/// Extractor giving handlers the `AuthCtx` the gate stored in request extensions.
/// Missing means the route was reached without the gate (or as a public route): 401.
pub struct CurrentUser(pub AuthCtx);

impl FromRequestParts<AppState> for CurrentUser
where
    AppState: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::Unauthenticated(AuthFailure::MissingCredential))
    }
}
