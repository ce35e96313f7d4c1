//! Authentication gate: bearer token → verified claims → identity scope.
//!
//! 1. Public paths run untouched, with no identity.
//! 2. Otherwise `Authorization: Bearer <token>` must carry a valid access token.
//! 3. Permission-tier paths reload the principal and check the permission.
//! 4. The handler runs inside `identity::scope`; `AuthCtx` is also put in extensions.
//!
//! Every rejection is a generic 401 (or 403 for a missing permission); the specific
//! reason only goes to the log.

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{self, Next},
    response::Response,
};
use tracing::warn;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::codec::Claims;
use crate::services::auth::error::{AuthFailure, AuthorizationFailure};
use crate::services::auth::identity::{self, IdentityContext};
use crate::services::auth::principal;
use crate::services::auth::security::Access;
use crate::state::AppState;

/// Put the gate in front of every route of `router`.
///
/// Must be applied to the top-level router (after `nest`) so that path
/// classification sees the full request path.
pub fn apply(router: Router, state: AppState) -> Router {
    // axum 0.8: `from_fn` cannot take a State extractor, so pass state explicitly
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let access = state.security.classify(req.uri().path()).clone();
    if access.is_public() {
        return Ok(next.run(req).await);
    }

    let Some(token) = bearer_token(req.headers()) else {
        warn!(path = %req.uri().path(), reason = %AuthFailure::MissingCredential, "request rejected");
        return Err(AuthFailure::MissingCredential.into());
    };

    let claims = match state.auth.authenticate(token) {
        Ok(claims) => claims,
        Err(reason) => {
            warn!(path = %req.uri().path(), %reason, "access token rejected");
            return Err(reason.into());
        }
    };

    if let Access::Permission(code) = &access {
        authorize(&state, &claims, code).await?;
    }

    req.extensions_mut().insert(AuthCtx::from(&claims));

    let ctx = IdentityContext::for_user(claims.user_id);
    Ok(identity::scope(ctx, next.run(req)).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn authorize(state: &AppState, claims: &Claims, code: &str) -> Result<(), AppError> {
    let principal =
        principal::load_active(state.principals.as_ref(), &claims.subject, claims.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.user_id, "principal unavailable for permission check");
                AppError::from(AuthFailure::UnknownPrincipal)
            })?;

    if !principal.has_permission(code) {
        warn!(user_id = claims.user_id, permission = code, "permission denied");
        return Err(AuthorizationFailure::InsufficientPermission(code.to_string()).into());
    }

    Ok(())
}
