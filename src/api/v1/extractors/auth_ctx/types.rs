/*
 * Responsibility
 * - The "authenticated context" type handlers see
 * - The gate verifies the token and stores this in request extensions; handlers only take this type
 */

use chrono::{DateTime, Utc};

use crate::services::auth::codec::Claims;

/// Context attached to an authenticated request.
///
/// - `user_id` / `username` come from the verified access token
/// - permissions are not carried here; routes that need them are checked by the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCtx {
    pub user_id: i64,
    pub username: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&Claims> for AuthCtx {
    fn from(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.subject.clone(),
            expires_at: claims.expires_at_utc(),
        }
    }
}
