//! Authenticated principal and the store it is loaded from.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::repos::error::RepoError;

/// Fallback role name reported when an account has no role assigned.
pub const UNASSIGNED_ROLE: &str = "unassigned";

/// Who is making the request. Loaded fresh per authentication event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role_name: Option<String>,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.contains(code)
    }

    pub fn role_name_or_default(&self) -> &str {
        self.role_name.as_deref().unwrap_or(UNASSIGNED_ROLE)
    }
}

/// Stored login material. Only the salted one-way digest is kept.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub secret_hash: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret_hash", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct StoredPrincipal {
    pub principal: Principal,
    pub credentials: Credentials,
    pub active: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("principal store unavailable: {0}")]
    Unavailable(#[from] RepoError),
}

#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn lookup_by_username(&self, username: &str) -> Result<Option<StoredPrincipal>, StoreError>;

    fn is_active(&self, stored: &StoredPrincipal) -> bool {
        stored.active
    }

    /// Stamp the last successful login.
    async fn record_login(&self, user_id: i64) -> Result<(), StoreError>;
}

/// Reload the principal named by a verified token.
///
/// `None` when the account is gone, disabled, or the username now belongs to a
/// different user id.
pub async fn load_active(
    store: &dyn PrincipalStore,
    username: &str,
    user_id: i64,
) -> Result<Option<Principal>, StoreError> {
    let principal = store
        .lookup_by_username(username)
        .await?
        .filter(|stored| store.is_active(stored) && stored.principal.user_id == user_id)
        .map(|stored| stored.principal);
    Ok(principal)
}
