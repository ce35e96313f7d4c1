//! Username / password verification against the principal store.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::services::auth::principal::{Principal, PrincipalStore, StoreError};

pub const DEFAULT_BCRYPT_COST: u32 = 10;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("account not found")]
    AccountNotFound,
    #[error("account disabled")]
    AccountDisabled,
    #[error("credential mismatch")]
    CredentialMismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(#[from] bcrypt::BcryptError);

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, HashError>;

    /// Constant-time comparison. An unreadable digest never matches.
    fn matches(&self, plaintext: &str, digest: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    fn matches(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct CredentialValidator {
    store: Arc<dyn PrincipalStore>,
    hasher: Arc<dyn PasswordHasher>,
    // Compared against when the account does not exist so both paths cost one hash check.
    decoy_hash: Option<String>,
}

impl CredentialValidator {
    pub fn new(store: Arc<dyn PrincipalStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        let decoy_hash = hasher.hash("decoy-password-for-unknown-accounts").ok();
        Self {
            store,
            hasher,
            decoy_hash,
        }
    }

    /// Check `plaintext` against the stored digest for `username`.
    ///
    /// The password is compared before the account status is looked at, so a
    /// disabled account is only reported to a caller who knows its password.
    pub async fn verify(&self, username: &str, plaintext: &str) -> Result<Principal, CredentialError> {
        let Some(stored) = self.store.lookup_by_username(username).await? else {
            if let Some(decoy) = &self.decoy_hash {
                let _ = self.hasher.matches(plaintext, decoy);
            }
            debug!(username, "login for unknown account");
            return Err(CredentialError::AccountNotFound);
        };

        if !self.hasher.matches(plaintext, &stored.credentials.secret_hash) {
            debug!(user_id = stored.principal.user_id, "password mismatch");
            return Err(CredentialError::CredentialMismatch);
        }

        if !self.store.is_active(&stored) {
            debug!(user_id = stored.principal.user_id, "login for disabled account");
            return Err(CredentialError::AccountDisabled);
        }

        Ok(stored.principal)
    }
}
