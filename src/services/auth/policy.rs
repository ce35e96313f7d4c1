//! Token policy: signing secret, lifetimes and the claim-name schema.
//!
//! Built once at startup from `Config` and shared (`Arc`) by every component that
//! issues or verifies tokens.

use std::fmt;

use thiserror::Error;

/// HS256 keys shorter than the digest size are rejected.
pub const MIN_SECRET_LEN: usize = 32;

/// `exp` has whole-second resolution; shorter lifetimes could expire on issue.
pub const MIN_TTL_MS: i64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("signing secret must be at least {MIN_SECRET_LEN} bytes, got {0}")]
    SecretTooShort(usize),
    #[error("access token ttl must be at least {MIN_TTL_MS}ms, got {0}ms")]
    AccessTtlTooShort(i64),
    #[error("refresh token ttl ({refresh_ms}ms) must exceed access token ttl ({access_ms}ms)")]
    RefreshNotLonger { access_ms: i64, refresh_ms: i64 },
}

/// Names of the custom claims written into the token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimNames {
    pub subject: &'static str,
    pub user_id: &'static str,
    pub token_type: &'static str,
}

impl Default for ClaimNames {
    fn default() -> Self {
        Self {
            subject: "sub",
            user_id: "userId",
            token_type: "type",
        }
    }
}

#[derive(Clone)]
pub struct TokenPolicy {
    secret: Vec<u8>,
    access_ttl_ms: i64,
    refresh_ttl_ms: i64,
    claims: ClaimNames,
}

impl fmt::Debug for TokenPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenPolicy")
            .field("access_ttl_ms", &self.access_ttl_ms)
            .field("refresh_ttl_ms", &self.refresh_ttl_ms)
            .field("claims", &self.claims)
            .finish()
    }
}

impl TokenPolicy {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        access_ttl_ms: i64,
        refresh_ttl_ms: i64,
    ) -> Result<Self, PolicyError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_LEN {
            return Err(PolicyError::SecretTooShort(secret.len()));
        }
        if access_ttl_ms < MIN_TTL_MS {
            return Err(PolicyError::AccessTtlTooShort(access_ttl_ms));
        }
        if refresh_ttl_ms <= access_ttl_ms {
            return Err(PolicyError::RefreshNotLonger {
                access_ms: access_ttl_ms,
                refresh_ms: refresh_ttl_ms,
            });
        }

        Ok(Self {
            secret,
            access_ttl_ms,
            refresh_ttl_ms,
            claims: ClaimNames::default(),
        })
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn access_ttl_ms(&self) -> i64 {
        self.access_ttl_ms
    }

    pub fn refresh_ttl_ms(&self) -> i64 {
        self.refresh_ttl_ms
    }

    /// Access token lifetime in whole seconds, as reported to clients (`expiresIn`).
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_ms / 1000
    }

    pub fn claim_names(&self) -> &ClaimNames {
        &self.claims
    }
}
