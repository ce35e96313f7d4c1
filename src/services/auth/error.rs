//! Failures surfaced by the authentication gate.

use thiserror::Error;

use crate::services::auth::codec::DecodeError;

/// Why a bearer token was not accepted. Logged server-side; clients only see a
/// generic 401.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("malformed token")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("token subject no longer exists or is disabled")]
    UnknownPrincipal,
}

impl From<DecodeError> for AuthFailure {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Malformed => AuthFailure::Malformed,
            DecodeError::SignatureInvalid => AuthFailure::SignatureInvalid,
            DecodeError::Expired => AuthFailure::Expired,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationFailure {
    #[error("missing permission {0}")]
    InsufficientPermission(String),
}
