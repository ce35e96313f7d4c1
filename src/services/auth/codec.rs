//! Signed, self-contained tokens (HS256 compact JWS).
//!
//! `decode` verifies in a fixed order: segment shape, then signature, then expiry,
//! then claim types. Nothing inside the payload is read before the signature check
//! passes.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::error;

use crate::services::auth::policy::{ClaimNames, TokenPolicy};

const ISSUED_AT: &str = "iat";
const EXPIRES_AT: &str = "exp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// What the caller wants signed. Timestamps are added by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    pub subject: String,
    pub user_id: i64,
    pub token_type: TokenType,
}

impl ClaimSet {
    pub fn access(subject: impl Into<String>, user_id: i64) -> Self {
        Self {
            subject: subject.into(),
            user_id,
            token_type: TokenType::Access,
        }
    }

    pub fn refresh(subject: impl Into<String>, user_id: i64) -> Self {
        Self {
            subject: subject.into(),
            user_id,
            token_type: TokenType::Refresh,
        }
    }
}

/// Verified token contents. `issued_at` / `expires_at` are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: String,
    pub user_id: i64,
    pub token_type: TokenType,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.token_type == TokenType::Refresh
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed token")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
}

#[derive(Debug, Error)]
#[error("failed to sign token: {0}")]
pub struct EncodeError(#[from] jsonwebtoken::errors::Error);

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    names: ClaimNames,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("names", &self.names)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(policy: &TokenPolicy) -> Self {
        // Expiry is checked here, without leeway, after the signature has been verified.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(policy.secret()),
            decoding_key: DecodingKey::from_secret(policy.secret()),
            validation,
            names: policy.claim_names().clone(),
        }
    }

    /// Sign `claims` so that the token expires `ttl_ms` after now. A non-positive
    /// ttl produces a token that is already expired.
    pub fn encode(&self, claims: &ClaimSet, ttl_ms: i64) -> Result<String, EncodeError> {
        self.encode_at(claims, ttl_ms, Utc::now().timestamp_millis())
    }

    pub fn decode(&self, token: &str) -> Result<Claims, DecodeError> {
        self.decode_at(token, Utc::now().timestamp_millis())
    }

    fn encode_at(&self, claims: &ClaimSet, ttl_ms: i64, now_ms: i64) -> Result<String, EncodeError> {
        let issued_at = now_ms.div_euclid(1000);
        let expires_at = now_ms.saturating_add(ttl_ms).div_euclid(1000);

        let mut payload = Map::new();
        payload.insert(self.names.subject.into(), Value::from(claims.subject.clone()));
        payload.insert(self.names.user_id.into(), Value::from(claims.user_id));
        payload.insert(
            self.names.token_type.into(),
            Value::from(claims.token_type.as_str()),
        );
        payload.insert(ISSUED_AT.into(), Value::from(issued_at));
        payload.insert(EXPIRES_AT.into(), Value::from(expires_at));

        let header = Header::new(Algorithm::HS256);
        jsonwebtoken::encode(&header, &payload, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign token");
            EncodeError(e)
        })
    }

    fn decode_at(&self, token: &str, now_ms: i64) -> Result<Claims, DecodeError> {
        if token.is_empty() || token.split('.').count() != 3 {
            return Err(DecodeError::Malformed);
        }

        let payload =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::InvalidSignature => DecodeError::SignatureInvalid,
                    _ => DecodeError::Malformed,
                })?
                .claims;

        // Signature verified; payload may be read from here on.
        let expires_at = payload
            .get(EXPIRES_AT)
            .and_then(Value::as_i64)
            .ok_or(DecodeError::Malformed)?;
        if now_ms >= expires_at.saturating_mul(1000) {
            return Err(DecodeError::Expired);
        }

        self.typed_claims(&payload, expires_at)
    }

    fn typed_claims(&self, payload: &Map<String, Value>, expires_at: i64) -> Result<Claims, DecodeError> {
        let subject = payload
            .get(self.names.subject)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or(DecodeError::Malformed)?;
        let user_id = payload
            .get(self.names.user_id)
            .and_then(Value::as_i64)
            .ok_or(DecodeError::Malformed)?;
        let issued_at = payload
            .get(ISSUED_AT)
            .and_then(Value::as_i64)
            .ok_or(DecodeError::Malformed)?;
        // A missing type marker means an access token.
        let token_type = match payload.get(self.names.token_type) {
            None => TokenType::Access,
            Some(Value::String(s)) if s == "access" => TokenType::Access,
            Some(Value::String(s)) if s == "refresh" => TokenType::Refresh,
            Some(_) => return Err(DecodeError::Malformed),
        };

        Ok(Claims {
            subject: subject.to_string(),
            user_id,
            token_type,
            issued_at,
            expires_at,
        })
    }
}
