use tracing::{debug, error};

use crate::services::auth::codec::{ClaimSet, Claims, EncodeError, TokenCodec};
use crate::services::auth::error::AuthFailure;
use crate::services::auth::policy::TokenPolicy;
use crate::services::auth::principal::Principal;

/// Issues access/refresh pairs and checks presented tokens.
///
/// - Access tokens authorize API calls.
/// - Refresh tokens only buy a new pair; they are rejected by the gate.
///
/// Tokens are self-contained. Nothing is persisted, so an issued token stays valid
/// until it expires (a refreshed-away refresh token included).
#[derive(Clone, Debug)]
pub struct TokenService {
    codec: TokenCodec,
    policy: TokenPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Rejected(#[from] AuthFailure),
    #[error(transparent)]
    Issue(#[from] EncodeError),
}

impl TokenService {
    pub fn new(policy: TokenPolicy) -> Self {
        Self {
            codec: TokenCodec::new(&policy),
            policy,
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Issue a new token pair for an authenticated principal.
    pub fn issue_token_pair(&self, principal: &Principal) -> Result<IssuedTokenPair, EncodeError> {
        self.issue_for(&principal.username, principal.user_id)
    }

    /// Trade a refresh token for a new pair bound to the same subject.
    ///
    /// The principal is not reloaded; the presented token is not invalidated.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedTokenPair, RefreshError> {
        let claims = self.codec.decode(refresh_token).map_err(AuthFailure::from)?;
        if !claims.is_refresh() {
            return Err(AuthFailure::WrongTokenType.into());
        }

        debug!(user_id = claims.user_id, "refreshing token pair");
        Ok(self.issue_for(&claims.subject, claims.user_id)?)
    }

    /// Accept an access token for an API call.
    pub fn authenticate(&self, access_token: &str) -> Result<Claims, AuthFailure> {
        let claims = self.codec.decode(access_token)?;
        if claims.is_refresh() {
            return Err(AuthFailure::WrongTokenType);
        }
        Ok(claims)
    }

    fn issue_for(&self, subject: &str, user_id: i64) -> Result<IssuedTokenPair, EncodeError> {
        let access_token = self
            .codec
            .encode(&ClaimSet::access(subject, user_id), self.policy.access_ttl_ms())
            .inspect_err(|e| error!(user_id, error = %e, "failed to issue access token"))?;

        let refresh_token = self
            .codec
            .encode(&ClaimSet::refresh(subject, user_id), self.policy.refresh_ttl_ms())
            .inspect_err(|e| error!(user_id, error = %e, "failed to issue refresh token"))?;

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.policy.access_ttl_seconds(),
        })
    }
}

/// Service-level return type to keep handlers thin.
#[derive(Clone, Debug)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::codec::TokenType;

    fn service() -> TokenService {
        let policy =
            TokenPolicy::new("refresh-test-secret-refresh-test-secret", 3_600_000, 86_400_000).unwrap();
        TokenService::new(policy)
    }

    fn alice() -> Principal {
        Principal {
            user_id: 42,
            username: "alice".into(),
            role_name: Some("operator".into()),
            permissions: Default::default(),
        }
    }

    #[test]
    fn issued_pair_has_distinct_types() {
        let svc = service();
        let pair = svc.issue_token_pair(&alice()).unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let access = svc.authenticate(&pair.access_token).unwrap();
        assert_eq!(access.subject, "alice");
        assert_eq!(access.user_id, 42);
        assert_eq!(access.token_type, TokenType::Access);
        assert!(access.expires_at > access.issued_at);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let svc = service();
        let pair = svc.issue_token_pair(&alice()).unwrap();
        assert_eq!(
            svc.authenticate(&pair.refresh_token),
            Err(AuthFailure::WrongTokenType)
        );
    }

    #[test]
    fn refresh_yields_new_pair_for_same_subject() {
        let svc = service();
        let first = svc.issue_token_pair(&alice()).unwrap();

        let second = svc.refresh(&first.refresh_token).unwrap();
        let claims = svc.authenticate(&second.access_token).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.user_id, 42);

        // No revocation: the earlier access token keeps working until it expires.
        assert!(svc.authenticate(&first.access_token).is_ok());
        // And the earlier refresh token can be replayed.
        assert!(svc.refresh(&first.refresh_token).is_ok());
    }

    #[test]
    fn access_token_cannot_refresh() {
        let svc = service();
        let pair = svc.issue_token_pair(&alice()).unwrap();
        let err = svc.refresh(&pair.access_token).unwrap_err();
        assert!(matches!(err, RefreshError::Rejected(AuthFailure::WrongTokenType)));
    }

    #[test]
    fn garbage_cannot_refresh() {
        let err = service().refresh("not-a-token").unwrap_err();
        assert!(matches!(err, RefreshError::Rejected(AuthFailure::Malformed)));
    }
}
