/*
 * Responsibility
 * - Shared context handed to the Router (AppState)
 * - Cheap to Clone (everything behind Arc)
 */
use std::sync::Arc;

use crate::services::auth::TokenService;
use crate::services::auth::credentials::CredentialValidator;
use crate::services::auth::principal::PrincipalStore;
use crate::services::auth::security::SecurityPolicy;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<TokenService>,
    pub credentials: Arc<CredentialValidator>,
    pub principals: Arc<dyn PrincipalStore>,
    pub security: Arc<SecurityPolicy>,
}

impl AppState {
    pub fn new(
        auth: Arc<TokenService>,
        credentials: Arc<CredentialValidator>,
        principals: Arc<dyn PrincipalStore>,
        security: Arc<SecurityPolicy>,
    ) -> Self {
        Self {
            auth,
            credentials,
            principals,
            security,
        }
    }
}
