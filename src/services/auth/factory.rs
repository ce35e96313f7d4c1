/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::services::auth::policy::TokenPolicy;
use crate::services::auth::security::SecurityPolicy;
use crate::services::auth::token_service::TokenService;

pub fn build_token_service(config: &Config) -> Result<Arc<TokenService>, ConfigError> {
    let policy = TokenPolicy::new(
        config.jwt_secret.as_bytes(),
        config.access_token_ttl_ms,
        config.refresh_token_ttl_ms,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "invalid token policy");
        ConfigError::Invalid("JWT_SECRET / ACCESS_TOKEN_TTL_MS / REFRESH_TOKEN_TTL_MS")
    })?;

    Ok(Arc::new(TokenService::new(policy)))
}

/// Standard public table, then extra public paths, then permission rules.
pub fn build_security_policy(config: &Config) -> Result<Arc<SecurityPolicy>, ConfigError> {
    let mut policy = SecurityPolicy::standard().map_err(|e| {
        tracing::error!(error = %e, "invalid standard public path");
        ConfigError::Invalid("STANDARD_PUBLIC_PATHS")
    })?;

    for pattern in &config.public_paths {
        policy = policy
            .public(pattern)
            .map_err(|_| ConfigError::Invalid("SECURITY_PUBLIC_PATHS"))?;
    }

    for (pattern, permission) in &config.permission_rules {
        policy = policy
            .permission(pattern, permission.clone())
            .map_err(|_| ConfigError::Invalid("SECURITY_PERMISSION_RULES"))?;
    }

    Ok(Arc::new(policy))
}
