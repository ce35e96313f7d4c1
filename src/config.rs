/*
 * Responsibility
 * - Read environment / .env settings (DATABASE_URL, JWT secret, token TTLs, path rules)
 * - Validate values (fail startup when something is missing)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::services::auth::credentials::DEFAULT_BCRYPT_COST;

pub const DEFAULT_ACCESS_TOKEN_TTL_MS: i64 = 7_200_000;
pub const DEFAULT_REFRESH_TOKEN_TTL_MS: i64 = 604_800_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,

    pub app_env: AppEnv,

    pub jwt_secret: String,
    pub access_token_ttl_ms: i64,
    pub refresh_token_ttl_ms: i64,
    pub bcrypt_cost: u32,

    pub public_paths: Vec<String>,
    pub permission_rules: Vec<(String, String)>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("access_token_ttl_ms", &self.access_token_ttl_ms)
            .field("refresh_token_ttl_ms", &self.refresh_token_ttl_ms)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("public_paths", &self.public_paths)
            .field("permission_rules", &self.permission_rules)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let app_env = AppEnv::from_env();

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let access_token_ttl_ms = parse_or("ACCESS_TOKEN_TTL_MS", DEFAULT_ACCESS_TOKEN_TTL_MS)?;
        let refresh_token_ttl_ms = parse_or("REFRESH_TOKEN_TTL_MS", DEFAULT_REFRESH_TOKEN_TTL_MS)?;
        let bcrypt_cost = parse_or("BCRYPT_COST", DEFAULT_BCRYPT_COST)?;

        let public_paths = split_list(&std::env::var("SECURITY_PUBLIC_PATHS").unwrap_or_default());

        let permission_rules =
            parse_permission_rules(&std::env::var("SECURITY_PERMISSION_RULES").unwrap_or_default())
                .ok_or(ConfigError::Invalid("SECURITY_PERMISSION_RULES"))?;

        Ok(Self {
            addr,
            database_url,
            app_env,
            jwt_secret,
            access_token_ttl_ms,
            refresh_token_ttl_ms,
            bcrypt_cost,
            public_paths,
            permission_rules,
        })
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        _ => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `"/api/admin/**=system:admin, /api/reports/*=report:read"`
fn parse_permission_rules(raw: &str) -> Option<Vec<(String, String)>> {
    split_list(raw)
        .into_iter()
        .map(|entry| {
            let (pattern, permission) = entry.split_once('=')?;
            let (pattern, permission) = (pattern.trim(), permission.trim());
            if pattern.is_empty() || permission.is_empty() {
                return None;
            }
            Some((pattern.to_string(), permission.to_string()))
        })
        .collect()
}
