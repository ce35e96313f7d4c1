/*
 * Responsibility
 * - Load Config → build dependencies → assemble the Router
 * - Compose the middleware chain (outermost first):
 *     http (trace, request id, body limit) → error envelope → timeout → catch panic → auth gate
 * - Start axum::serve()
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::repos::principal_repo::PgPrincipalStore;
use crate::services::auth::credentials::{BcryptHasher, CredentialValidator};
use crate::services::auth::principal::PrincipalStore;
use crate::services::auth::{build_security_policy, build_token_service};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,waterworks_auth=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing; stderr may be hidden depending on how the
        // process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it is noticed immediately.
        // Production: default hook, the server keeps running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting auth API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    // Process-level services are built once here and shared through AppState.
    let db = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("failed to connect to DATABASE_URL")?;

    let principals: Arc<dyn PrincipalStore> = Arc::new(PgPrincipalStore::new(db));
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost));
    let credentials = Arc::new(CredentialValidator::new(principals.clone(), hasher));

    let auth = build_token_service(config)?;
    let security = build_security_policy(config)?;
    tracing::info!(rules = security.rules().len(), "security policy loaded");

    Ok(AppState::new(auth, credentials, principals, security))
}

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .merge(api::v1::health_routes())
        .nest("/api", api::v1::routes());

    compose(routes, state)
}

fn compose(routes: Router<AppState>, state: AppState) -> Router {
    let router = routes
        .fallback(|| async { AppError::NotFound })
        .with_state(state.clone());

    let router = middleware::auth::access::apply(router, state);
    let router = middleware::http::catch_panic(router);
    let router = middleware::http::timeout(router, middleware::http::REQUEST_TIMEOUT);
    let router = router.layer(axum::middleware::from_fn(
        middleware::envelope::error_envelope,
    ));

    middleware::http::apply(router)
}

#[cfg(test)]
mod tests;
