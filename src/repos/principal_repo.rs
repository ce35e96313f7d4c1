/*
 * Responsibility
 * - SQLx access to users / roles / role_permissions / permissions
 * - PgPrincipalStore: PrincipalStore backed by Postgres
 */
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool};

use crate::repos::error::RepoError;
use crate::services::auth::principal::{
    Credentials, Principal, PrincipalStore, StoreError, StoredPrincipal,
};

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub is_active: bool,
    pub role_name: Option<String>,
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    code: String,
}

pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<UserRow>, RepoError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT u.id, u.username, u.password_hash, u.is_active, r.name AS role_name
        FROM users u
        LEFT JOIN roles r ON r.id = u.role_id
        WHERE u.username = $1
          AND u.deleted_at IS NULL
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await?;

    Ok(row)
}

pub async fn permission_codes(db: &PgPool, user_id: i64) -> Result<Vec<String>, RepoError> {
    let rows = sqlx::query_as::<_, PermissionRow>(
        r#"
        SELECT DISTINCT p.code
        FROM users u
        JOIN role_permissions rp ON rp.role_id = u.role_id
        JOIN permissions p ON p.id = rp.permission_id
        WHERE u.id = $1
        ORDER BY p.code
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(|r| r.code).collect())
}

pub async fn touch_last_login(db: &PgPool, user_id: i64) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        UPDATE users
        SET last_login = $2
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(Utc::now())
    .execute(db)
    .await?;

    Ok(())
}

#[derive(Clone)]
pub struct PgPrincipalStore {
    db: PgPool,
}

impl PgPrincipalStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn lookup_by_username(&self, username: &str) -> Result<Option<StoredPrincipal>, StoreError> {
        let Some(user) = find_by_username(&self.db, username).await? else {
            return Ok(None);
        };
        let permissions = permission_codes(&self.db, user.id).await?;

        Ok(Some(StoredPrincipal {
            principal: Principal {
                user_id: user.id,
                username: user.username.clone(),
                role_name: user.role_name,
                permissions: permissions.into_iter().collect(),
            },
            credentials: Credentials {
                username: user.username,
                secret_hash: user.password_hash,
            },
            active: user.is_active,
        }))
    }

    async fn record_login(&self, user_id: i64) -> Result<(), StoreError> {
        touch_last_login(&self.db, user_id).await?;
        Ok(())
    }
}
