//! sqlx-backed provider implementations.
//!
//! Subject queries run on the request's tenant-scoped session, so they see
//! the schema applied by the context switch. Tenant metadata lives in the
//! shared `public` schema and is queried straight off the pool.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::context::{PipelineMetrics, SessionGuard, TenantDb};
use crate::providers::{
    MachineToken, NewTenant, SubjectRoles, TargetUser, Tenant, TenantProvider, TenantStatus,
    TenantUpdate, TokenProvider, User, UserProvider,
};
use crate::utils::errors::AppError;
use crate::utils::password::verify_password;

/// Schema identifiers are interpolated into `SET search_path` and
/// provisioning DDL, so they are restricted to a strict allow-list pattern.
/// A tenant record with anything else in `schema_name` is treated as
/// corrupted configuration, not as a request error.
pub fn is_safe_schema_ident(ident: &str) -> bool {
    !ident.is_empty()
        && ident.len() <= 63
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    external_id: String,
    email: String,
    roles: Vec<String>,
    blocked: bool,
    confirmed: bool,
    mfa_enabled: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            roles: SubjectRoles::Codes(row.roles),
            blocked: row.blocked,
            confirmed: row.confirmed,
            mfa_enabled: row.mfa_enabled,
        }
    }
}

const USER_COLUMNS: &str = "id, external_id, email, roles, blocked, confirmed, mfa_enabled";

#[derive(Clone, Debug, Default)]
pub struct PgUserProvider;

#[async_trait]
impl UserProvider for PgUserProvider {
    async fn retrieve_by_external_id(
        &self,
        db: &TenantDb,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(User::from))
    }

    async fn is_valid_user(&self, _db: &TenantDb, user: &User) -> Result<bool, AppError> {
        Ok(!user.blocked)
    }

    async fn retrieve_by_password(
        &self,
        db: &TenantDb,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AppError> {
        #[derive(sqlx::FromRow)]
        struct UserWithPassword {
            id: Uuid,
            external_id: String,
            email: String,
            roles: Vec<String>,
            blocked: bool,
            confirmed: bool,
            mfa_enabled: bool,
            password: String,
        }

        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_COLUMNS}, password FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if !verify_password(password, &row.password)? {
            return Ok(None);
        }

        Ok(Some(User {
            id: row.id,
            external_id: row.external_id,
            email: row.email,
            roles: SubjectRoles::Codes(row.roles),
            blocked: row.blocked,
            confirmed: row.confirmed,
            mfa_enabled: row.mfa_enabled,
        }))
    }

    async fn reset_external_id(&self, db: &TenantDb, id: Uuid) -> Result<User, AppError> {
        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET external_id = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(User::from(row))
    }

    async fn block_user(
        &self,
        db: &TenantDb,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE users SET blocked = TRUE, blocked_reason = $1 WHERE id = $2")
            .bind(reason)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn unblock_user(&self, db: &TenantDb, id: Uuid) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE users SET blocked = FALSE, blocked_reason = NULL WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn mfa_secret(&self, db: &TenantDb, id: Uuid) -> Result<Option<String>, AppError> {
        let mut conn = db.conn().await?;
        let secret: Option<(Option<String>,)> =
            sqlx::query_as("SELECT mfa_secret FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;
        Ok(secret.and_then(|(s,)| s))
    }

    async fn save_mfa_secret(
        &self,
        db: &TenantDb,
        id: Uuid,
        secret: &str,
    ) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE users SET mfa_secret = $1 WHERE id = $2")
            .bind(secret)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn set_mfa_enabled(
        &self,
        db: &TenantDb,
        id: Uuid,
        enabled: bool,
    ) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        if enabled {
            sqlx::query("UPDATE users SET mfa_enabled = TRUE WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
        } else {
            sqlx::query("UPDATE users SET mfa_enabled = FALSE, mfa_secret = NULL WHERE id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    async fn find_target(
        &self,
        db: &TenantDb,
        criteria: &TargetUser,
    ) -> Result<Option<User>, AppError> {
        let mut conn = db.conn().await?;

        let row = if let Some(id) = criteria.id {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE blocked = FALSE AND id = $1"
            ))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
        } else if let Some(email) = criteria.email.as_deref() {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE blocked = FALSE AND email = $1"
            ))
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?
        } else if let Some(role) = criteria.role.as_deref() {
            sqlx::query_as::<_, UserRow>(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE blocked = FALSE AND $1 = ANY(roles) LIMIT 1"
            ))
            .bind(role)
            .fetch_optional(&mut *conn)
            .await?
        } else {
            None
        };

        Ok(row.map(User::from))
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    external_id: String,
    name: String,
    roles: Vec<String>,
    blocked: bool,
}

impl From<TokenRow> for MachineToken {
    fn from(row: TokenRow) -> Self {
        MachineToken {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            roles: SubjectRoles::Codes(row.roles),
            blocked: row.blocked,
        }
    }
}

const TOKEN_COLUMNS: &str = "id, external_id, name, roles, blocked";

#[derive(Clone, Debug, Default)]
pub struct PgTokenProvider;

#[async_trait]
impl TokenProvider for PgTokenProvider {
    async fn retrieve_by_external_id(
        &self,
        db: &TenantDb,
        external_id: &str,
    ) -> Result<Option<MachineToken>, AppError> {
        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(MachineToken::from))
    }

    async fn is_valid_token(
        &self,
        _db: &TenantDb,
        token: &MachineToken,
    ) -> Result<bool, AppError> {
        Ok(!token.blocked)
    }

    async fn retrieve_by_id(
        &self,
        db: &TenantDb,
        id: Uuid,
    ) -> Result<Option<MachineToken>, AppError> {
        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.map(MachineToken::from))
    }

    async fn list_tokens(&self, db: &TenantDb) -> Result<Vec<MachineToken>, AppError> {
        let mut conn = db.conn().await?;
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM api_tokens ORDER BY created_at"
        ))
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().map(MachineToken::from).collect())
    }

    async fn create_token(
        &self,
        db: &TenantDb,
        name: &str,
        roles: &[String],
    ) -> Result<MachineToken, AppError> {
        let mut conn = db.conn().await?;
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "INSERT INTO api_tokens (external_id, name, roles) VALUES ($1, $2, $3) \
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(roles)
        .fetch_one(&mut *conn)
        .await?;
        Ok(MachineToken::from(row))
    }

    async fn store_token_value(
        &self,
        db: &TenantDb,
        id: Uuid,
        value: &str,
    ) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE api_tokens SET token = $1 WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn rename_token(&self, db: &TenantDb, id: Uuid, name: &str) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE api_tokens SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn remove_token(&self, db: &TenantDb, id: Uuid) -> Result<bool, AppError> {
        let mut conn = db.conn().await?;
        let result = sqlx::query("DELETE FROM api_tokens WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_blocked(
        &self,
        db: &TenantDb,
        id: Uuid,
        blocked: bool,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let mut conn = db.conn().await?;
        sqlx::query("UPDATE api_tokens SET blocked = $1, blocked_reason = $2 WHERE id = $3")
            .bind(blocked)
            .bind(reason)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    slug: String,
    name: String,
    schema_name: String,
    status: String,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = AppError;

    fn try_from(row: TenantRow) -> Result<Self, AppError> {
        let status = TenantStatus::parse(&row.status).ok_or_else(|| {
            AppError::internal(anyhow::anyhow!(
                "tenant '{}' has unknown status '{}'",
                row.slug,
                row.status
            ))
        })?;
        Ok(Tenant {
            id: row.id,
            slug: row.slug,
            name: row.name,
            schema_name: row.schema_name,
            status,
        })
    }
}

const TENANT_COLUMNS: &str = "id, slug, name, schema_name, status";

#[derive(Clone, Debug, Default)]
pub struct PgTenantProvider;

#[async_trait]
impl TenantProvider for PgTenantProvider {
    async fn resolve(&self, pool: &PgPool, slug: &str) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(pool)
        .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn switch_context(
        &self,
        pool: &PgPool,
        tenant: &Tenant,
        metrics: &Arc<PipelineMetrics>,
    ) -> Result<TenantDb, AppError> {
        if !is_safe_schema_ident(&tenant.schema_name) {
            return Err(AppError::internal(anyhow::anyhow!(
                "tenant '{}' has unsafe schema name",
                tenant.slug
            )));
        }

        let mut conn = pool.acquire().await.map_err(AppError::internal)?;

        // Scoped to this connection only; the pool's after_release hook
        // resets it when the connection goes back.
        sqlx::query(&format!(
            r#"SET search_path TO "{}", "public""#,
            tenant.schema_name
        ))
        .execute(&mut *conn)
        .await?;

        Ok(TenantDb::scoped(conn, SessionGuard::acquire(metrics)))
    }

    async fn get(&self, pool: &PgPool, id: Uuid) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn list(&self, pool: &PgPool) -> Result<Vec<Tenant>, AppError> {
        let rows = sqlx::query_as::<_, TenantRow>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY slug"
        ))
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Tenant::try_from).collect()
    }

    async fn create(&self, pool: &PgPool, spec: &NewTenant) -> Result<Tenant, AppError> {
        if !is_safe_schema_ident(&spec.schema_name) {
            return Err(AppError::bad_request("Invalid schema name"));
        }

        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "INSERT INTO tenants (slug, name, schema_name, status) \
             VALUES ($1, $2, $3, 'active') RETURNING {TENANT_COLUMNS}"
        ))
        .bind(&spec.slug)
        .bind(&spec.name)
        .bind(&spec.schema_name)
        .fetch_one(pool)
        .await?;

        // Provision the tenant schema. Identifier already validated above.
        let schema = &spec.schema_name;
        sqlx::query(&format!(r#"CREATE SCHEMA IF NOT EXISTS "{schema}""#))
            .execute(pool)
            .await?;
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{schema}".users (LIKE public.users INCLUDING ALL)"#
        ))
        .execute(pool)
        .await?;
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{schema}".api_tokens (LIKE public.api_tokens INCLUDING ALL)"#
        ))
        .execute(pool)
        .await?;

        Tenant::try_from(row)
    }

    async fn update(
        &self,
        pool: &PgPool,
        id: Uuid,
        changes: &TenantUpdate,
    ) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "UPDATE tenants SET name = COALESCE($1, name), status = COALESCE($2, status) \
             WHERE id = $3 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(changes.name.as_deref())
        .bind(changes.status.map(|s| s.as_str()))
        .bind(id)
        .fetch_optional(pool)
        .await?;
        row.map(Tenant::try_from).transpose()
    }

    async fn set_status(
        &self,
        pool: &PgPool,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError> {
        let row = sqlx::query_as::<_, TenantRow>(&format!(
            "UPDATE tenants SET status = $1 WHERE id = $2 RETURNING {TENANT_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(pool)
        .await?;
        row.map(Tenant::try_from).transpose()
    }
}
