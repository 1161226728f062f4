//! Pluggable persistence contracts for subjects and tenants.
//!
//! The pipeline never assumes a concrete storage technology: it talks to
//! these traits only. [`postgres`] supplies the default sqlx-backed
//! implementations; test harnesses swap in in-memory doubles.

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::roles::{Role, codes};
use crate::context::{PipelineMetrics, TenantDb};
use crate::utils::errors::AppError;

/// Role shape as returned by the storage layer: plain codes or full role
/// objects. Normalized to a flat code list exactly once, at subject
/// resolution time — never re-normalized downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectRoles {
    Codes(Vec<String>),
    Objects(Vec<Role>),
}

impl SubjectRoles {
    pub fn empty() -> Self {
        SubjectRoles::Codes(Vec::new())
    }

    /// Canonical flat code list. An empty role set normalizes to `[public]`,
    /// so it can never satisfy a non-empty route requirement.
    pub fn normalize(&self) -> Vec<String> {
        let codes: Vec<String> = match self {
            SubjectRoles::Codes(codes) => codes.clone(),
            SubjectRoles::Objects(roles) => roles.iter().map(|r| r.code.clone()).collect(),
        };
        if codes.is_empty() {
            vec![codes_public()]
        } else {
            codes
        }
    }
}

fn codes_public() -> String {
    codes::PUBLIC.to_string()
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub roles: SubjectRoles,
    pub blocked: bool,
    pub confirmed: bool,
    pub mfa_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct MachineToken {
    pub id: Uuid,
    pub external_id: String,
    pub name: String,
    pub roles: SubjectRoles,
    pub blocked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Suspended,
    Archived,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TenantStatus::Active),
            "suspended" => Some(TenantStatus::Suspended),
            "archived" => Some(TenantStatus::Archived),
            _ => None,
        }
    }
}

/// An isolated logical customer, mapped 1:1 to a database schema. Resolved
/// once per request and never mutated by the pipeline.
#[derive(Clone, Debug, Serialize)]
pub struct Tenant {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub schema_name: String,
    pub status: TenantStatus,
}

impl Tenant {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Lookup criteria for an impersonation target. `blocked = false` is baked
/// into every variant of the search.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TargetUser {
    pub id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTenant {
    pub slug: String,
    pub name: String,
    pub schema_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn retrieve_by_external_id(
        &self,
        db: &TenantDb,
        external_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Standing check: a user is valid iff not blocked. `confirmed` is a
    /// login-time concern, checked separately.
    async fn is_valid_user(&self, db: &TenantDb, user: &User) -> Result<bool, AppError>;

    async fn retrieve_by_password(
        &self,
        db: &TenantDb,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, AppError>;

    /// Rotates the external id, invalidating every credential issued for
    /// this user. Returns the updated user.
    async fn reset_external_id(&self, db: &TenantDb, id: Uuid) -> Result<User, AppError>;

    async fn block_user(
        &self,
        db: &TenantDb,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<(), AppError>;

    async fn unblock_user(&self, db: &TenantDb, id: Uuid) -> Result<(), AppError>;

    async fn mfa_secret(&self, db: &TenantDb, id: Uuid) -> Result<Option<String>, AppError>;

    async fn save_mfa_secret(&self, db: &TenantDb, id: Uuid, secret: &str)
    -> Result<(), AppError>;

    async fn set_mfa_enabled(&self, db: &TenantDb, id: Uuid, enabled: bool)
    -> Result<(), AppError>;

    /// Impersonation-target lookup; only unblocked users match.
    async fn find_target(
        &self,
        db: &TenantDb,
        criteria: &TargetUser,
    ) -> Result<Option<User>, AppError>;
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn retrieve_by_external_id(
        &self,
        db: &TenantDb,
        external_id: &str,
    ) -> Result<Option<MachineToken>, AppError>;

    async fn is_valid_token(&self, db: &TenantDb, token: &MachineToken)
    -> Result<bool, AppError>;

    async fn retrieve_by_id(
        &self,
        db: &TenantDb,
        id: Uuid,
    ) -> Result<Option<MachineToken>, AppError>;

    async fn list_tokens(&self, db: &TenantDb) -> Result<Vec<MachineToken>, AppError>;

    async fn create_token(
        &self,
        db: &TenantDb,
        name: &str,
        roles: &[String],
    ) -> Result<MachineToken, AppError>;

    /// Persists the minted credential string alongside the token record.
    async fn store_token_value(&self, db: &TenantDb, id: Uuid, value: &str)
    -> Result<(), AppError>;

    async fn rename_token(&self, db: &TenantDb, id: Uuid, name: &str) -> Result<(), AppError>;

    async fn remove_token(&self, db: &TenantDb, id: Uuid) -> Result<bool, AppError>;

    async fn set_blocked(
        &self,
        db: &TenantDb,
        id: Uuid,
        blocked: bool,
        reason: Option<&str>,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait TenantProvider: Send + Sync {
    /// Loads tenant metadata for a slug. Read-only: resolution never mutates
    /// tenant state, so resolving the same slug twice yields structurally
    /// identical data.
    async fn resolve(&self, pool: &PgPool, slug: &str) -> Result<Option<Tenant>, AppError>;

    /// Acquires a session scoped to this request and applies the tenant's
    /// schema to that session only. The returned binding releases the
    /// session when dropped.
    async fn switch_context(
        &self,
        pool: &PgPool,
        tenant: &Tenant,
        metrics: &Arc<PipelineMetrics>,
    ) -> Result<TenantDb, AppError>;

    async fn get(&self, pool: &PgPool, id: Uuid) -> Result<Option<Tenant>, AppError>;

    async fn list(&self, pool: &PgPool) -> Result<Vec<Tenant>, AppError>;

    async fn create(&self, pool: &PgPool, spec: &NewTenant) -> Result<Tenant, AppError>;

    async fn update(
        &self,
        pool: &PgPool,
        id: Uuid,
        changes: &TenantUpdate,
    ) -> Result<Option<Tenant>, AppError>;

    async fn set_status(
        &self,
        pool: &PgPool,
        id: Uuid,
        status: TenantStatus,
    ) -> Result<Option<Tenant>, AppError>;
}

/// Provider bundle carried in application state.
#[derive(Clone)]
pub struct Providers {
    pub users: Arc<dyn UserProvider>,
    pub tokens: Arc<dyn TokenProvider>,
    pub tenants: Arc<dyn TenantProvider>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_plain_codes() {
        let roles = SubjectRoles::Codes(vec!["admin".to_string(), "backoffice".to_string()]);
        assert_eq!(roles.normalize(), vec!["admin", "backoffice"]);
    }

    #[test]
    fn normalize_role_objects() {
        let roles = SubjectRoles::Objects(vec![
            Role::new("admin", "Admin", "Admin role"),
            Role::new("backoffice", "Backoffice", "Backoffice role"),
        ]);
        assert_eq!(roles.normalize(), vec!["admin", "backoffice"]);
    }

    #[test]
    fn empty_roles_normalize_to_public() {
        assert_eq!(SubjectRoles::empty().normalize(), vec!["public"]);
        assert_eq!(
            SubjectRoles::Objects(Vec::new()).normalize(),
            vec!["public"]
        );
    }

    #[test]
    fn tenant_status_round_trip() {
        for status in [
            TenantStatus::Active,
            TenantStatus::Suspended,
            TenantStatus::Archived,
        ] {
            assert_eq!(TenantStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TenantStatus::parse("deleted"), None);
    }
}
