use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::providers::TenantStatus;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 63))]
    pub slug: String,
    #[validate(length(min = 1))]
    pub name: String,
    /// Defaults to the slug with dashes mapped to underscores.
    pub schema_name: Option<String>,
}

impl CreateTenantRequest {
    pub fn schema_name(&self) -> String {
        self.schema_name
            .clone()
            .unwrap_or_else(|| self.slug.replace('-', "_"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub status: Option<TenantStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ImpersonateRequest {
    pub target_tenant_slug: Option<String>,
    pub target_tenant_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub target_user_email: Option<String>,
    pub target_role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImpersonatedUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ImpersonateResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub impersonated_user: ImpersonatedUser,
}
