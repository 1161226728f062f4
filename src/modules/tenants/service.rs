use chrono::{Duration, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::providers::{NewTenant, TargetUser, Tenant, TenantStatus, TenantUpdate};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::mint_impersonation_credential;

use super::model::{
    CreateTenantRequest, ImpersonateRequest, ImpersonateResponse, ImpersonatedUser,
    UpdateTenantRequest,
};

pub struct TenantService;

impl TenantService {
    #[instrument(skip_all)]
    pub async fn list(state: &AppState) -> Result<Vec<Tenant>, AppError> {
        state.providers.tenants.list(&state.db).await
    }

    #[instrument(skip_all, fields(slug = %dto.slug))]
    pub async fn create(state: &AppState, dto: CreateTenantRequest) -> Result<Tenant, AppError> {
        let spec = NewTenant {
            schema_name: dto.schema_name(),
            slug: dto.slug,
            name: dto.name,
        };
        state.providers.tenants.create(&state.db, &spec).await
    }

    #[instrument(skip_all, fields(tenant_id = %id))]
    pub async fn get(state: &AppState, id: Uuid) -> Result<Tenant, AppError> {
        state
            .providers
            .tenants
            .get(&state.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant not found"))
    }

    #[instrument(skip_all, fields(tenant_id = %id))]
    pub async fn update(
        state: &AppState,
        id: Uuid,
        dto: UpdateTenantRequest,
    ) -> Result<Tenant, AppError> {
        let changes = TenantUpdate {
            name: dto.name,
            status: dto.status,
        };
        state
            .providers
            .tenants
            .update(&state.db, id, &changes)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant not found"))
    }

    #[instrument(skip_all, fields(tenant_id = %id))]
    pub async fn archive(state: &AppState, id: Uuid) -> Result<Tenant, AppError> {
        state
            .providers
            .tenants
            .set_status(&state.db, id, TenantStatus::Archived)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant not found"))
    }

    #[instrument(skip_all, fields(tenant_id = %id))]
    pub async fn restore(state: &AppState, id: Uuid) -> Result<Tenant, AppError> {
        state
            .providers
            .tenants
            .set_status(&state.db, id, TenantStatus::Active)
            .await?
            .ok_or_else(|| AppError::not_found("Tenant not found"))
    }

    /// Mints a full credential bound to a target tenant/subject pair on
    /// behalf of an administrator.
    ///
    /// Cross-tenant issuance is reserved for admins of the system tenant;
    /// any other admin may only target their own tenant. The target lookup
    /// runs on its own session switched to the target schema — released
    /// independently of the ambient request session, since the target may be
    /// a different tenant than the request is bound to.
    #[instrument(skip_all)]
    pub async fn impersonate(
        state: &AppState,
        ctx: &SecurityContext,
        dto: ImpersonateRequest,
    ) -> Result<ImpersonateResponse, AppError> {
        let caller = ctx
            .user()
            .ok_or_else(|| AppError::forbidden_with("Impersonation requires a user subject"))?;

        let tenants = &state.providers.tenants;
        let target_tenant = if let Some(slug) = dto.target_tenant_slug.as_deref() {
            tenants.resolve(&state.db, slug).await?
        } else if let Some(id) = dto.target_tenant_id {
            tenants.get(&state.db, id).await?
        } else {
            None
        };

        let target_tenant = target_tenant
            .filter(Tenant::is_active)
            .ok_or_else(|| AppError::not_found("Target tenant not found or inactive"))?;

        let same_tenant = ctx
            .tenant
            .as_ref()
            .is_some_and(|t| t.id == target_tenant.id);
        if !ctx.is_system_tenant(&state.tenancy_config) && !same_tenant {
            return Err(AppError::forbidden_with(
                "Cross-tenant impersonation requires system tenant membership",
            ));
        }

        // Dedicated session on the target schema; dropped (and released)
        // when this function returns, on success and failure alike.
        let target_db = tenants
            .switch_context(&state.db, &target_tenant, &state.metrics)
            .await?;

        let criteria = TargetUser {
            id: dto.target_user_id,
            email: dto.target_user_email.clone(),
            role: dto.target_role.clone(),
        };
        let target_user = state
            .providers
            .users
            .find_target(&target_db, &criteria)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Target user not found (or blocked) matching criteria")
            })?;

        let token = mint_impersonation_credential(
            &target_user.external_id,
            &target_tenant.id.to_string(),
            &caller.email,
            &state.jwt_config,
        )?;

        info!(
            impersonator = %caller.email,
            target_tenant = %target_tenant.slug,
            target_user = %target_user.email,
            "impersonation credential issued"
        );

        Ok(ImpersonateResponse {
            token,
            expires_at: Utc::now() + Duration::seconds(state.jwt_config.impersonation_expiry),
            impersonated_user: ImpersonatedUser {
                id: target_user.id,
                email: target_user.email,
            },
        })
    }
}
