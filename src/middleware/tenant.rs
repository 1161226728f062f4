//! Tenant resolution and database context binding.
//!
//! Runs first in the pipeline: derives a tenant slug from the request,
//! loads and validates the tenant, then has the tenant provider open a
//! request-scoped session with the tenant's schema applied. Routes may opt
//! out via their declaration, in which case the request binds the global
//! pool and the default schema.

use axum::extract::Request;
use tracing::trace;

use crate::config::tenancy::{TenancyConfig, TenantResolver};
use crate::context::TenantDb;
use crate::middleware::requirement::RouteRequirement;
use crate::providers::Tenant;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Extracts the tenant slug according to the configured strategy. Returns
/// `None` when the request carries no usable slug.
pub fn resolve_slug(config: &TenancyConfig, req: &Request) -> Option<String> {
    match config.resolver {
        TenantResolver::Subdomain => {
            let host = req
                .headers()
                .get(axum::http::header::HOST)
                .and_then(|v| v.to_str().ok())?;
            let host = host.split(':').next().unwrap_or(host);
            let parts: Vec<&str> = host.split('.').collect();
            // Assumes [slug].[domain].[tld] or [slug].localhost.
            if parts.len() >= 2 && parts[0] != "www" && !parts[0].is_empty() {
                Some(parts[0].to_string())
            } else {
                None
            }
        }
        TenantResolver::Header => req
            .headers()
            .get(config.header_key.as_str())
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        TenantResolver::Query => {
            let query = req.uri().query()?;
            query.split('&').find_map(|pair| {
                let (key, value) = pair.split_once('=')?;
                (key == config.query_key && !value.is_empty()).then(|| value.to_string())
            })
        }
    }
}

/// Resolves the tenant (when enabled and not opted out) and binds the
/// request's database context. The scoped session inside the returned
/// [`TenantDb`] is released when the security context drops.
pub fn bind_tenant_context<'a>(
    state: &'a AppState,
    req: &Request,
    requirement: &'a RouteRequirement,
) -> impl std::future::Future<Output = Result<(Option<Tenant>, TenantDb), AppError>> + Send + 'a {
    // All request access happens synchronously, before the returned future is
    // awaited: `&Request` (whose body is not `Sync`) must not be held across an
    // await point, or the pipeline future would stop being `Send`.
    let slug = resolve_slug(&state.tenancy_config, req);
    let path = req.uri().path().to_string();

    async move {
        if !state.tenancy_config.enabled {
            return Ok((None, TenantDb::global(state.db.clone())));
        }

        if requirement.tenant_context_opt_out {
            trace!(path = %path, "route opted out of tenant context");
            return Ok((None, TenantDb::global(state.db.clone())));
        }

        let slug = slug.ok_or_else(AppError::tenant_missing)?;

        let tenant = state
            .providers
            .tenants
            .resolve(&state.db, &slug)
            .await?
            .ok_or_else(|| AppError::tenant_not_found(&slug))?;

        if !tenant.is_active() {
            return Err(AppError::tenant_inactive());
        }

        let db = state
            .providers
            .tenants
            .switch_context(&state.db, &tenant, &state.metrics)
            .await?;

        trace!(tenant = %tenant.slug, "tenant context bound");
        Ok((Some(tenant), db))
    }
}
