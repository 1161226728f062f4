//! The per-request security pipeline.
//!
//! One middleware runs every stage in fixed order for every request:
//!
//! 1. tenant resolution (when enabled and not opted out)
//! 2. scoped session acquisition + schema switch
//! 3. credential verification
//! 4. tenant-mismatch check
//! 5. MFA gate
//! 6. subject resolution + one-time role normalization
//! 7. RBAC against the route's declared requirement
//!
//! Every stage fails fast and closed: an ambiguous or partially-resolved
//! state is a rejection, never an implicit allow. The scoped session inside
//! the context is released when the context drops, on every exit path.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::context::{SecurityContext, Subject};
use crate::middleware::{auth, role, tenant};
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::verify_credential;

pub async fn security_pipeline(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut identity = "anonymous".to_string();

    match run(&state, req, &matched_path, &mut identity).await {
        Ok(req) => next.run(req).await,
        Err(err) => {
            state.metrics.rejected();
            warn!(
                identity = %identity,
                method = %method,
                path = %matched_path,
                code = %err.code,
                "request rejected"
            );
            err.into_response()
        }
    }
}

async fn run(
    state: &AppState,
    mut req: Request,
    matched_path: &str,
    identity: &mut String,
) -> Result<Request, AppError> {
    let requirement = state.routes.requirement_of(req.method(), matched_path);

    let (tenant, db) = tenant::bind_tenant_context(state, &req, &requirement).await?;
    let mut ctx = SecurityContext::anonymous(tenant, db);

    if let Some(raw) = auth::extract_bearer(&state.auth_config, req.headers()) {
        match verify_credential(&raw, &state.jwt_config) {
            Ok(claims) => {
                // A credential minted for one tenant must not act in another.
                if state.tenancy_config.enabled {
                    if let (Some(tenant), Some(tid)) = (&ctx.tenant, claims.tid.as_deref()) {
                        if tid != tenant.id.to_string() {
                            return Err(AppError::tenant_mismatch());
                        }
                    }
                }

                // Pre-auth credentials are confined to the MFA allow-list
                // before RBAC is ever consulted: their holder has not yet
                // proven the second factor.
                let pre_auth = claims.is_pre_auth();
                if pre_auth && !auth::is_mfa_allowlisted(req.uri().path()) {
                    warn!(
                        path = %req.uri().path(),
                        "blocked pre-auth credential outside MFA allow-list"
                    );
                    return Err(AppError::mfa_required());
                }

                let subject =
                    auth::resolve_subject(&state.providers, &ctx.db, &claims.sub).await?;
                *identity = subject.label();

                // Normalized exactly once. A pre-auth subject keeps [public]
                // so its credential can never pass a non-public role check.
                let role_codes = if pre_auth {
                    vec![crate::config::roles::codes::PUBLIC.to_string()]
                } else {
                    match &subject {
                        Subject::User(user) => user.roles.normalize(),
                        Subject::Token(token) => token.roles.normalize(),
                        Subject::Anonymous => unreachable!("resolve_subject never yields anonymous"),
                    }
                };

                ctx.bind_subject(subject, role_codes);
                ctx.set_credential(claims);
            }
            Err(err) => {
                // Fatal only where a non-public role is required; public
                // routes continue anonymously.
                if requirement.requires_authentication() {
                    return Err(AppError::unauthorized(err.message));
                }
            }
        }
    }

    if !requirement.required_roles.is_empty() {
        state.metrics.rbac_evaluated();
        if !role::authorize(&requirement.required_roles, ctx.role_codes()) {
            *identity = ctx.subject.label();
            return Err(AppError::forbidden());
        }
    }

    req.extensions_mut().insert(ctx);
    Ok(req)
}
