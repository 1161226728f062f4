use axum::Json;
use axum::extract::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::context::{SecurityContext, Subject};

/// The caller's view of its own security context: how the pipeline resolved
/// it, nothing more.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub label: String,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<String>,
}

pub async fn me(Extension(ctx): Extension<SecurityContext>) -> Json<MeResponse> {
    let id = match &ctx.subject {
        Subject::Anonymous => None,
        Subject::User(user) => Some(user.id),
        Subject::Token(token) => Some(token.id),
    };

    Json(MeResponse {
        kind: ctx.subject.kind(),
        id,
        label: ctx.subject.label(),
        roles: ctx.role_codes().to_vec(),
        tenant: ctx.tenant.as_ref().map(|t| t.slug.clone()),
        impersonator: ctx
            .credential
            .as_ref()
            .and_then(|c| c.impersonator.clone()),
    })
}
