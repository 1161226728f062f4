use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{BlockRequest, LoginRequest, OkResponse, RefreshRequest};
use super::service::{AuthService, LoginOutcome};

pub async fn login(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Response, AppError> {
    match AuthService::login(&state, &ctx, dto).await? {
        // 202: password accepted, MFA pending.
        LoginOutcome::MfaChallenge(challenge) => {
            Ok((StatusCode::ACCEPTED, Json(challenge)).into_response())
        }
        LoginOutcome::LoggedIn(response) => Ok(Json(response).into_response()),
    }
}

pub async fn refresh(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    ValidatedJson(dto): ValidatedJson<RefreshRequest>,
) -> Result<Response, AppError> {
    let response = AuthService::refresh(&state, &ctx, &dto.refresh_token).await?;
    Ok(Json(response).into_response())
}

/// Stateless: credentials expire on their own; clients drop them now. Kept
/// on the MFA allow-list so a pre-auth holder can abandon the flow.
pub async fn logout() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

pub async fn invalidate(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<OkResponse>, AppError> {
    let ok = AuthService::invalidate_credentials(&state, &ctx).await?;
    Ok(Json(OkResponse { ok }))
}

pub async fn block_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    Json(dto): Json<BlockRequest>,
) -> Result<Json<OkResponse>, AppError> {
    AuthService::block_user(&state, &ctx, id, dto.reason.as_deref()).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    AuthService::unblock_user(&state, &ctx, id).await?;
    Ok(Json(OkResponse { ok: true }))
}
