use axum::Json;
use axum::extract::{Extension, Path, State};
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::modules::auth::model::OkResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{MfaEnableRequest, MfaSetupResponse, MfaTokensResponse, MfaVerifyRequest};
use super::service::MfaService;

pub async fn setup(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<MfaSetupResponse>, AppError> {
    let user = ctx
        .user()
        .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

    let response = MfaService::generate_setup(&state.mfa_config.app_name, &user.email)?;
    Ok(Json(response))
}

pub async fn enable(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    ValidatedJson(dto): ValidatedJson<MfaEnableRequest>,
) -> Result<Json<MfaTokensResponse>, AppError> {
    let response = MfaService::enable(&state, &ctx, dto).await?;
    Ok(Json(response))
}

pub async fn verify(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    ValidatedJson(dto): ValidatedJson<MfaVerifyRequest>,
) -> Result<Json<MfaTokensResponse>, AppError> {
    let response = MfaService::verify(&state, &ctx, dto).await?;
    Ok(Json(response))
}

pub async fn disable(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<OkResponse>, AppError> {
    MfaService::disable(&state, &ctx).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn reset(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    MfaService::reset(&state, &ctx, id).await?;
    Ok(Json(OkResponse { ok: true }))
}
