use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::modules::auth::model::OkResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{BlockTokenRequest, CreateTokenRequest, TokenView, UpdateTokenRequest};
use super::service::TokenService;

pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    ValidatedJson(dto): ValidatedJson<CreateTokenRequest>,
) -> Result<Response, AppError> {
    let response = TokenService::create(&state, &ctx, dto).await?;
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
) -> Result<Json<Vec<TokenView>>, AppError> {
    let tokens = TokenService::list(&state, &ctx).await?;
    Ok(Json(tokens.iter().map(TokenView::from).collect()))
}

pub async fn find_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<TokenView>, AppError> {
    let token = TokenService::get(&state, &ctx, id).await?;
    Ok(Json(TokenView::from(&token)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTokenRequest>,
) -> Result<Json<TokenView>, AppError> {
    let token = TokenService::rename(&state, &ctx, id, &dto.name).await?;
    Ok(Json(TokenView::from(&token)))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    TokenService::remove(&state, &ctx, id).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn block(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
    Json(dto): Json<BlockTokenRequest>,
) -> Result<Json<OkResponse>, AppError> {
    TokenService::set_blocked(&state, &ctx, id, true, dto.reason.as_deref()).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn unblock(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    TokenService::set_blocked(&state, &ctx, id, false, None).await?;
    Ok(Json(OkResponse { ok: true }))
}
