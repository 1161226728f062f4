use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::providers::Tenant;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{
    CreateTenantRequest, ImpersonateRequest, ImpersonateResponse, UpdateTenantRequest,
};
use super::service::TenantService;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Tenant>>, AppError> {
    Ok(Json(TenantService::list(&state).await?))
}

pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(dto): ValidatedJson<CreateTenantRequest>,
) -> Result<Response, AppError> {
    let tenant = TenantService::create(&state, dto).await?;
    Ok((StatusCode::CREATED, Json(tenant)).into_response())
}

pub async fn find_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(TenantService::get(&state, id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateTenantRequest>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(TenantService::update(&state, id, dto).await?))
}

pub async fn archive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(TenantService::archive(&state, id).await?))
}

pub async fn restore(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tenant>, AppError> {
    Ok(Json(TenantService::restore(&state, id).await?))
}

pub async fn impersonate(
    State(state): State<AppState>,
    Extension(ctx): Extension<SecurityContext>,
    Json(dto): Json<ImpersonateRequest>,
) -> Result<Json<ImpersonateResponse>, AppError> {
    Ok(Json(TenantService::impersonate(&state, &ctx, dto).await?))
}
