use tracing::instrument;
use uuid::Uuid;

use crate::config::roles::{codes, roles};
use crate::context::SecurityContext;
use crate::providers::MachineToken;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::mint_machine_credential;

use super::model::{CreateTokenRequest, CreatedTokenResponse, TokenView};

pub struct TokenService;

impl TokenService {
    /// Registers a machine token and mints its credential. Requested role
    /// codes are filtered against the role table; `public` is always
    /// granted.
    #[instrument(skip_all, fields(name = %dto.name))]
    pub async fn create(
        state: &AppState,
        ctx: &SecurityContext,
        dto: CreateTokenRequest,
    ) -> Result<CreatedTokenResponse, AppError> {
        let table = roles();
        let mut granted: Vec<String> = dto
            .roles
            .iter()
            .filter(|code| table.contains(code))
            .cloned()
            .collect();
        if !granted.iter().any(|c| c == codes::PUBLIC) {
            granted.push(codes::PUBLIC.to_string());
        }

        let tokens = &state.providers.tokens;
        let token = tokens.create_token(&ctx.db, &dto.name, &granted).await?;

        let tenant_id = ctx.tenant.as_ref().map(|t| t.id.to_string());
        let credential = mint_machine_credential(
            &token.external_id,
            tenant_id.as_deref(),
            dto.expires_in,
            &state.jwt_config,
        )?;
        tokens
            .store_token_value(&ctx.db, token.id, &credential)
            .await?;

        Ok(CreatedTokenResponse {
            view: TokenView::from(&token),
            token: credential,
        })
    }

    #[instrument(skip_all)]
    pub async fn list(state: &AppState, ctx: &SecurityContext) -> Result<Vec<MachineToken>, AppError> {
        state.providers.tokens.list_tokens(&ctx.db).await
    }

    #[instrument(skip_all, fields(token_id = %id))]
    pub async fn get(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<MachineToken, AppError> {
        state
            .providers
            .tokens
            .retrieve_by_id(&ctx.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Token not found"))
    }

    #[instrument(skip_all, fields(token_id = %id))]
    pub async fn rename(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
        name: &str,
    ) -> Result<MachineToken, AppError> {
        let tokens = &state.providers.tokens;
        tokens
            .retrieve_by_id(&ctx.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Token not found"))?;
        tokens.rename_token(&ctx.db, id, name).await?;
        Self::get(state, ctx, id).await
    }

    #[instrument(skip_all, fields(token_id = %id))]
    pub async fn remove(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), AppError> {
        if !state.providers.tokens.remove_token(&ctx.db, id).await? {
            return Err(AppError::not_found("Token not found"));
        }
        Ok(())
    }

    #[instrument(skip_all, fields(token_id = %id))]
    pub async fn set_blocked(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
        blocked: bool,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        let tokens = &state.providers.tokens;
        tokens
            .retrieve_by_id(&ctx.db, id)
            .await?
            .ok_or_else(|| AppError::not_found("Token not found"))?;
        tokens.set_blocked(&ctx.db, id, blocked, reason).await
    }
}
