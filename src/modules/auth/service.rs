use tracing::instrument;
use uuid::Uuid;

use crate::config::mfa::MfaPolicy;
use crate::context::SecurityContext;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::{
    mint_credential, mint_pre_auth_credential, mint_refresh_token, verify_refresh_token,
};

use super::model::{LoginRequest, LoginResponse, MfaChallengeResponse, RefreshResponse, UserView};

pub enum LoginOutcome {
    /// Password accepted, second factor pending.
    MfaChallenge(MfaChallengeResponse),
    LoggedIn(LoginResponse),
}

pub struct AuthService;

impl AuthService {
    #[instrument(skip_all, fields(email = %dto.email))]
    pub async fn login(
        state: &AppState,
        ctx: &SecurityContext,
        dto: LoginRequest,
    ) -> Result<LoginOutcome, AppError> {
        let users = &state.providers.users;

        let user = users
            .retrieve_by_password(&ctx.db, &dto.email, &dto.password)
            .await?
            .ok_or_else(|| AppError::forbidden_with("Wrong credentials"))?;

        if !users.is_valid_user(&ctx.db, &user).await? {
            return Err(AppError::forbidden_with("Wrong credentials"));
        }

        if !user.confirmed {
            return Err(AppError::forbidden_with("User email unconfirmed"));
        }

        // MFA interception: an enrolled user always verifies; an unenrolled
        // user under a mandatory policy is forced into setup. Either way the
        // client only gets a pre-auth credential at this point.
        let mandatory = state.mfa_config.policy == MfaPolicy::Mandatory;
        if user.mfa_enabled || mandatory {
            let temp_token = mint_pre_auth_credential(&user.external_id, &state.jwt_config)?;
            return Ok(LoginOutcome::MfaChallenge(MfaChallengeResponse {
                mfa_required: user.mfa_enabled,
                mfa_setup_required: mandatory && !user.mfa_enabled,
                temp_token,
            }));
        }

        let user = if state.auth_config.rotate_external_id_on_login {
            users.reset_external_id(&ctx.db, user.id).await?
        } else {
            user
        };

        let tenant_id = ctx.tenant.as_ref().map(|t| t.id.to_string());
        let token = mint_credential(&user.external_id, tenant_id.as_deref(), &state.jwt_config)?;
        let refresh_token = mint_refresh_token(&user.external_id, &state.jwt_config)?;

        Ok(LoginOutcome::LoggedIn(LoginResponse {
            user: UserView::from(&user),
            token,
            refresh_token,
        }))
    }

    #[instrument(skip_all)]
    pub async fn refresh(
        state: &AppState,
        ctx: &SecurityContext,
        refresh_token: &str,
    ) -> Result<RefreshResponse, AppError> {
        let claims = verify_refresh_token(refresh_token, &state.jwt_config)?;

        let user = state
            .providers
            .users
            .retrieve_by_external_id(&ctx.db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Wrong refresh token"))?;

        if !state.providers.users.is_valid_user(&ctx.db, &user).await? {
            return Err(AppError::unauthorized("Wrong refresh token"));
        }

        let tenant_id = ctx.tenant.as_ref().map(|t| t.id.to_string());
        let token = mint_credential(&user.external_id, tenant_id.as_deref(), &state.jwt_config)?;
        Ok(RefreshResponse { token })
    }

    /// Rotates the caller's external id, invalidating every credential ever
    /// issued for it. This is the deliberate "log out everywhere" mechanism.
    #[instrument(skip_all)]
    pub async fn invalidate_credentials(
        state: &AppState,
        ctx: &SecurityContext,
    ) -> Result<bool, AppError> {
        let user = ctx
            .user()
            .ok_or_else(|| AppError::forbidden_with("User not linked"))?;

        let updated = state
            .providers
            .users
            .reset_external_id(&ctx.db, user.id)
            .await?;
        state.providers.users.is_valid_user(&ctx.db, &updated).await
    }

    /// Blocks a user and rotates their external id so outstanding
    /// credentials die with the account.
    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn block_user(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        state
            .providers
            .users
            .block_user(&ctx.db, id, reason)
            .await?;
        state.providers.users.reset_external_id(&ctx.db, id).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn unblock_user(
        state: &AppState,
        ctx: &SecurityContext,
        id: Uuid,
    ) -> Result<(), AppError> {
        state.providers.users.unblock_user(&ctx.db, id).await
    }
}
