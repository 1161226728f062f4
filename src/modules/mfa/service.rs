use rand::RngCore;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::instrument;
use uuid::Uuid;

use crate::context::SecurityContext;
use crate::providers::User;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::jwt::{mint_credential, mint_refresh_token};

use super::model::{MfaEnableRequest, MfaSetupResponse, MfaTokensResponse, MfaVerifyRequest};
use crate::modules::auth::model::UserView;

fn build_totp(secret_bytes: Vec<u8>, issuer: &str, account: &str) -> Result<TOTP, AppError> {
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create TOTP: {}", e)))
}

/// Checks a 6-digit code against a base32-encoded secret.
pub fn verify_code(code: &str, secret_encoded: &str) -> Result<bool, AppError> {
    let secret_bytes = Secret::Encoded(secret_encoded.to_string())
        .to_bytes()
        .map_err(|e| AppError::internal(anyhow::anyhow!("Malformed MFA secret: {:?}", e)))?;
    // Issuer/account only affect the provisioning URL, not verification.
    let totp = build_totp(secret_bytes, "verify", "verify")?;
    totp.check_current(code)
        .map_err(|e| AppError::internal(anyhow::anyhow!("Clock error verifying TOTP: {}", e)))
}

pub struct MfaService;

impl MfaService {
    /// Generates an enrollment secret with provisioning URL and QR code.
    /// Nothing is persisted until the code round-trips through `enable`.
    #[instrument(skip_all, fields(email = %email))]
    pub fn generate_setup(app_name: &str, email: &str) -> Result<MfaSetupResponse, AppError> {
        let mut secret_bytes = vec![0u8; 20];
        rand::thread_rng().fill_bytes(&mut secret_bytes);

        let secret = Secret::Raw(secret_bytes.clone());
        let secret_encoded = secret.to_encoded().to_string();

        let totp = build_totp(secret_bytes, app_name, email)?;
        let otpauth_url = totp.get_url();
        let qr_code_base64 = totp
            .get_qr_base64()
            .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to generate QR code: {}", e)))?;

        Ok(MfaSetupResponse {
            secret: secret_encoded,
            otpauth_url,
            qr_code_base64,
        })
    }

    /// Verifies the first code against the client-held secret, persists the
    /// secret, and flips enrollment on. Returns full tokens so a user forced
    /// into setup at login leaves with a working session.
    #[instrument(skip_all)]
    pub async fn enable(
        state: &AppState,
        ctx: &SecurityContext,
        dto: MfaEnableRequest,
    ) -> Result<MfaTokensResponse, AppError> {
        let user = ctx
            .user()
            .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

        if !verify_code(&dto.code, &dto.secret)? {
            return Err(AppError::bad_request("Invalid MFA code"));
        }

        let users = &state.providers.users;
        users.save_mfa_secret(&ctx.db, user.id, &dto.secret).await?;
        users.set_mfa_enabled(&ctx.db, user.id, true).await?;

        let mut enrolled = user.clone();
        enrolled.mfa_enabled = true;
        Self::issue_full_tokens(state, ctx, &enrolled).await
    }

    /// The only transition from pre-auth to full: the holder proves the
    /// second factor and trades the temp credential for real ones.
    #[instrument(skip_all)]
    pub async fn verify(
        state: &AppState,
        ctx: &SecurityContext,
        dto: MfaVerifyRequest,
    ) -> Result<MfaTokensResponse, AppError> {
        let claims = ctx
            .credential
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Missing authorization"))?;

        if !claims.is_pre_auth() && ctx.user().is_none() {
            return Err(AppError::forbidden_with("Invalid token scope"));
        }

        let users = &state.providers.users;
        let user = users
            .retrieve_by_external_id(&ctx.db, &claims.sub)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let secret = users
            .mfa_secret(&ctx.db, user.id)
            .await?
            .ok_or_else(|| AppError::forbidden_with("MFA not configured for user"))?;

        if !verify_code(&dto.code, &secret)? {
            return Err(AppError::forbidden_with("Invalid MFA code"));
        }

        let user = if state.auth_config.rotate_external_id_on_login {
            users.reset_external_id(&ctx.db, user.id).await?
        } else {
            user
        };

        Self::issue_full_tokens(state, ctx, &user).await
    }

    #[instrument(skip_all)]
    pub async fn disable(state: &AppState, ctx: &SecurityContext) -> Result<(), AppError> {
        let user = ctx
            .user()
            .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

        if !state.mfa_config.policy.allows_disable() {
            return Err(AppError::forbidden_with(
                "MFA disable is not allowed by security policy",
            ));
        }

        state
            .providers
            .users
            .set_mfa_enabled(&ctx.db, user.id, false)
            .await
    }

    /// Admin reset: clears another user's enrollment so they can re-enroll.
    #[instrument(skip_all, fields(user_id = %id))]
    pub async fn reset(state: &AppState, ctx: &SecurityContext, id: Uuid) -> Result<(), AppError> {
        state
            .providers
            .users
            .set_mfa_enabled(&ctx.db, id, false)
            .await
    }

    async fn issue_full_tokens(
        state: &AppState,
        ctx: &SecurityContext,
        user: &User,
    ) -> Result<MfaTokensResponse, AppError> {
        let tenant_id = ctx.tenant.as_ref().map(|t| t.id.to_string());
        let token = mint_credential(&user.external_id, tenant_id.as_deref(), &state.jwt_config)?;
        let refresh_token = mint_refresh_token(&user.external_id, &state.jwt_config)?;

        Ok(MfaTokensResponse {
            ok: true,
            user: UserView::from(user),
            token,
            refresh_token,
        })
    }
}
