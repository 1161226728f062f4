//! Credential minting and verification.
//!
//! Every bearer credential issued by this service is a signed JWT. Two scopes
//! exist: a full credential (normal access) and a pre-auth credential
//! (`scope = "pre-auth-mfa"`), issued mid-login while a second factor is
//! pending. Verification is a pure function of the token string and the
//! signing secret; scope restrictions are enforced downstream by the MFA
//! gate, never here.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::utils::errors::AppError;

/// Scope value carried by credentials issued mid-login, before the second
/// factor has been presented.
pub const PRE_AUTH_SCOPE: &str = "pre-auth-mfa";

/// Decoded payload of a bearer credential.
///
/// `sub` is the subject's external id — rotatable independently of the
/// primary key, so rotating it invalidates every outstanding credential for
/// that subject. `tid` binds the credential to a tenant; `impersonator` is
/// an audit field set only by the impersonation issuer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CredentialClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<String>,
    pub iat: usize,
    pub exp: usize,
}

impl CredentialClaims {
    pub fn is_pre_auth(&self) -> bool {
        self.scope.as_deref() == Some(PRE_AUTH_SCOPE)
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

fn sign<T: serde::Serialize>(claims: &T, config: &JwtConfig) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to sign credential: {}", e)))
}

/// Mints a full credential for a subject, optionally bound to a tenant.
pub fn mint_credential(
    external_id: &str,
    tenant_id: Option<&str>,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = CredentialClaims {
        sub: external_id.to_string(),
        tid: tenant_id.map(str::to_string),
        scope: None,
        impersonator: None,
        iat: now,
        exp: now + config.access_token_expiry as usize,
    };
    sign(&claims, config)
}

/// Mints the short-lived pre-auth credential issued mid-login while MFA
/// verification or setup is pending.
pub fn mint_pre_auth_credential(external_id: &str, config: &JwtConfig) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = CredentialClaims {
        sub: external_id.to_string(),
        tid: None,
        scope: Some(PRE_AUTH_SCOPE.to_string()),
        impersonator: None,
        iat: now,
        exp: now + config.pre_auth_expiry as usize,
    };
    sign(&claims, config)
}

/// Mints a credential for a machine token. Machine credentials without a
/// client-supplied TTL get the configured long-horizon expiry instead of an
/// `exp`-less token.
pub fn mint_machine_credential(
    external_id: &str,
    tenant_id: Option<&str>,
    expires_in: Option<i64>,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let ttl = expires_in.unwrap_or(config.machine_token_expiry).max(0) as usize;
    let claims = CredentialClaims {
        sub: external_id.to_string(),
        tid: tenant_id.map(str::to_string),
        scope: None,
        impersonator: None,
        iat: now,
        exp: now + ttl,
    };
    sign(&claims, config)
}

/// Mints a full credential bound to a target tenant and subject on behalf of
/// an acting administrator, recorded in the `impersonator` audit field.
pub fn mint_impersonation_credential(
    external_id: &str,
    tenant_id: &str,
    impersonator: &str,
    config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = CredentialClaims {
        sub: external_id.to_string(),
        tid: Some(tenant_id.to_string()),
        scope: None,
        impersonator: Some(impersonator.to_string()),
        iat: now,
        exp: now + config.impersonation_expiry as usize,
    };
    sign(&claims, config)
}

/// Verifies signature and expiry, returning the decoded claims.
///
/// Pure function of the string and the secret: no I/O, no side effects.
pub fn verify_credential(token: &str, config: &JwtConfig) -> Result<CredentialClaims, AppError> {
    decode::<CredentialClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::invalid_credential("Invalid or expired token"))
}

pub fn mint_refresh_token(external_id: &str, config: &JwtConfig) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = RefreshClaims {
        sub: external_id.to_string(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp: now + config.refresh_token_expiry as usize,
    };
    sign(&claims, config)
}

pub fn verify_refresh_token(token: &str, config: &JwtConfig) -> Result<RefreshClaims, AppError> {
    decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))
}
