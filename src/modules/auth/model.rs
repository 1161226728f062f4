use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::providers::User;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Subject view returned to clients: never includes the password hash or
/// the MFA secret.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub confirmed: bool,
    pub mfa_enabled: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            roles: user.roles.normalize(),
            confirmed: user.confirmed,
            mfa_enabled: user.mfa_enabled,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserView,
    pub token: String,
    pub refresh_token: String,
}

/// 202 response when the password checked out but a second factor is
/// pending: the client must complete the MFA flow with the temp token.
#[derive(Debug, Serialize)]
pub struct MfaChallengeResponse {
    pub mfa_required: bool,
    pub mfa_setup_required: bool,
    pub temp_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}
