use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::model::UserView;

#[derive(Debug, Serialize)]
pub struct MfaSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_code_base64: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MfaEnableRequest {
    #[validate(length(min = 1))]
    pub secret: String,
    #[validate(length(min = 6, max = 6))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MfaVerifyRequest {
    #[validate(length(min = 6, max = 6))]
    pub code: String,
}

/// Full tokens issued once the second factor has been proven.
#[derive(Debug, Serialize)]
pub struct MfaTokensResponse {
    pub ok: bool,
    pub user: UserView,
    pub token: String,
    pub refresh_token: String,
}
