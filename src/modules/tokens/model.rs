use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::providers::MachineToken;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTokenRequest {
    #[validate(length(min = 1))]
    pub name: String,
    /// Role codes to grant; unknown codes are dropped, `public` is always
    /// included.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Credential TTL in seconds; omitted means the configured long horizon.
    pub expires_in: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTokenRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BlockTokenRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenView {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<String>,
    pub blocked: bool,
}

impl From<&MachineToken> for TokenView {
    fn from(token: &MachineToken) -> Self {
        Self {
            id: token.id,
            name: token.name.clone(),
            roles: token.roles.normalize(),
            blocked: token.blocked,
        }
    }
}

/// Returned once, at creation: the minted credential is only shown here.
#[derive(Debug, Serialize)]
pub struct CreatedTokenResponse {
    #[serde(flatten)]
    pub view: TokenView,
    pub token: String,
}
