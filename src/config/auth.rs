use std::env;

/// Where the bearer credential travels on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthTransport {
    /// `Authorization: Bearer <token>` header.
    Bearer,
    /// A named cookie; the JWT inside carries its own signature.
    Cookie,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub transport: AuthTransport,
    pub cookie_name: String,
    /// Rotate the subject's external id on every successful login, which
    /// invalidates all previously issued credentials.
    pub rotate_external_id_on_login: bool,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let transport = match env::var("AUTH_MODE").as_deref() {
            Ok("COOKIE") | Ok("cookie") => AuthTransport::Cookie,
            _ => AuthTransport::Bearer,
        };
        Self {
            transport,
            cookie_name: env::var("AUTH_COOKIE_NAME").unwrap_or_else(|_| "auth_token".to_string()),
            rotate_external_id_on_login: env::var("ROTATE_EXTERNAL_ID_ON_LOGIN")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn bearer() -> Self {
        Self {
            transport: AuthTransport::Bearer,
            cookie_name: "auth_token".to_string(),
            rotate_external_id_on_login: false,
        }
    }
}
