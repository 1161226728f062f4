//! Credential extraction, the MFA gate, and subject resolution.

use axum::http::HeaderMap;
use axum::http::header;
use axum_extra::extract::cookie::CookieJar;

use crate::config::auth::{AuthConfig, AuthTransport};
use crate::context::{Subject, TenantDb};
use crate::providers::Providers;
use crate::utils::errors::AppError;

/// Endpoint suffixes reachable with a pre-auth credential: completing or
/// configuring the second factor, and logging out. Everything else is
/// blocked before RBAC is ever consulted.
pub const MFA_ALLOWLIST: [&str; 4] = [
    "/auth/mfa/setup",
    "/auth/mfa/enable",
    "/auth/mfa/verify",
    "/auth/logout",
];

pub fn is_mfa_allowlisted(path: &str) -> bool {
    MFA_ALLOWLIST.iter().any(|suffix| path.ends_with(suffix))
}

/// Pulls the raw bearer value off the request, from the Authorization
/// header or the configured cookie depending on the transport mode. The
/// JWT carries its own signature either way.
pub fn extract_bearer(config: &AuthConfig, headers: &HeaderMap) -> Option<String> {
    match config.transport {
        AuthTransport::Bearer => {
            let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
            let token = auth.strip_prefix("Bearer ")?;
            (!token.is_empty()).then(|| token.to_string())
        }
        AuthTransport::Cookie => CookieJar::from_headers(headers)
            .get(&config.cookie_name)
            .map(|cookie| cookie.value().to_string()),
    }
}

/// Resolves a credential subject: user provider first, then token provider.
/// Exactly one of user, token, or neither results.
///
/// A subject in bad standing is rejected, never downgraded to anonymous;
/// a dangling identifier (e.g. a deleted account) is `SUBJECT_NOT_FOUND`,
/// not the public role.
pub async fn resolve_subject(
    providers: &Providers,
    db: &TenantDb,
    external_id: &str,
) -> Result<Subject, AppError> {
    if let Some(user) = providers
        .users
        .retrieve_by_external_id(db, external_id)
        .await?
    {
        if !providers.users.is_valid_user(db, &user).await? {
            return Err(AppError::user_not_valid());
        }
        return Ok(Subject::User(user));
    }

    if let Some(token) = providers
        .tokens
        .retrieve_by_external_id(db, external_id)
        .await?
    {
        if !providers.tokens.is_valid_token(db, &token).await? {
            return Err(AppError::token_not_valid());
        }
        return Ok(Subject::Token(token));
    }

    Err(AppError::subject_not_found())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn allowlist_matches_by_suffix() {
        assert!(is_mfa_allowlisted("/api/auth/mfa/setup"));
        assert!(is_mfa_allowlisted("/api/auth/mfa/enable"));
        assert!(is_mfa_allowlisted("/api/auth/mfa/verify"));
        assert!(is_mfa_allowlisted("/api/auth/logout"));
    }

    #[test]
    fn allowlist_rejects_everything_else() {
        assert!(!is_mfa_allowlisted("/api/me"));
        assert!(!is_mfa_allowlisted("/api/auth/login"));
        assert!(!is_mfa_allowlisted("/api/auth/mfa/disable"));
        assert!(!is_mfa_allowlisted("/api/auth/mfa/verify/extra"));
    }

    #[test]
    fn bearer_extraction() {
        let config = AuthConfig::bearer();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(extract_bearer(&config, &headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_extraction_rejects_malformed_header() {
        let config = AuthConfig::bearer();

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&config, &headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer(&config, &headers), None);

        let empty = HeaderMap::new();
        assert_eq!(extract_bearer(&config, &empty), None);
    }

    #[test]
    fn cookie_extraction_reads_configured_name() {
        let config = AuthConfig {
            transport: AuthTransport::Cookie,
            cookie_name: "auth_token".to_string(),
            rotate_external_id_on_login: false,
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("other=1; auth_token=abc.def.ghi"),
        );
        assert_eq!(extract_bearer(&config, &headers).as_deref(), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(extract_bearer(&config, &headers), None);
    }
}
