use std::env;

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Full-credential lifetime in seconds.
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
    /// Pre-auth credentials are deliberately short-lived.
    pub pre_auth_expiry: i64,
    pub impersonation_expiry: i64,
    /// Horizon applied to machine credentials minted without an explicit TTL.
    pub machine_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            access_token_expiry: env_i64("JWT_ACCESS_EXPIRY", 3600), // 1 hour
            refresh_token_expiry: env_i64("JWT_REFRESH_EXPIRY", 604_800), // 7 days
            pre_auth_expiry: env_i64("JWT_PRE_AUTH_EXPIRY", 300),    // 5 minutes
            impersonation_expiry: env_i64("JWT_IMPERSONATION_EXPIRY", 86_400), // 24 hours
            machine_token_expiry: env_i64("JWT_MACHINE_TOKEN_EXPIRY", 315_360_000), // ~10 years
        }
    }
}
