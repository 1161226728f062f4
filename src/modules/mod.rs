pub mod auth;
pub mod health;
pub mod me;
pub mod mfa;
pub mod tenants;
pub mod tokens;
