//! Configuration modules.
//!
//! Each submodule handles one aspect of configuration, loaded from
//! environment variables via a `from_env()` constructor.
//!
//! - [`auth`]: credential transport mode and external-id rotation policy
//! - [`database`]: PostgreSQL connection pool with search-path reset hook
//! - [`jwt`]: signing secret and per-scope credential lifetimes
//! - [`mfa`]: MFA policy and issuer label
//! - [`roles`]: immutable process-wide role table
//! - [`tenancy`]: multi-tenant toggle and slug resolution strategy

pub mod auth;
pub mod database;
pub mod jwt;
pub mod mfa;
pub mod roles;
pub mod tenancy;
