//! Request-processing middleware.
//!
//! - [`requirement`]: static route security declarations
//! - [`tenant`]: tenant resolution and database context binding
//! - [`auth`]: credential extraction, MFA gate, subject resolution
//! - [`role`]: role-based authorization
//! - [`pipeline`]: the ordered per-request security pipeline

pub mod auth;
pub mod pipeline;
pub mod requirement;
pub mod role;
pub mod tenant;
