//! # Palisade
//!
//! A multi-tenant per-request security pipeline for axum backends. For
//! every inbound request the pipeline resolves the tenant and binds a
//! schema-scoped database session, authenticates the bearer credential,
//! resolves the caller to a first-class subject (human user or machine
//! token), gates pre-auth credentials behind the MFA allow-list, and
//! authorizes the subject against the route's statically declared roles.
//!
//! ## Pipeline order
//!
//! ```text
//! tenant resolve → scoped session + schema switch → credential verify
//!   → tenant-mismatch check → MFA gate → subject resolution
//!   → role normalization → RBAC → handler → session released on drop
//! ```
//!
//! Every stage fails closed. The scoped session is released exactly once on
//! every exit path — normal response, pipeline rejection, handler panic, or
//! client disconnect — because release is tied to dropping the request's
//! security context, not to response delivery.
//!
//! ## Layout
//!
//! ```text
//! src/
//! ├── config/           # env-driven configuration + role table
//! ├── context.rs        # SecurityContext, scoped session, metrics
//! ├── middleware/       # requirement table, tenant stage, auth stage, RBAC, pipeline
//! ├── providers/        # pluggable User/Token/Tenant contracts + Postgres impls
//! ├── modules/          # feature modules (auth, mfa, tenants, tokens, me, health)
//! └── utils/            # errors, JWT, password hashing
//! ```
//!
//! Each feature module follows the same structure: `controller.rs` (HTTP
//! handlers), `service.rs` (business logic), `model.rs` (DTOs), `router.rs`
//! (routes + security declarations).
//!
//! ## Roles
//!
//! Built-in role codes are `public`, `admin`, and `backoffice`; applications
//! append their own at startup via [`config::roles::install`]. A route
//! declaring no required roles is public. Authorization is OR-semantics:
//! any one declared role grants access.

pub mod config;
pub mod context;
pub mod logging;
pub mod middleware;
pub mod modules;
pub mod providers;
pub mod router;
pub mod state;
pub mod utils;
pub mod validator;
