use axum::Router;
use axum::http::Method;
use axum::routing::post;

use crate::config::roles::codes;
use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

/// Nested under `/api/auth/mfa` so the pipeline's pre-auth allow-list
/// suffixes line up with these paths.
pub fn init_mfa_router() -> Router<AppState> {
    Router::new()
        .route("/setup", post(controller::setup))
        .route("/enable", post(controller::enable))
        .route("/verify", post(controller::verify))
        .route("/disable", post(controller::disable))
        .route("/reset/{id}", post(controller::reset))
}

pub fn declare_routes(table: &mut RouteTable) {
    // Setup/enable/verify stay public at the RBAC layer: a pre-auth subject
    // holds only the public role, and these are exactly the endpoints it
    // must be able to reach. Handlers enforce subject presence themselves.
    table.declare(
        Method::POST,
        "/api/auth/mfa/setup",
        RouteRequirement::public(),
    );
    table.declare(
        Method::POST,
        "/api/auth/mfa/enable",
        RouteRequirement::public(),
    );
    table.declare(
        Method::POST,
        "/api/auth/mfa/verify",
        RouteRequirement::public(),
    );
    table.declare(
        Method::POST,
        "/api/auth/mfa/disable",
        RouteRequirement::public(),
    );
    table.declare(
        Method::POST,
        "/api/auth/mfa/reset/{id}",
        RouteRequirement::roles(&[codes::ADMIN]),
    );
}
