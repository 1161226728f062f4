use axum::Router;
use axum::http::Method;
use axum::routing::post;

use crate::config::roles::codes;
use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(controller::login))
        .route("/refresh", post(controller::refresh))
        .route("/logout", post(controller::logout))
        .route("/invalidate", post(controller::invalidate))
        .route("/users/{id}/block", post(controller::block_user))
        .route("/users/{id}/unblock", post(controller::unblock_user))
}

/// Route security declarations, registered once at startup.
pub fn declare_routes(table: &mut RouteTable) {
    table.declare(Method::POST, "/api/auth/login", RouteRequirement::public());
    table.declare(Method::POST, "/api/auth/refresh", RouteRequirement::public());
    table.declare(Method::POST, "/api/auth/logout", RouteRequirement::public());
    // Invalidation needs an authenticated user; the handler rejects
    // non-user subjects.
    table.declare(
        Method::POST,
        "/api/auth/invalidate",
        RouteRequirement::public(),
    );
    table.declare(
        Method::POST,
        "/api/auth/users/{id}/block",
        RouteRequirement::roles(&[codes::ADMIN, codes::BACKOFFICE]),
    );
    table.declare(
        Method::POST,
        "/api/auth/users/{id}/unblock",
        RouteRequirement::roles(&[codes::ADMIN, codes::BACKOFFICE]),
    );
}
