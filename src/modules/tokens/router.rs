use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};

use crate::config::roles::codes;
use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

/// Nested under `/api`.
pub fn init_tokens_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tokens",
            get(controller::list).post(controller::create),
        )
        .route(
            "/tokens/{id}",
            get(controller::find_one)
                .patch(controller::update)
                .delete(controller::remove),
        )
        .route("/tokens/{id}/block", post(controller::block))
        .route("/tokens/{id}/unblock", post(controller::unblock))
}

pub fn declare_routes(table: &mut RouteTable) {
    let admin = || RouteRequirement::roles(&[codes::ADMIN]);
    let staff = || RouteRequirement::roles(&[codes::ADMIN, codes::BACKOFFICE]);

    // Lifecycle changes are admin-only; inspection and blocking are open to
    // backoffice as well.
    table.declare(Method::GET, "/api/tokens", staff());
    table.declare(Method::POST, "/api/tokens", admin());
    table.declare(Method::GET, "/api/tokens/{id}", staff());
    table.declare(Method::PATCH, "/api/tokens/{id}", admin());
    table.declare(Method::DELETE, "/api/tokens/{id}", admin());
    table.declare(Method::POST, "/api/tokens/{id}/block", staff());
    table.declare(Method::POST, "/api/tokens/{id}/unblock", staff());
}
