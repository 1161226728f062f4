use axum::Router;
use axum::http::Method;
use axum::routing::{get, post};

use crate::config::roles::codes;
use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

/// Nested under `/api`. The prefix is spelled out here so matched paths and
/// the declarations below stay aligned.
pub fn init_tenants_router() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants",
            get(controller::list).post(controller::create),
        )
        .route(
            "/tenants/{id}",
            get(controller::find_one)
                .patch(controller::update)
                .delete(controller::archive),
        )
        .route("/tenants/{id}/restore", post(controller::restore))
        .route("/tenants/impersonate", post(controller::impersonate))
}

pub fn declare_routes(table: &mut RouteTable) {
    let admin = || RouteRequirement::roles(&[codes::ADMIN]);

    table.declare(Method::GET, "/api/tenants", admin());
    table.declare(Method::POST, "/api/tenants", admin());
    table.declare(Method::GET, "/api/tenants/{id}", admin());
    table.declare(Method::PATCH, "/api/tenants/{id}", admin());
    table.declare(Method::DELETE, "/api/tenants/{id}", admin());
    table.declare(Method::POST, "/api/tenants/{id}/restore", admin());
    table.declare(Method::POST, "/api/tenants/impersonate", admin());
}
