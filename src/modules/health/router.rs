use axum::Router;
use axum::http::Method;
use axum::routing::get;

use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

pub fn init_health_router() -> Router<AppState> {
    Router::new().route("/health", get(controller::health))
}

pub fn declare_routes(table: &mut RouteTable) {
    // Liveness probes carry no tenant header; skip tenant resolution.
    table.declare(
        Method::GET,
        "/health",
        RouteRequirement::public().opt_out_tenant(),
    );
}
