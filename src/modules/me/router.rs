use axum::Router;
use axum::http::Method;
use axum::routing::get;

use crate::middleware::requirement::{RouteRequirement, RouteTable};
use crate::state::AppState;

use super::controller;

pub fn init_me_router() -> Router<AppState> {
    Router::new().route("/me", get(controller::me))
}

pub fn declare_routes(table: &mut RouteTable) {
    // Anonymous callers get a valid answer too: kind=anonymous, [public].
    table.declare(Method::GET, "/api/me", RouteRequirement::public());
}
