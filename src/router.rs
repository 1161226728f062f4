use axum::http::{HeaderValue, Method};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;

use crate::logging::logging_middleware;
use crate::middleware::pipeline::security_pipeline;
use crate::middleware::requirement::RouteTable;
use crate::modules::auth::router::init_auth_router;
use crate::modules::health::router::init_health_router;
use crate::modules::me::router::init_me_router;
use crate::modules::mfa::router::init_mfa_router;
use crate::modules::tenants::router::init_tenants_router;
use crate::modules::tokens::router::init_tokens_router;
use crate::modules::{auth, health, me, mfa, tenants, tokens};
use crate::state::AppState;

/// Builds the route-requirement table: one declaration per route, collected
/// from each module at startup and read-only afterwards.
fn init_route_table() -> RouteTable {
    let mut table = RouteTable::default();
    health::router::declare_routes(&mut table);
    auth::router::declare_routes(&mut table);
    mfa::router::declare_routes(&mut table);
    me::router::declare_routes(&mut table);
    tenants::router::declare_routes(&mut table);
    tokens::router::declare_routes(&mut table);
    table
}

pub fn init_router(state: AppState) -> Router {
    let state = state.with_routes(init_route_table());

    let allowed_origins: Vec<HeaderValue> = std::env::var("CORS_ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    Router::new()
        .merge(init_health_router())
        .nest(
            "/api",
            Router::new()
                .nest(
                    "/auth",
                    init_auth_router().nest("/mfa", init_mfa_router()),
                )
                .merge(init_me_router())
                .merge(init_tenants_router())
                .merge(init_tokens_router()),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_pipeline,
        ))
        .layer(middleware::from_fn(logging_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                ])
                .allow_credentials(true),
        )
        .with_state(state)
}
