//! Tenant resolution strategies, tenant standing, and credential/tenant
//! binding with multi-tenancy enabled.

mod common;

use axum::http::StatusCode;
use common::*;
use palisade::config::tenancy::{TenancyConfig, TenantResolver};
use palisade::providers::TenantStatus;
use palisade::utils::jwt::mint_credential;

#[tokio::test]
async fn missing_tenant_header_is_rejected() {
    let dir = MockDirectory::new();
    dir.add_tenant("acme", TenantStatus::Active);
    let app = app(test_state(&dir, multi_tenant_header()));

    let (status, body) = send(&app, get("/api/me")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TENANT_MISSING");
}

#[tokio::test]
async fn unknown_tenant_slug_is_rejected() {
    let dir = MockDirectory::new();
    let app = app(test_state(&dir, multi_tenant_header()));

    let (status, body) = send(&app, get_with("/api/me", &[("x-tenant-id", "ghost")])).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "TENANT_NOT_FOUND");
}

#[tokio::test]
async fn inactive_tenant_is_rejected() {
    let dir = MockDirectory::new();
    dir.add_tenant("dormant", TenantStatus::Suspended);
    dir.add_tenant("gone", TenantStatus::Archived);
    let app = app(test_state(&dir, multi_tenant_header()));

    for slug in ["dormant", "gone"] {
        let (status, body) = send(&app, get_with("/api/me", &[("x-tenant-id", slug)])).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "TENANT_INACTIVE");
    }
}

#[tokio::test]
async fn tenant_resolution_is_idempotent() {
    let dir = MockDirectory::new();
    dir.add_tenant("acme", TenantStatus::Active);
    let app = app(test_state(&dir, multi_tenant_header()));

    let (status_a, body_a) = send(&app, get_with("/api/me", &[("x-tenant-id", "acme")])).await;
    let (status_b, body_b) = send(&app, get_with("/api/me", &[("x-tenant-id", "acme")])).await;

    assert_eq!(status_a, StatusCode::OK);
    assert_eq!(status_b, StatusCode::OK);
    assert_eq!(body_a, body_b);
    assert_eq!(body_a["tenant"], "acme");

    // Resolution never mutates tenant state.
    assert_eq!(dir.tenants.lock().unwrap().len(), 1);
    assert_eq!(dir.tenants.lock().unwrap()[0].status, TenantStatus::Active);
}

#[tokio::test]
async fn credential_bound_to_another_tenant_is_rejected() {
    let dir = MockDirectory::new();
    let acme = dir.add_tenant("acme", TenantStatus::Active);
    dir.add_tenant("globex", TenantStatus::Active);
    dir.add_user("user@acme.io", &["admin"], "pw");

    let state = test_state(&dir, multi_tenant_header());
    let token = mint_credential(
        &dir.external_id_of("user@acme.io"),
        Some(&acme.id.to_string()),
        &state.jwt_config,
    )
    .unwrap();
    let app = app(state);

    let (status, body) = send(
        &app,
        get_with(
            "/api/me",
            &[("x-tenant-id", "globex"), ("authorization", &bearer(&token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "TENANT_MISMATCH");

    // Same credential on its own tenant is fine.
    let (status, body) = send(
        &app,
        get_with(
            "/api/me",
            &[("x-tenant-id", "acme"), ("authorization", &bearer(&token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], "acme");
}

#[tokio::test]
async fn credential_without_tenant_claim_passes_any_tenant() {
    let dir = MockDirectory::new();
    dir.add_tenant("acme", TenantStatus::Active);
    dir.add_user("user@acme.io", &[], "pw");

    let state = test_state(&dir, multi_tenant_header());
    let token = mint_credential(
        &dir.external_id_of("user@acme.io"),
        None,
        &state.jwt_config,
    )
    .unwrap();
    let app = app(state);

    let (status, _) = send(
        &app,
        get_with(
            "/api/me",
            &[("x-tenant-id", "acme"), ("authorization", &bearer(&token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn subdomain_resolver_uses_host_header() {
    let dir = MockDirectory::new();
    dir.add_tenant("acme", TenantStatus::Active);

    let mut tenancy = multi_tenant_header();
    tenancy.resolver = TenantResolver::Subdomain;
    let app = app(test_state(&dir, tenancy));

    let (status, body) = send(
        &app,
        get_with("/api/me", &[("host", "acme.example.com")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], "acme");

    let (status, body) = send(&app, get_with("/api/me", &[("host", "www.example.com")])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TENANT_MISSING");
}

#[tokio::test]
async fn query_resolver_uses_configured_parameter() {
    let dir = MockDirectory::new();
    dir.add_tenant("acme", TenantStatus::Active);

    let mut tenancy = multi_tenant_header();
    tenancy.resolver = TenantResolver::Query;
    let app = app(test_state(&dir, tenancy));

    let (status, body) = send(&app, get("/api/me?tid=acme")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tenant"], "acme");

    let (status, _) = send(&app, get("/api/me")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn opted_out_route_skips_tenant_resolution() {
    let dir = MockDirectory::new();
    let app = app(test_state(&dir, multi_tenant_header()));

    // /health declares tenant opt-out; no header required even with
    // multi-tenancy on.
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn single_tenant_mode_never_resolves_tenants() {
    let dir = MockDirectory::new();
    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (status, body) = send(&app, get("/api/me")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("tenant").is_none());
}
