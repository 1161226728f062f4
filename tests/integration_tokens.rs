//! Machine-token lifecycle through the API: creation mints a credential,
//! blocking kills it, unblocking revives it.

mod common;

use axum::http::StatusCode;
use common::*;
use palisade::config::tenancy::TenancyConfig;
use palisade::utils::jwt::mint_credential;

fn admin_app(dir: &std::sync::Arc<MockDirectory>) -> (axum::Router, String) {
    dir.add_user("admin@example.com", &["admin"], "pw");
    let state = test_state(dir, TenancyConfig::disabled());
    let token = mint_credential(
        &dir.external_id_of("admin@example.com"),
        None,
        &state.jwt_config,
    )
    .unwrap();
    (app(state), token)
}

#[tokio::test]
async fn created_token_credential_authenticates_with_granted_roles() {
    let dir = MockDirectory::new();
    let (app, admin_token) = admin_app(&dir);

    let (status, body) = send(
        &app,
        post_json(
            "/api/tokens",
            serde_json::json!({
                "name": "ci-bot",
                // Unknown codes are dropped; public is always granted.
                "roles": ["backoffice", "superuser"],
            }),
            &[("authorization", &bearer(&admin_token))],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "ci-bot");
    let roles = body["roles"].as_array().unwrap();
    assert!(roles.contains(&serde_json::json!("backoffice")));
    assert!(roles.contains(&serde_json::json!("public")));
    assert!(!roles.contains(&serde_json::json!("superuser")));

    let credential = body["token"].as_str().unwrap().to_string();
    let (status, me) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&credential))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["kind"], "token");
}

#[tokio::test]
async fn blocked_token_credential_stops_working_until_unblocked() {
    let dir = MockDirectory::new();
    let (app, admin_token) = admin_app(&dir);

    let (_, created) = send(
        &app,
        post_json(
            "/api/tokens",
            serde_json::json!({ "name": "ci-bot", "roles": [] }),
            &[("authorization", &bearer(&admin_token))],
        ),
    )
    .await;
    let credential = created["token"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/tokens/{id}/block"),
            serde_json::json!({ "reason": "leaked" }),
            &[("authorization", &bearer(&admin_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&credential))]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "TOKEN_NOT_VALID");

    let (status, _) = send(
        &app,
        post_json(
            &format!("/api/tokens/{id}/unblock"),
            serde_json::json!({}),
            &[("authorization", &bearer(&admin_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&credential))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn removed_token_credential_dangles() {
    let dir = MockDirectory::new();
    let (app, admin_token) = admin_app(&dir);

    let (_, created) = send(
        &app,
        post_json(
            "/api/tokens",
            serde_json::json!({ "name": "short-lived", "roles": [] }),
            &[("authorization", &bearer(&admin_token))],
        ),
    )
    .await;
    let credential = created["token"].as_str().unwrap().to_string();
    let id = created["id"].as_str().unwrap().to_string();

    let request = axum::http::Request::builder()
        .method("DELETE")
        .uri(format!("/api/tokens/{id}"))
        .header("authorization", bearer(&admin_token))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    // A credential for a deleted subject is SUBJECT_NOT_FOUND, not anonymous.
    let (status, body) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&credential))]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SUBJECT_NOT_FOUND");
}

#[tokio::test]
async fn backoffice_can_inspect_but_not_create() {
    let dir = MockDirectory::new();
    dir.add_user("staff@example.com", &["backoffice"], "pw");
    let state = test_state(&dir, TenancyConfig::disabled());
    let staff_token = mint_credential(
        &dir.external_id_of("staff@example.com"),
        None,
        &state.jwt_config,
    )
    .unwrap();
    let app = app(state);

    let (status, _) = send(
        &app,
        get_with("/api/tokens", &[("authorization", &bearer(&staff_token))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json(
            "/api/tokens",
            serde_json::json!({ "name": "nope", "roles": [] }),
            &[("authorization", &bearer(&staff_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}
