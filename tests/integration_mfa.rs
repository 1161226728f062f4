//! Login flow, MFA interception, and the pre-auth confinement gate.

mod common;

use axum::http::StatusCode;
use common::*;
use palisade::config::mfa::MfaPolicy;
use palisade::config::tenancy::TenancyConfig;
use palisade::modules::mfa::service::MfaService;
use totp_rs::{Algorithm, Secret, TOTP};

fn current_code(secret_encoded: &str) -> String {
    let bytes = Secret::Encoded(secret_encoded.to_string())
        .to_bytes()
        .unwrap();
    TOTP::new(Algorithm::SHA1, 6, 1, 30, bytes, None, "test".to_string())
        .unwrap()
        .generate_current()
        .unwrap()
}

fn login_body(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password })
}

#[tokio::test]
async fn login_without_mfa_returns_full_tokens() {
    let dir = MockDirectory::new();
    dir.add_user("plain@example.com", &["backoffice"], "hunter2pass");
    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("plain@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert!(!body["refresh_token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["email"], "plain@example.com");

    let (status, me) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&token))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["kind"], "user");
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let dir = MockDirectory::new();
    dir.add_user("plain@example.com", &[], "hunter2pass");
    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("plain@example.com", "wrong-password"),
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unconfirmed_user_cannot_login() {
    let dir = MockDirectory::new();
    dir.add_user("new@example.com", &[], "hunter2pass");
    dir.set_confirmed("new@example.com", false);
    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("new@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "User email unconfirmed");
}

#[tokio::test]
async fn enrolled_user_login_returns_mfa_challenge() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &["admin"], "hunter2pass");
    let setup = MfaService::generate_setup("Palisade", "secure@example.com").unwrap();
    dir.set_mfa_enrolled("secure@example.com", &setup.secret);

    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("secure@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;

    // 202: password accepted, second factor pending.
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["mfa_required"], true);
    assert_eq!(body["mfa_setup_required"], false);
    assert!(!body["temp_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn mandatory_policy_forces_setup_for_unenrolled_users() {
    let dir = MockDirectory::new();
    dir.add_user("fresh@example.com", &[], "hunter2pass");

    let mut state = test_state(&dir, TenancyConfig::disabled());
    state.mfa_config.policy = MfaPolicy::Mandatory;
    let app = app(state);

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("fresh@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["mfa_required"], false);
    assert_eq!(body["mfa_setup_required"], true);
}

#[tokio::test]
async fn pre_auth_credential_is_confined_before_rbac() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &["admin"], "hunter2pass");
    let setup = MfaService::generate_setup("Palisade", "secure@example.com").unwrap();
    dir.set_mfa_enrolled("secure@example.com", &setup.secret);

    let state = test_state(&dir, TenancyConfig::disabled());
    let metrics = state.metrics.clone();
    let app = app(state);

    let (_, challenge) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("secure@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    let temp_token = challenge["temp_token"].as_str().unwrap().to_string();

    // The subject holds the admin role, so if RBAC ran it would pass; the
    // MFA gate must fire first and RBAC must never be evaluated.
    let rbac_before = metrics.rbac_evaluations();
    let (status, body) = send(
        &app,
        get_with("/api/tenants", &[("authorization", &bearer(&temp_token))]),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "MFA_REQUIRED");
    assert_eq!(metrics.rbac_evaluations(), rbac_before);

    // Public routes outside the allow-list are confined as well.
    let (status, body) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&temp_token))]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "MFA_REQUIRED");
}

#[tokio::test]
async fn pre_auth_credential_reaches_allowlisted_endpoints() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &[], "hunter2pass");
    let setup = MfaService::generate_setup("Palisade", "secure@example.com").unwrap();
    dir.set_mfa_enrolled("secure@example.com", &setup.secret);

    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (_, challenge) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("secure@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    let temp_token = challenge["temp_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/mfa/setup",
            serde_json::json!({}),
            &[("authorization", &bearer(&temp_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["secret"].as_str().unwrap().is_empty());

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/logout",
            serde_json::json!({}),
            &[("authorization", &bearer(&temp_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn verify_transitions_pre_auth_to_full() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &["admin"], "hunter2pass");
    let setup = MfaService::generate_setup("Palisade", "secure@example.com").unwrap();
    dir.set_mfa_enrolled("secure@example.com", &setup.secret);

    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (_, challenge) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("secure@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    let temp_token = challenge["temp_token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/mfa/verify",
            serde_json::json!({ "code": current_code(&setup.secret) }),
            &[("authorization", &bearer(&temp_token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    // The returned credential is full: role checks now apply normally.
    let full_token = body["token"].as_str().unwrap().to_string();
    let (status, me) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&full_token))]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["kind"], "user");
    assert_eq!(me["roles"], serde_json::json!(["admin"]));
}

#[tokio::test]
async fn verify_with_wrong_code_is_rejected() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &[], "hunter2pass");
    let setup = MfaService::generate_setup("Palisade", "secure@example.com").unwrap();
    dir.set_mfa_enrolled("secure@example.com", &setup.secret);

    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (_, challenge) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("secure@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    let temp_token = challenge["temp_token"].as_str().unwrap().to_string();

    // Two fixed codes cannot both match the current window.
    let mut rejected = 0;
    for code in ["000000", "111111"] {
        let (status, _) = send(
            &app,
            post_json(
                "/api/auth/mfa/verify",
                serde_json::json!({ "code": code }),
                &[("authorization", &bearer(&temp_token))],
            ),
        )
        .await;
        if status == StatusCode::FORBIDDEN {
            rejected += 1;
        }
    }
    assert!(rejected >= 1);
}

#[tokio::test]
async fn invalidate_rotates_external_id_and_kills_credentials() {
    let dir = MockDirectory::new();
    dir.add_user("plain@example.com", &[], "hunter2pass");
    let app = app(test_state(&dir, TenancyConfig::disabled()));

    let (_, login) = send(
        &app,
        post_json(
            "/api/auth/login",
            login_body("plain@example.com", "hunter2pass"),
            &[],
        ),
    )
    .await;
    let token = login["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post_json(
            "/api/auth/invalidate",
            serde_json::json!({}),
            &[("authorization", &bearer(&token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    // The old credential now points at a rotated external id.
    let (status, body) = send(
        &app,
        get_with("/api/me", &[("authorization", &bearer(&token))]),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SUBJECT_NOT_FOUND");
}

#[tokio::test]
async fn disable_is_refused_under_one_way_policy() {
    let dir = MockDirectory::new();
    dir.add_user("secure@example.com", &[], "hunter2pass");

    let mut state = test_state(&dir, TenancyConfig::disabled());
    state.mfa_config.policy = MfaPolicy::OneWay;
    let token = palisade::utils::jwt::mint_credential(
        &dir.external_id_of("secure@example.com"),
        None,
        &state.jwt_config,
    )
    .unwrap();
    let app = app(state);

    let (status, _) = send(
        &app,
        post_json(
            "/api/auth/mfa/disable",
            serde_json::json!({}),
            &[("authorization", &bearer(&token))],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
