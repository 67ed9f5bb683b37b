mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let portal = common::portal().await;
    let (status, body) = common::get(&portal.app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn guarded_routes_return_401_without_token() {
    let portal = common::portal().await;

    for uri in ["/api/auth/me", "/api/dashboard", "/api/engineers", "/api/admin/users"] {
        let (status, body) = common::get(&portal.app, uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "No token provided", "{uri}");
    }
}

#[tokio::test]
async fn invalid_token_is_forbidden() {
    let portal = common::portal().await;
    let (status, body) = common::get(&portal.app, "/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn login_round_trip() {
    let portal = common::portal().await;
    common::seed_user(&portal.state, "coach@example.com", "hunter2", (true, false, false, false))
        .await;

    let (status, body) = common::post(
        &portal.app,
        "/api/auth/login",
        None,
        json!({ "email": "coach@example.com", "password": "hunter2" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "coach@example.com");
    assert_eq!(body["user"]["is_coach"], true);

    let token = body["token"].as_str().expect("token").to_string();
    let (status, me) = common::get(&portal.app, "/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "coach@example.com");
}

#[tokio::test]
async fn login_rejects_bad_password() {
    let portal = common::portal().await;
    common::seed_user(&portal.state, "coach@example.com", "hunter2", (true, false, false, false))
        .await;

    let (status, body) = common::post(
        &portal.app,
        "/api/auth/login",
        None,
        json!({ "email": "coach@example.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

#[tokio::test]
async fn logout_is_a_stateless_acknowledgement() {
    let portal = common::portal().await;
    let (status, body) =
        common::request(&portal.app, Method::POST, "/api/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");
}

#[tokio::test]
async fn admin_flag_alone_passes_the_admin_gate() {
    let portal = common::portal().await;
    let id = common::seed_user(
        &portal.state,
        "admin@example.com",
        "pw",
        (false, false, true, false),
    )
    .await;
    let token = common::token_for(id, "admin@example.com");

    let (status, _) = common::get(&portal.app, "/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn coach_only_user_is_refused_by_lead_gate() {
    let portal = common::portal().await;
    let id = common::seed_user(
        &portal.state,
        "coach@example.com",
        "pw",
        (true, false, false, false),
    )
    .await;
    let token = common::token_for(id, "coach@example.com");

    let (status, body) = common::post(
        &portal.app,
        "/api/engineers",
        Some(&token),
        json!({ "name": "New Engineer" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Lead access required");
}

#[tokio::test]
async fn admin_passes_lead_and_coach_gates() {
    let portal = common::portal().await;
    let id = common::seed_user(
        &portal.state,
        "admin@example.com",
        "pw",
        (false, false, true, false),
    )
    .await;
    let token = common::token_for(id, "admin@example.com");

    let (status, _) = common::post(
        &portal.app,
        "/api/engineers",
        Some(&token),
        json!({ "name": "Engineer via admin" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn manager_does_not_pass_the_admin_gate() {
    let portal = common::portal().await;
    let id = common::seed_user(
        &portal.state,
        "manager@example.com",
        "pw",
        (false, false, false, true),
    )
    .await;
    let token = common::token_for(id, "manager@example.com");

    let (status, body) = common::get(&portal.app, "/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");
}

#[tokio::test]
async fn reports_accept_any_of_the_listed_roles() {
    let portal = common::portal().await;
    let manager = common::seed_user(
        &portal.state,
        "manager@example.com",
        "pw",
        (false, false, false, true),
    )
    .await;
    let coach = common::seed_user(
        &portal.state,
        "coach@example.com",
        "pw",
        (true, false, false, false),
    )
    .await;

    let token = common::token_for(manager, "manager@example.com");
    let (status, _) = common::get(&portal.app, "/api/reports/engineers", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);

    let token = common::token_for(coach, "coach@example.com");
    let (status, body) = common::get(&portal.app, "/api/reports/engineers", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("admin") && message.contains("lead") && message.contains("manager"));
}
