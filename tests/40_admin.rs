mod common;

use axum::http::StatusCode;
use serde_json::json;

async fn admin_portal() -> (common::TestPortal, String, i64) {
    let portal = common::portal().await;
    let id = common::seed_user(
        &portal.state,
        "admin@example.com",
        "pw",
        (false, false, true, false),
    )
    .await;
    let token = common::token_for(id, "admin@example.com");
    (portal, token, id)
}

#[tokio::test]
async fn user_management_lifecycle() {
    let (portal, token, _) = admin_portal().await;

    let (status, user) = common::post(
        &portal.app,
        "/api/admin/users",
        Some(&token),
        json!({
            "email": "new@example.com",
            "password": "changeme",
            "display_name": "New Person",
            "is_coach": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "new@example.com");
    assert_eq!(user["is_coach"], true);
    // Password hashes never leave the server
    assert!(user.get("password_hash").is_none());
    let user_id = user["id"].as_i64().unwrap();

    let (status, body) = common::post(
        &portal.app,
        "/api/admin/users",
        Some(&token),
        json!({
            "email": "new@example.com",
            "password": "changeme",
            "display_name": "Duplicate"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    // The new account can log in straight away
    let (status, login) = common::post(
        &portal.app,
        "/api/auth/login",
        None,
        json!({ "email": "new@example.com", "password": "changeme" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(login["token"].is_string());

    let (status, updated) = common::put(
        &portal.app,
        &format!("/api/admin/users/{user_id}/roles"),
        Some(&token),
        json!({ "is_lead": true, "is_coach": false }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_lead"], true);
    assert_eq!(updated["is_coach"], false);

    let (status, _) = common::delete(
        &portal.app,
        &format!("/api/admin/users/{user_id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A soft-deleted account no longer authenticates
    let stale = common::token_for(user_id, "new@example.com");
    let (status, body) = common::get(&portal.app, "/api/auth/me", Some(&stale)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn admins_cannot_delete_themselves() {
    let (portal, token, admin_id) = admin_portal().await;
    let (status, body) = common::delete(
        &portal.app,
        &format!("/api/admin/users/{admin_id}"),
        Some(&token),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete your own account");
}

#[tokio::test]
async fn backup_writes_an_independent_snapshot() {
    let (portal, token, _) = admin_portal().await;
    let destination = portal.dir.path().join("backups/snapshot.db");

    let (status, body) = common::post(
        &portal.app,
        "/api/admin/backup",
        Some(&token),
        json!({ "destination": destination.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Backup created");
    assert!(destination.is_file());
}

#[tokio::test]
async fn database_switch_repoints_the_live_service() {
    let (portal, token, _) = admin_portal().await;
    let next = portal.dir.path().join("fresh.db");

    let (status, body) = common::post(
        &portal.app,
        "/api/admin/database/switch",
        Some(&token),
        json!({ "path": next.to_str().unwrap() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Database switched");

    // The fresh store was migrated but holds no accounts, so the old
    // token no longer resolves to a user
    let (status, _) = common::get(&portal.app, "/api/admin/users", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The service itself stays healthy on the new file
    let (status, health) = common::get(&portal.app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], "ok");
}
