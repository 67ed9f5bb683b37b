#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use kcs_portal::auth::{generate_jwt, Claims};
use kcs_portal::database::Database;
use kcs_portal::{app, AppState};

/// An in-process portal backed by a throwaway database file.
pub struct TestPortal {
    pub app: Router,
    pub state: AppState,
    pub dir: tempfile::TempDir,
}

pub async fn portal() -> TestPortal {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path().join("portal.db"))
        .await
        .expect("open database");
    db.run_migrations().await.expect("migrations");
    let state = AppState { db: Arc::new(db) };
    TestPortal {
        app: app(state.clone()),
        state,
        dir,
    }
}

/// Insert a user directly; role flags in order coach, lead, admin, manager.
pub async fn seed_user(
    state: &AppState,
    email: &str,
    password: &str,
    roles: (bool, bool, bool, bool),
) -> i64 {
    let (is_coach, is_lead, is_admin, is_manager) = roles;
    // Low bcrypt cost keeps the suite fast
    let hash = bcrypt::hash(password, 4).expect("hash");
    let pool = state.db.pool().await.expect("pool");
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users \
            (email, password_hash, display_name, is_coach, is_lead, is_admin, is_manager, \
             created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) RETURNING id",
    )
    .bind(email)
    .bind(hash)
    .bind(email)
    .bind(is_coach)
    .bind(is_lead)
    .bind(is_admin)
    .bind(is_manager)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .expect("seed user")
}

pub async fn seed_engineer(state: &AppState, name: &str) -> i64 {
    let pool = state.db.pool().await.expect("pool");
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO engineers (name, is_active, created_at, updated_at) \
         VALUES (?1, 1, ?2, ?2) RETURNING id",
    )
    .bind(name)
    .bind(chrono::Utc::now())
    .fetch_one(&pool)
    .await
    .expect("seed engineer")
}

pub fn token_for(id: i64, email: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: id,
        email: email.to_string(),
        iat: now,
        exp: now + 3600,
    };
    generate_jwt(&claims).expect("token")
}

/// Drive one request through the router and decode the JSON body.
pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    request(app, Method::GET, uri, token, None).await
}

pub async fn post(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    request(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: Value,
) -> (StatusCode, Value) {
    request(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    request(app, Method::DELETE, uri, token, None).await
}
