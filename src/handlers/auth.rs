use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, verify_password, Claims};
use crate::database::models::User;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/login - verify credentials and mint a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Value> {
    let pool = state.db.pool().await?;

    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1 AND deleted_at IS NULL")
            .bind(&body.email)
            .fetch_optional(&pool)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = generate_jwt(&Claims::new(&user)).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Could not create session")
    })?;

    tracing::info!("User {} logged in", user.email);
    Ok(Json(json!({
        "token": token,
        "user": Principal::from(user)
    })))
}

/// POST /api/auth/logout - sessions are stateless JWTs; the client discards
/// its copy and the endpoint exists so the frontend has a uniform call.
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "Logged out" }))
}

/// GET /api/auth/me
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}
