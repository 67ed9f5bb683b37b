use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::hash_password;
use crate::database::models::User;
use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub is_coach: bool,
    #[serde(default)]
    pub is_lead: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_manager: bool,
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoles {
    pub is_coach: Option<bool>,
    pub is_lead: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_manager: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BackupRequest {
    pub destination: String,
}

#[derive(Debug, Deserialize)]
pub struct SwitchRequest {
    pub path: String,
}

/// GET /api/admin/users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let pool = state.db.pool().await?;
    let users =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE deleted_at IS NULL ORDER BY email")
            .fetch_all(&pool)
            .await?;
    Ok(Json(users))
}

/// POST /api/admin/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let pool = state.db.pool().await?;
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
        .bind(body.email.trim())
        .fetch_one(&pool)
        .await?;
    if existing > 0 {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(&body.password).map_err(|e| {
        tracing::error!("Password hashing failed: {}", e);
        ApiError::internal_server_error("Could not create user")
    })?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users \
            (email, password_hash, display_name, is_coach, is_lead, is_admin, is_manager, \
             external_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9) RETURNING *",
    )
    .bind(body.email.trim())
    .bind(password_hash)
    .bind(&body.display_name)
    .bind(body.is_coach)
    .bind(body.is_lead)
    .bind(body.is_admin)
    .bind(body.is_manager)
    .bind(&body.external_id)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await?;

    tracing::info!("Admin created user {}", user.email);
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /api/admin/users/:id/roles - roles are mutated only here.
pub async fn update_roles(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateRoles>,
) -> ApiResult<User> {
    let now = Utc::now();
    let user = state
        .db
        .execute_with_retry(|pool| {
            let body = body.clone();
            async move {
                sqlx::query_as::<_, User>(
                    "UPDATE users SET \
                        is_coach = COALESCE(?2, is_coach), \
                        is_lead = COALESCE(?3, is_lead), \
                        is_admin = COALESCE(?4, is_admin), \
                        is_manager = COALESCE(?5, is_manager), \
                        updated_at = ?6 \
                     WHERE id = ?1 AND deleted_at IS NULL RETURNING *",
                )
                .bind(id)
                .bind(body.is_coach)
                .bind(body.is_lead)
                .bind(body.is_admin)
                .bind(body.is_manager)
                .bind(now)
                .fetch_optional(&pool)
                .await
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(user))
}

/// DELETE /api/admin/users/:id - soft delete; accounts are never removed.
pub async fn remove_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    if principal.id == id {
        return Err(ApiError::bad_request("Cannot delete your own account"));
    }

    let now = Utc::now();
    let affected = state
        .db
        .execute_with_retry(|pool| async move {
            sqlx::query("UPDATE users SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL")
                .bind(id)
                .bind(now)
                .execute(&pool)
                .await
                .map(|r| r.rows_affected())
        })
        .await?;

    if affected == 0 {
        return Err(ApiError::not_found("User not found"));
    }
    Ok(Json(json!({ "message": "User deleted" })))
}

/// POST /api/admin/backup - snapshot the live store to a new file.
pub async fn backup(
    State(state): State<AppState>,
    Json(body): Json<BackupRequest>,
) -> ApiResult<Value> {
    let path = state.db.backup(body.destination).await?;
    Ok(Json(json!({
        "message": "Backup created",
        "path": path
    })))
}

/// POST /api/admin/database/switch - point the live service at a different
/// data file without a restart.
pub async fn switch_database(
    State(state): State<AppState>,
    Json(body): Json<SwitchRequest>,
) -> ApiResult<Value> {
    state.db.switch_path(body.path).await?;
    let path = state.db.path().await;
    Ok(Json(json!({
        "message": "Database switched",
        "path": path
    })))
}
