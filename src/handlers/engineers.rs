use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::database::models::{CoachAssignment, Engineer};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

use super::assignments::ASSIGNMENT_COLUMNS;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct EngineerDetail {
    #[serde(flatten)]
    pub engineer: Engineer,
    pub assignments: Vec<CoachAssignment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEngineer {
    pub name: String,
    pub lead_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEngineer {
    pub name: Option<String>,
    pub lead_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// GET /api/engineers
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Engineer>> {
    let pool = state.db.pool().await?;
    let engineers = sqlx::query_as::<_, Engineer>(
        "SELECT * FROM engineers WHERE (?1 IS NULL OR is_active = ?1) ORDER BY name",
    )
    .bind(query.active)
    .fetch_all(&pool)
    .await?;
    Ok(Json(engineers))
}

/// GET /api/engineers/:id - engineer plus their coach assignments
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<EngineerDetail> {
    let pool = state.db.pool().await?;

    let engineer = sqlx::query_as::<_, Engineer>("SELECT * FROM engineers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Engineer not found"))?;

    let assignments = sqlx::query_as::<_, CoachAssignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM coach_assignments \
         WHERE engineer_id = ?1 ORDER BY start_date DESC"
    ))
    .bind(id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(EngineerDetail {
        engineer,
        assignments,
    }))
}

/// POST /api/engineers (lead)
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateEngineer>,
) -> Result<(StatusCode, Json<Engineer>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("Engineer name is required"));
    }

    let now = Utc::now();
    let engineer = state
        .db
        .execute_with_retry(|pool| {
            let body = body.clone();
            async move {
                sqlx::query_as::<_, Engineer>(
                    "INSERT INTO engineers (name, lead_id, is_active, created_at, updated_at) \
                     VALUES (?1, ?2, 1, ?3, ?3) RETURNING *",
                )
                .bind(body.name.trim())
                .bind(body.lead_id)
                .bind(now)
                .fetch_one(&pool)
                .await
            }
        })
        .await?;

    Ok((StatusCode::CREATED, Json(engineer)))
}

/// PUT /api/engineers/:id (lead)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEngineer>,
) -> ApiResult<Engineer> {
    let now = Utc::now();
    let engineer = state
        .db
        .execute_with_retry(|pool| {
            let body = body.clone();
            async move {
                sqlx::query_as::<_, Engineer>(
                    "UPDATE engineers SET \
                        name = COALESCE(?2, name), \
                        lead_id = COALESCE(?3, lead_id), \
                        is_active = COALESCE(?4, is_active), \
                        updated_at = ?5 \
                     WHERE id = ?1 RETURNING *",
                )
                .bind(id)
                .bind(body.name)
                .bind(body.lead_id)
                .bind(body.is_active)
                .bind(now)
                .fetch_optional(&pool)
                .await
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Engineer not found"))?;

    Ok(Json(engineer))
}

/// DELETE /api/engineers/:id (lead) - deactivates, never deletes
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Engineer> {
    let now = Utc::now();
    let engineer = state
        .db
        .execute_with_retry(|pool| async move {
            sqlx::query_as::<_, Engineer>(
                "UPDATE engineers SET is_active = 0, updated_at = ?2 WHERE id = ?1 RETURNING *",
            )
            .bind(id)
            .bind(now)
            .fetch_optional(&pool)
            .await
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Engineer not found"))?;

    Ok(Json(engineer))
}
