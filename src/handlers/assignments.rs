use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::database::models::CoachAssignment;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `is_active` is derived, not stored: an assignment is live while its
/// `end_date` is null.
pub const ASSIGNMENT_COLUMNS: &str = "id, engineer_id, coach_id, start_date, end_date, \
     (end_date IS NULL) AS is_active, created_at";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub engineer_id: Option<i64>,
    pub coach_id: Option<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignment {
    pub engineer_id: i64,
    pub coach_id: i64,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct EndAssignment {
    pub end_date: Option<NaiveDate>,
}

/// GET /api/assignments (lead)
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<CoachAssignment>> {
    let pool = state.db.pool().await?;
    let assignments = sqlx::query_as::<_, CoachAssignment>(&format!(
        "SELECT {ASSIGNMENT_COLUMNS} FROM coach_assignments \
         WHERE (?1 IS NULL OR engineer_id = ?1) \
           AND (?2 IS NULL OR coach_id = ?2) \
           AND (?3 IS NULL OR (end_date IS NULL) = ?3) \
         ORDER BY start_date DESC"
    ))
    .bind(query.engineer_id)
    .bind(query.coach_id)
    .bind(query.active)
    .fetch_all(&pool)
    .await?;
    Ok(Json(assignments))
}

/// POST /api/assignments (lead)
///
/// One engineer may hold at most one active assignment per coach; the
/// schema does not enforce this, so it is checked here before the insert.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAssignment>,
) -> Result<(StatusCode, Json<CoachAssignment>), ApiError> {
    let pool = state.db.pool().await?;

    let engineer_active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM engineers WHERE id = ?1")
            .bind(body.engineer_id)
            .fetch_optional(&pool)
            .await?;
    match engineer_active {
        None => return Err(ApiError::not_found("Engineer not found")),
        Some(false) => return Err(ApiError::bad_request("Engineer is not active")),
        Some(true) => {}
    }

    let already_active: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM coach_assignments \
         WHERE engineer_id = ?1 AND coach_id = ?2 AND end_date IS NULL",
    )
    .bind(body.engineer_id)
    .bind(body.coach_id)
    .fetch_one(&pool)
    .await?;
    if already_active > 0 {
        return Err(ApiError::conflict(
            "Engineer already has an active assignment with this coach",
        ));
    }

    let start_date = body.start_date.unwrap_or_else(|| Utc::now().date_naive());
    let assignment = sqlx::query_as::<_, CoachAssignment>(&format!(
        "INSERT INTO coach_assignments (engineer_id, coach_id, start_date, created_at) \
         VALUES (?1, ?2, ?3, ?4) \
         RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(body.engineer_id)
    .bind(body.coach_id)
    .bind(start_date)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(assignment)))
}

/// PUT /api/assignments/:id/end (lead)
pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<EndAssignment>,
) -> ApiResult<CoachAssignment> {
    let pool = state.db.pool().await?;

    let current: Option<Option<NaiveDate>> =
        sqlx::query_scalar("SELECT end_date FROM coach_assignments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&pool)
            .await?;
    match current {
        None => return Err(ApiError::not_found("Assignment not found")),
        Some(Some(_)) => return Err(ApiError::conflict("Assignment already ended")),
        Some(None) => {}
    }

    let end_date = body.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let assignment = sqlx::query_as::<_, CoachAssignment>(&format!(
        "UPDATE coach_assignments SET end_date = ?2 WHERE id = ?1 \
         RETURNING {ASSIGNMENT_COLUMNS}"
    ))
    .bind(id)
    .bind(end_date)
    .fetch_one(&pool)
    .await?;

    Ok(Json(assignment))
}
