use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub active_engineers: i64,
    pub active_assignments: i64,
    pub evaluations: i64,
    pub cases_reviewed: i64,
    pub kb_candidates: i64,
}

/// GET /api/dashboard - headline counts for the landing page.
pub async fn summary(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    let pool = state.db.pool().await?;

    let active_engineers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM engineers WHERE is_active = 1")
            .fetch_one(&pool)
            .await?;
    let active_assignments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM coach_assignments WHERE end_date IS NULL")
            .fetch_one(&pool)
            .await?;
    let evaluations: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM evaluations WHERE deleted_at IS NULL")
            .fetch_one(&pool)
            .await?;
    let cases_reviewed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM case_evaluations WHERE deleted_at IS NULL")
            .fetch_one(&pool)
            .await?;
    let kb_candidates: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM case_evaluations WHERE deleted_at IS NULL AND kb_potential = 1",
    )
    .fetch_one(&pool)
    .await?;

    Ok(Json(DashboardSummary {
        active_engineers,
        active_assignments,
        evaluations,
        cases_reviewed,
        kb_candidates,
    }))
}
