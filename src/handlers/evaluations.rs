use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::{CaseEvaluation, Evaluation};
use crate::error::{ApiError, ApiResult};
use crate::middleware::Principal;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub engineer_id: Option<i64>,
    pub coach_id: Option<i64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationDetail {
    #[serde(flatten)]
    pub evaluation: Evaluation,
    pub cases: Vec<CaseEvaluation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEvaluation {
    pub engineer_id: i64,
    pub evaluation_date: NaiveDate,
    pub notes: Option<String>,
    #[serde(default)]
    pub cases: Vec<CaseInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseInput {
    pub case_number: String,
    #[serde(default)]
    pub kb_potential: bool,
    #[serde(default)]
    pub article_linked: bool,
    #[serde(default)]
    pub article_improved: bool,
    #[serde(default)]
    pub article_created: bool,
    #[serde(default)]
    pub improvement_opportunity: bool,
    #[serde(default)]
    pub properly_searched: bool,
    #[serde(default)]
    pub linked_correctly: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateEvaluation {
    pub evaluation_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCase {
    pub case_number: Option<String>,
    pub kb_potential: Option<bool>,
    pub article_linked: Option<bool>,
    pub article_improved: Option<bool>,
    pub article_created: Option<bool>,
    pub improvement_opportunity: Option<bool>,
    pub properly_searched: Option<bool>,
    pub linked_correctly: Option<bool>,
    pub notes: Option<String>,
}

/// GET /api/evaluations
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Evaluation>> {
    let pool = state.db.pool().await?;
    let evaluations = sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluations \
         WHERE deleted_at IS NULL \
           AND (?1 IS NULL OR engineer_id = ?1) \
           AND (?2 IS NULL OR coach_id = ?2) \
           AND (?3 IS NULL OR evaluation_date >= ?3) \
           AND (?4 IS NULL OR evaluation_date <= ?4) \
         ORDER BY evaluation_date DESC, id DESC",
    )
    .bind(query.engineer_id)
    .bind(query.coach_id)
    .bind(query.from)
    .bind(query.to)
    .fetch_all(&pool)
    .await?;
    Ok(Json(evaluations))
}

/// GET /api/evaluations/:id - evaluation plus its live case reviews
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<EvaluationDetail> {
    let pool = state.db.pool().await?;
    let evaluation = fetch_evaluation(&pool, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Evaluation not found"))?;
    let cases = fetch_cases(&pool, id).await?;
    Ok(Json(EvaluationDetail { evaluation, cases }))
}

/// POST /api/evaluations (coach)
///
/// The evaluation row and its case rows are written in one transaction;
/// a failed case insert must not leave a half-recorded session.
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateEvaluation>,
) -> Result<(StatusCode, Json<EvaluationDetail>), ApiError> {
    let pool = state.db.pool().await?;

    let engineer_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM engineers WHERE id = ?1")
        .bind(body.engineer_id)
        .fetch_one(&pool)
        .await?;
    if engineer_exists == 0 {
        return Err(ApiError::not_found("Engineer not found"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let evaluation = sqlx::query_as::<_, Evaluation>(
        "INSERT INTO evaluations \
            (engineer_id, coach_id, evaluation_date, notes, created_by, updated_by, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6, ?6) RETURNING *",
    )
    .bind(body.engineer_id)
    .bind(principal.id)
    .bind(body.evaluation_date)
    .bind(&body.notes)
    .bind(principal.id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut cases = Vec::with_capacity(body.cases.len());
    for case in &body.cases {
        let row = insert_case(&mut tx, evaluation.id, case, now).await?;
        cases.push(row);
    }

    tx.commit().await?;
    tracing::info!(
        "Coach {} recorded evaluation {} for engineer {}",
        principal.id,
        evaluation.id,
        evaluation.engineer_id
    );

    Ok((StatusCode::CREATED, Json(EvaluationDetail { evaluation, cases })))
}

/// PUT /api/evaluations/:id (coach)
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEvaluation>,
) -> ApiResult<Evaluation> {
    let now = Utc::now();
    let evaluation = state
        .db
        .execute_with_retry(|pool| {
            let body = body.clone();
            async move {
                sqlx::query_as::<_, Evaluation>(
                    "UPDATE evaluations SET \
                        evaluation_date = COALESCE(?2, evaluation_date), \
                        notes = COALESCE(?3, notes), \
                        updated_by = ?4, updated_at = ?5 \
                     WHERE id = ?1 AND deleted_at IS NULL RETURNING *",
                )
                .bind(id)
                .bind(body.evaluation_date)
                .bind(body.notes)
                .bind(principal.id)
                .bind(now)
                .fetch_optional(&pool)
                .await
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Evaluation not found"))?;

    Ok(Json(evaluation))
}

/// DELETE /api/evaluations/:id (coach) - soft delete
pub async fn remove(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let now = Utc::now();
    let affected = state
        .db
        .execute_with_retry(|pool| async move {
            sqlx::query(
                "UPDATE evaluations SET deleted_at = ?2, updated_by = ?3 \
                 WHERE id = ?1 AND deleted_at IS NULL",
            )
            .bind(id)
            .bind(now)
            .bind(principal.id)
            .execute(&pool)
            .await
            .map(|r| r.rows_affected())
        })
        .await?;

    if affected == 0 {
        return Err(ApiError::not_found("Evaluation not found"));
    }
    Ok(Json(serde_json::json!({ "message": "Evaluation deleted" })))
}

/// POST /api/evaluations/:id/cases (coach)
pub async fn add_case(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CaseInput>,
) -> Result<(StatusCode, Json<CaseEvaluation>), ApiError> {
    let pool = state.db.pool().await?;

    if fetch_evaluation(&pool, id).await?.is_none() {
        return Err(ApiError::not_found("Evaluation not found"));
    }

    let mut tx = pool.begin().await?;
    let case = insert_case(&mut tx, id, &body, Utc::now()).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(case)))
}

/// PUT /api/evaluations/cases/:id (coach)
pub async fn update_case(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCase>,
) -> ApiResult<CaseEvaluation> {
    let now = Utc::now();
    let case = state
        .db
        .execute_with_retry(|pool| {
            let body = body.clone();
            async move {
                sqlx::query_as::<_, CaseEvaluation>(
                    "UPDATE case_evaluations SET \
                        case_number = COALESCE(?2, case_number), \
                        kb_potential = COALESCE(?3, kb_potential), \
                        article_linked = COALESCE(?4, article_linked), \
                        article_improved = COALESCE(?5, article_improved), \
                        article_created = COALESCE(?6, article_created), \
                        improvement_opportunity = COALESCE(?7, improvement_opportunity), \
                        properly_searched = COALESCE(?8, properly_searched), \
                        linked_correctly = COALESCE(?9, linked_correctly), \
                        notes = COALESCE(?10, notes), \
                        updated_at = ?11 \
                     WHERE id = ?1 AND deleted_at IS NULL RETURNING *",
                )
                .bind(id)
                .bind(body.case_number)
                .bind(body.kb_potential)
                .bind(body.article_linked)
                .bind(body.article_improved)
                .bind(body.article_created)
                .bind(body.improvement_opportunity)
                .bind(body.properly_searched)
                .bind(body.linked_correctly)
                .bind(body.notes)
                .bind(now)
                .fetch_optional(&pool)
                .await
            }
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Case evaluation not found"))?;

    Ok(Json(case))
}

/// DELETE /api/evaluations/cases/:id (coach) - soft delete, independent of
/// the parent evaluation
pub async fn remove_case(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let now = Utc::now();
    let affected = state
        .db
        .execute_with_retry(|pool| async move {
            sqlx::query(
                "UPDATE case_evaluations SET deleted_at = ?2 \
                 WHERE id = ?1 AND deleted_at IS NULL",
            )
            .bind(id)
            .bind(now)
            .execute(&pool)
            .await
            .map(|r| r.rows_affected())
        })
        .await?;

    if affected == 0 {
        return Err(ApiError::not_found("Case evaluation not found"));
    }
    Ok(Json(serde_json::json!({ "message": "Case evaluation deleted" })))
}

async fn fetch_evaluation(
    pool: &sqlx::SqlitePool,
    id: i64,
) -> Result<Option<Evaluation>, sqlx::Error> {
    sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluations WHERE id = ?1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn fetch_cases(
    pool: &sqlx::SqlitePool,
    evaluation_id: i64,
) -> Result<Vec<CaseEvaluation>, sqlx::Error> {
    sqlx::query_as::<_, CaseEvaluation>(
        "SELECT * FROM case_evaluations \
         WHERE evaluation_id = ?1 AND deleted_at IS NULL ORDER BY id",
    )
    .bind(evaluation_id)
    .fetch_all(pool)
    .await
}

async fn insert_case(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    evaluation_id: i64,
    case: &CaseInput,
    now: chrono::DateTime<Utc>,
) -> Result<CaseEvaluation, sqlx::Error> {
    sqlx::query_as::<_, CaseEvaluation>(
        "INSERT INTO case_evaluations \
            (evaluation_id, case_number, kb_potential, article_linked, article_improved, \
             article_created, improvement_opportunity, properly_searched, linked_correctly, \
             notes, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11) RETURNING *",
    )
    .bind(evaluation_id)
    .bind(&case.case_number)
    .bind(case.kb_potential)
    .bind(case.article_linked)
    .bind(case.article_improved)
    .bind(case.article_created)
    .bind(case.improvement_opportunity)
    .bind(case.properly_searched)
    .bind(case.linked_correctly)
    .bind(&case.notes)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}
