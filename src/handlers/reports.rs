use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Per-engineer rollup of coaching activity and KCS quality flags.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct EngineerReport {
    pub engineer_id: i64,
    pub name: String,
    pub evaluation_count: i64,
    pub case_count: i64,
    pub kb_potential: i64,
    pub article_linked: i64,
    pub article_improved: i64,
    pub article_created: i64,
    pub improvement_opportunity: i64,
    pub properly_searched: i64,
    pub linked_correctly: i64,
}

/// GET /api/reports/engineers (lead, manager, admin)
pub async fn engineers(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Vec<EngineerReport>> {
    let pool = state.db.pool().await?;

    let rows = sqlx::query_as::<_, EngineerReport>(
        "SELECT e.id AS engineer_id, e.name, \
                COUNT(DISTINCT ev.id) AS evaluation_count, \
                COUNT(ce.id) AS case_count, \
                COALESCE(SUM(ce.kb_potential), 0) AS kb_potential, \
                COALESCE(SUM(ce.article_linked), 0) AS article_linked, \
                COALESCE(SUM(ce.article_improved), 0) AS article_improved, \
                COALESCE(SUM(ce.article_created), 0) AS article_created, \
                COALESCE(SUM(ce.improvement_opportunity), 0) AS improvement_opportunity, \
                COALESCE(SUM(ce.properly_searched), 0) AS properly_searched, \
                COALESCE(SUM(ce.linked_correctly), 0) AS linked_correctly \
         FROM engineers e \
         LEFT JOIN evaluations ev \
                ON ev.engineer_id = e.id \
               AND ev.deleted_at IS NULL \
               AND (?1 IS NULL OR ev.evaluation_date >= ?1) \
               AND (?2 IS NULL OR ev.evaluation_date <= ?2) \
         LEFT JOIN case_evaluations ce \
                ON ce.evaluation_id = ev.id AND ce.deleted_at IS NULL \
         GROUP BY e.id, e.name \
         ORDER BY e.name",
    )
    .bind(query.from)
    .bind(query.to)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}
