use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One coaching session for one engineer on one date, attributed to a coach
/// and to the accounts that created/last updated it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id: i64,
    pub engineer_id: i64,
    pub coach_id: i64,
    pub evaluation_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One reviewed support case within an evaluation. Carries the seven KCS
/// quality flags plus free-text notes; soft-deletable independent of its
/// parent evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CaseEvaluation {
    pub id: i64,
    pub evaluation_id: i64,
    pub case_number: String,
    pub kb_potential: bool,
    pub article_linked: bool,
    pub article_improved: bool,
    pub article_created: bool,
    pub improvement_opportunity: bool,
    pub properly_searched: bool,
    pub linked_correctly: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
