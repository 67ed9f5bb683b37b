use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A support engineer under coaching. Deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Engineer {
    pub id: i64,
    pub name: String,
    pub lead_id: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Time-bounded pairing of one engineer to one coaching user.
/// Active while `end_date` is null.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoachAssignment {
    pub id: i64,
    pub engineer_id: i64,
    pub coach_id: i64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
