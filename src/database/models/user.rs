use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A portal account. Role flags are independent booleans, not a hierarchy;
/// a user may hold any combination. Rows are soft-deleted via `deleted_at`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub is_coach: bool,
    pub is_lead: bool,
    pub is_admin: bool,
    pub is_manager: bool,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
