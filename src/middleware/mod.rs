pub mod auth;
pub mod require;

pub use auth::{authenticate, Principal};
pub use require::{require_admin, require_coach, require_lead, require_report_access};
