pub mod engineer;
pub mod evaluation;
pub mod user;

pub use engineer::{CoachAssignment, Engineer};
pub use evaluation::{CaseEvaluation, Evaluation};
pub use user::User;
