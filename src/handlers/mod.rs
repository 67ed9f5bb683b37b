pub mod admin;
pub mod assignments;
pub mod auth;
pub mod dashboard;
pub mod engineers;
pub mod evaluations;
pub mod health;
pub mod reports;
