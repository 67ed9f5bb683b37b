use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::Principal;
use crate::auth::Role;
use crate::error::ApiError;

// Role guards are stateless predicates over the principal attached by
// `authenticate` earlier in the chain. Flags are independent booleans:
// each guard states exactly which flags satisfy it. Admins pass the lead
// and coach gates; managers do not pass the admin gate.

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = principal_of(&request)?;
    if principal.is_admin {
        return Ok(next.run(request).await);
    }
    Err(ApiError::forbidden("Admin access required"))
}

pub async fn require_lead(request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = principal_of(&request)?;
    if principal.is_lead || principal.is_admin {
        return Ok(next.run(request).await);
    }
    Err(ApiError::forbidden("Lead access required"))
}

pub async fn require_coach(request: Request, next: Next) -> Result<Response, ApiError> {
    let principal = principal_of(&request)?;
    if principal.is_coach || principal.is_admin {
        return Ok(next.run(request).await);
    }
    Err(ApiError::forbidden("Coach access required"))
}

/// Reports are readable by leads, managers and admins.
pub async fn require_report_access(request: Request, next: Next) -> Result<Response, ApiError> {
    const REPORT_ROLES: &[Role] = &[Role::Admin, Role::Lead, Role::Manager];
    require_any_role(REPORT_ROLES, request, next).await
}

/// Passes when the principal holds at least one of `roles`. The role set
/// is closed; unknown names never reach this point (`Role::parse` rejects
/// them).
pub async fn require_any_role(
    roles: &[Role],
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = principal_of(&request)?;
    if roles.iter().any(|role| principal.has_role(*role)) {
        return Ok(next.run(request).await);
    }

    let accepted = roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ApiError::forbidden(format!(
        "Requires one of the following roles: {}",
        accepted
    )))
}

fn principal_of(request: &Request) -> Result<&Principal, ApiError> {
    request
        .extensions()
        .get::<Principal>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}
