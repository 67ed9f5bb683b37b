use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::auth;
use crate::database::models::User;
use crate::error::ApiError;
use crate::AppState;

/// The authenticated user attached to a request after token verification.
#[derive(Clone, Debug, Serialize)]
pub struct Principal {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub is_coach: bool,
    pub is_lead: bool,
    pub is_admin: bool,
    pub is_manager: bool,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            is_coach: user.is_coach,
            is_lead: user.is_lead,
            is_admin: user.is_admin,
            is_manager: user.is_manager,
        }
    }
}

impl Principal {
    pub fn has_role(&self, role: auth::Role) -> bool {
        match role {
            auth::Role::Admin => self.is_admin,
            auth::Role::Lead => self.is_lead,
            auth::Role::Coach => self.is_coach,
            auth::Role::Manager => self.is_manager,
        }
    }
}

/// Bearer-token authentication middleware. Verifies the JWT, loads the
/// (non-deleted) user row so revoked roles take effect immediately, and
/// attaches the principal as a request extension.
///
/// A missing token is 401; a token that fails verification is 403 with a
/// generic message, matching the portal's established contract.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;

    let claims =
        auth::verify_jwt(&token).map_err(|_| ApiError::forbidden("Invalid or expired token"))?;

    let pool = state.db.pool().await?;
    let user =
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1 AND deleted_at IS NULL")
            .bind(claims.sub)
            .fetch_optional(&pool)
            .await?
            .ok_or_else(|| {
                tracing::warn!("Token subject {} no longer resolves to an active user", claims.sub);
                ApiError::forbidden("Invalid or expired token")
            })?;

    request.extensions_mut().insert(Principal::from(user));
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("No token provided"))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::unauthorized("No token provided"))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::unauthorized("No token provided")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");

        headers.insert("authorization", "Basic dXNlcg==".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", "Bearer   ".parse().unwrap());
        assert!(extract_bearer_token(&headers).is_err());
    }
}
