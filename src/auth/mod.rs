use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config;
use crate::database::models::User;

/// JWT claims for a portal session. Role flags are deliberately not
/// embedded: guards read them from the user row at request time so an
/// admin revoking a role takes effect without waiting for token expiry.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self {
            sub: user.id,
            email: user.email.clone(),
            exp: (now + Duration::hours(expiry_hours as i64)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("JWT secret not configured")]
    MissingSecret,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Password hashing error: {0}")]
    Hashing(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

pub fn verify_jwt(token: &str) -> Result<Claims, AuthError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|e| AuthError::Hashing(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// The closed set of portal roles. Unknown names never match a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Lead,
    Coach,
    Manager,
}

impl Role {
    pub fn parse(name: &str) -> Option<Role> {
        match name {
            "admin" => Some(Role::Admin),
            "lead" => Some(Role::Lead),
            "coach" => Some(Role::Coach),
            "manager" => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Lead => "lead",
            Role::Coach => "coach",
            Role::Manager => "manager",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn sample_user() -> User {
        User {
            id: 7,
            email: "coach@example.com".to_string(),
            password_hash: String::new(),
            display_name: "Coach".to_string(),
            is_coach: true,
            is_lead: false,
            is_admin: false,
            is_manager: false,
            external_id: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
            deleted_at: None,
        }
    }

    #[test]
    fn jwt_round_trip_preserves_subject() {
        // Development config carries a built-in secret
        let token = generate_jwt(&Claims::new(&sample_user())).expect("generate");
        let claims = verify_jwt(&token).expect("verify");
        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "coach@example.com");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = generate_jwt(&Claims::new(&sample_user())).expect("generate");
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(verify_jwt(&tampered), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn role_set_is_closed() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("manager"), Some(Role::Manager));
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("Admin"), None);
    }

    #[test]
    fn password_verification() {
        // Low cost keeps the test fast; production uses DEFAULT_COST
        let hash = bcrypt::hash("s3cret", 4).unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }
}
