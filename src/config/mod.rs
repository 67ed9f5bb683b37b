use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub log_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; relative paths resolve against the working directory.
    pub path: String,
    pub busy_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("KCS_PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("KCS_LOG_DIR") {
            self.server.log_dir = v;
        }
        if let Ok(v) = env::var("KCS_DATABASE_PATH") {
            self.database.path = v;
        }
        if let Ok(v) = env::var("KCS_DATABASE_BUSY_TIMEOUT_SECS") {
            self.database.busy_timeout_secs = v.parse().unwrap_or(self.database.busy_timeout_secs);
        }
        if let Ok(v) = env::var("KCS_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("KCS_RATE_LIMIT_MAX") {
            self.api.rate_limit_max = v.parse().unwrap_or(self.api.rate_limit_max);
        }
        if let Ok(v) = env::var("KCS_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }
        if let Ok(v) = env::var("KCS_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("KCS_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("KCS_ALLOWED_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                log_dir: "logs".to_string(),
            },
            database: DatabaseConfig {
                path: "data/kcs-portal.db".to_string(),
                busy_timeout_secs: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_max: 1000,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-do-not-use-in-production".to_string(),
                jwt_expiry_hours: 24 * 7,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                log_dir: "logs".to_string(),
            },
            database: DatabaseConfig {
                path: "data/kcs-portal.db".to_string(),
                busy_timeout_secs: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_max: 300,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://kcs-staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                log_dir: "logs".to_string(),
            },
            database: DatabaseConfig {
                path: "data/kcs-portal.db".to_string(),
                busy_timeout_secs: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_max: 100,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                cors_origins: vec!["https://kcs.example.com".to_string()],
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(!config.api.enable_rate_limiting);
        assert!(!config.security.jwt_secret.is_empty());
        assert_eq!(config.database.path, "data/kcs-portal.db");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.api.enable_rate_limiting);
        // Production refuses to mint tokens without an explicit secret
        assert!(config.security.jwt_secret.is_empty());
        assert_eq!(config.security.jwt_expiry_hours, 8);
    }
}
