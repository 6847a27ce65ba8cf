use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub query: QueryConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Page size used when `limit` is absent or not a positive integer
    pub default_page_size: u64,
    /// Hard upper bound on `limit`
    pub max_limit: Option<u64>,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// HS256 key for access tokens (`Bearer` scheme)
    pub access_key: String,
    /// HS256 key for refresh tokens
    pub refresh_key: String,
    /// Salt mixed into password hashes
    pub secret_key: String,
    pub access_token_minutes: u64,
    pub refresh_token_hours: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
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
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Query overrides
        if let Ok(v) = env::var("PAGE_SIZE") {
            self.query.default_page_size = v
                .parse()
                .ok()
                .filter(|n: &u64| *n > 0)
                .unwrap_or(self.query.default_page_size);
        }
        if let Ok(v) = env::var("QUERY_MAX_LIMIT") {
            self.query.max_limit = v.parse().ok().filter(|n: &u64| *n > 0);
        }
        if let Ok(v) = env::var("QUERY_DEBUG_LOGGING") {
            self.query.debug_logging = v.parse().unwrap_or(self.query.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("ACCESS_KEY") {
            self.security.access_key = v;
        }
        if let Ok(v) = env::var("REFRESH_KEY") {
            self.security.refresh_key = v;
        }
        if let Ok(v) = env::var("SECRET_KEY") {
            self.security.secret_key = v;
        }
        if let Ok(v) = env::var("ACCESS_TOKEN_MINUTES") {
            self.security.access_token_minutes = v.parse().unwrap_or(self.security.access_token_minutes);
        }
        if let Ok(v) = env::var("REFRESH_TOKEN_HOURS") {
            self.security.refresh_token_hours = v.parse().unwrap_or(self.security.refresh_token_hours);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    /// Reject configurations that would sign tokens with an empty key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.access_key.is_empty() {
            return Err(ConfigError::Missing("ACCESS_KEY"));
        }
        if self.security.refresh_key.is_empty() {
            return Err(ConfigError::Missing("REFRESH_KEY"));
        }
        if self.security.secret_key.is_empty() {
            return Err(ConfigError::Missing("SECRET_KEY"));
        }
        if self.security.access_key == self.security.refresh_key {
            return Err(ConfigError::Invalid(
                "ACCESS_KEY and REFRESH_KEY must differ".to_string(),
            ));
        }
        if self.query.default_page_size == 0 || self.query.max_limit == Some(0) {
            return Err(ConfigError::Invalid(
                "PAGE_SIZE and QUERY_MAX_LIMIT must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            query: QueryConfig {
                default_page_size: 20,
                max_limit: Some(1000),
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                access_key: "dev_access_key".to_string(),
                refresh_key: "dev_refresh_key".to_string(),
                secret_key: "dev_secret_key".to_string(),
                access_token_minutes: 30,
                refresh_token_hours: 24 * 3,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            query: QueryConfig {
                default_page_size: 20,
                max_limit: Some(500),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                access_key: String::new(),
                refresh_key: String::new(),
                secret_key: String::new(),
                access_token_minutes: 30,
                refresh_token_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            query: QueryConfig {
                default_page_size: 20,
                max_limit: Some(100),
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                access_key: String::new(),
                refresh_key: String::new(),
                secret_key: String::new(),
                access_token_minutes: 15,
                refresh_token_hours: 24,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
        }
    }
}
