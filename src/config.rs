use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin. Credentials are allowed for this origin only.
    pub frontend_url: String,
    /// Environment label (`development`, `production`, ...). Read from `APP_ENV`
    /// or `NODE_ENV`.
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret shared with the auth service that issues the tokens.
    pub jwt_secret: String,
    /// Base URL of the auth service, used to build login redirects.
    pub service_url: String,
    /// Name of the cookie carrying the token.
    pub cookie_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for account-share endpoints
    pub share_per_second: u32,
    /// Burst size for account-share endpoints
    pub share_burst: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3100".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string()),
                environment: env::var("APP_ENV")
                    .or_else(|_| env::var("NODE_ENV"))
                    .unwrap_or_else(|_| "development".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/stock.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            auth: AuthConfig {
                jwt_secret: match env::var("JWT_SECRET") {
                    Ok(v) if !v.trim().is_empty() => v,
                    _ => return Err(ConfigError::MissingEnv("JWT_SECRET".to_string())),
                },
                service_url: env::var("AUTH_SERVICE_URL")
                    .unwrap_or_else(|_| "https://auth.nicefox.net".to_string()),
                cookie_name: env::var("AUTH_COOKIE_NAME")
                    .unwrap_or_else(|_| "auth_token".to_string()),
            },
            rate_limit: RateLimitConfig {
                share_per_second: env::var("RATE_LIMIT_SHARE_PER_SECOND")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
                share_burst: env::var("RATE_LIMIT_SHARE_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3100,
                frontend_url: "http://localhost:5173".to_string(),
                environment: "development".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/stock.db".to_string(),
                max_connections: 5,
            },
            auth: AuthConfig {
                jwt_secret: String::new(),
                service_url: "https://auth.nicefox.net".to_string(),
                cookie_name: "auth_token".to_string(),
            },
            rate_limit: RateLimitConfig {
                share_per_second: 2,
                share_burst: 10,
            },
        }
    }
}
