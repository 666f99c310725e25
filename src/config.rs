use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Runtime mode taken from `NODE_ENV`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
    Other(String),
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" => Self::Production,
            "development" => Self::Development,
            "test" => Self::Test,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Whether error responses may carry diagnostic traces
    pub fn exposes_diagnostics(&self) -> bool {
        !self.is_production()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
            Self::Production => write!(f, "production"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub uploads: UploadConfig,
    pub rate_limit: RateLimitConfig,
    pub log_level: String,
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
}

// Keep the signing secret out of logs.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub path: PathBuf,
    pub max_file_size: usize,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Variables whose absence aborts startup
const REQUIRED_VARS: &[&str] = &["NODE_ENV", "PORT", "DATABASE_URL", "JWT_SECRET"];

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// `DATABASE_URL` may be supplied as `MONGODB_URI` instead. Every missing
    /// required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let database_url = var("DATABASE_URL").or_else(|| var("MONGODB_URI"));

        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| match *key {
                "DATABASE_URL" => database_url.is_none(),
                key => var(key).is_none(),
            })
            .collect();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let environment = Environment::parse(&var("NODE_ENV").unwrap_or_default());

        Ok(Config {
            environment,
            server: ServerConfig {
                host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: var("PORT")
                    .unwrap_or_else(|| "3000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
            },
            database: DatabaseConfig {
                url: database_url.unwrap_or_default(),
                max_connections: var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            },
            auth: AuthConfig {
                jwt_secret: var("JWT_SECRET").unwrap_or_default(),
                jwt_expiration_secs: var("JWT_EXPIRATION")
                    .unwrap_or_else(|| "3600".to_string())
                    .parse()
                    .context("JWT_EXPIRATION must be a number of seconds")?,
            },
            cors: CorsConfig {
                enabled: var("ENABLE_CORS")
                    .map(|value| parse_flag(&value))
                    .unwrap_or(true),
                allowed_origins: var("ALLOWED_ORIGINS")
                    .map(|value| split_list(&value))
                    .unwrap_or_default(),
            },
            uploads: UploadConfig {
                path: PathBuf::from(var("UPLOAD_PATH").unwrap_or_else(|| "./uploads".to_string())),
                max_file_size: var("MAX_FILE_SIZE")
                    .unwrap_or_else(|| "10485760".to_string())
                    .parse()
                    .context("MAX_FILE_SIZE must be a number of bytes")?,
            },
            rate_limit: RateLimitConfig {
                max_requests: var("RATE_LIMIT_MAX_REQUESTS")
                    .unwrap_or_else(|| "100".to_string())
                    .parse()
                    .context("RATE_LIMIT_MAX_REQUESTS must be a valid number")?,
                window_secs: var("RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or_else(|| "900".to_string())
                    .parse()
                    .context("RATE_LIMIT_WINDOW_SECS must be a number of seconds")?,
            },
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            redis_url: var("REDIS_URL"),
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("NODE_ENV", "development"),
        ("PORT", "4000"),
        ("DATABASE_URL", "memory://"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server_address(), "0.0.0.0:4000");
        assert_eq!(config.auth.jwt_expiration_secs, 3600);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.uploads.path, PathBuf::from("./uploads"));
        assert_eq!(config.uploads.max_file_size, 10 * 1024 * 1024);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert!(config.cors.enabled);
        assert!(config.cors.allowed_origins.is_empty());
        assert!(config.redis_url.is_none());
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn test_missing_required_vars_are_all_reported() {
        let err = Config::from_lookup(lookup(&[("PORT", "3000")])).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("NODE_ENV"));
        assert!(message.contains("DATABASE_URL"));
        assert!(message.contains("JWT_SECRET"));
        assert!(!message.contains("PORT"));
    }

    #[test]
    fn test_mongodb_uri_satisfies_database_url() {
        let config = Config::from_lookup(lookup(&[
            ("NODE_ENV", "production"),
            ("PORT", "3000"),
            ("MONGODB_URI", "mongodb://localhost/items"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.database.url, "mongodb://localhost/items");
        assert!(config.environment.is_production());
        assert!(!config.environment.exposes_diagnostics());
    }

    #[test]
    fn test_allowed_origins_split() {
        let mut vars = BASE.to_vec();
        vars.push(("ALLOWED_ORIGINS", "https://a.example, https://b.example,,"));
        vars.push(("ENABLE_CORS", "false"));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(!config.cors.enabled);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = BASE.to_vec();
        vars.retain(|(k, _)| *k != "PORT");
        vars.push(("PORT", "not-a-port"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_auth_debug_redacts_secret() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        let rendered = format!("{:?}", config.auth);
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("***"));
    }
}
