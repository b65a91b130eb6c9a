use std::path::PathBuf;

use chrono::{Duration, Utc};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Env var: `BIND_ADDR` (default `127.0.0.1:8080`).
    pub bind_addr: String,
    /// Env var: `STORE_BACKEND`, `postgres` (default) or `memory`.
    pub store_backend: StoreBackend,
    /// Required when the backend is postgres. Env var: `DATABASE_URL`.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Env var: `JWT_TTL_HOURS` (default 168).
    pub jwt_ttl: Duration,
    /// Env var: `MEDIA_ROOT` (default `media`).
    pub media_root: PathBuf,
    /// Env var: `MAX_UPLOAD_BYTES` (default 2 MiB).
    pub max_upload_bytes: usize,
    /// Superuser created or reset at startup when both are set.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

fn parse<T: std::str::FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::Empty("JWT_SECRET"));
        }

        let store_backend = match non_blank("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let database_url = non_blank("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_ttl_hours: i64 = parse("JWT_TTL_HOURS", non_blank("JWT_TTL_HOURS"), 168)?;
        let jwt_ttl = Duration::try_hours(jwt_ttl_hours)
            .filter(|ttl| *ttl > Duration::zero() && Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| ConfigError::Invalid {
                key: "JWT_TTL_HOURS",
                value: jwt_ttl_hours.to_string(),
            })?;

        Ok(Self {
            bind_addr: non_blank("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            store_backend,
            database_url,
            jwt_secret,
            jwt_ttl,
            media_root: non_blank("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media")),
            max_upload_bytes: parse("MAX_UPLOAD_BYTES", non_blank("MAX_UPLOAD_BYTES"), 2 * 1024 * 1024)?,
            admin_username: non_blank("ADMIN_USERNAME"),
            admin_password: non_blank("ADMIN_PASSWORD"),
        })
    }
}
