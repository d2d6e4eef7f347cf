// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
  Memory,
  Postgres,
}

impl FromStr for StoreBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "memory" => Ok(StoreBackend::Memory),
      "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
      other => Err(AppError::Config(format!("Unknown STORE_BACKEND '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub store_backend: StoreBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub session_ttl_hours: i64,
  pub seed_db: bool,
  pub seed_admin_email: Option<String>,
  pub seed_admin_password: Option<String>,
  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    fn parse<T: FromStr>(name: &str, raw: String) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      raw
        .parse::<T>()
        .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
    }

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse("SERVER_PORT", lookup("SERVER_PORT").unwrap_or_else(|| "8080".to_string()))?;
    let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

    let store_backend = match lookup("STORE_BACKEND") {
      Some(raw) => raw.parse::<StoreBackend>()?,
      None if database_url.is_some() => StoreBackend::Postgres,
      None => StoreBackend::Memory,
    };
    if store_backend == StoreBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' for the postgres store".to_string(),
      ));
    }

    let database_max_connections = parse(
      "DATABASE_MAX_CONNECTIONS",
      lookup("DATABASE_MAX_CONNECTIONS").unwrap_or_else(|| "10".to_string()),
    )?;
    let session_ttl_hours: i64 = parse(
      "SESSION_TTL_HOURS",
      lookup("SESSION_TTL_HOURS").unwrap_or_else(|| "24".to_string()),
    )?;
    if session_ttl_hours <= 0 {
      return Err(AppError::Config("SESSION_TTL_HOURS must be positive".to_string()));
    }
    let seed_db = parse("SEED_DB", lookup("SEED_DB").unwrap_or_else(|| "false".to_string()))?;

    let log_format = match lookup("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
      None | Some("pretty") => LogFormat::Pretty,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Unknown LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      store_backend,
      database_url,
      database_max_connections,
      session_ttl_hours,
      seed_db,
      seed_admin_email: lookup("SEED_ADMIN_EMAIL"),
      seed_admin_password: lookup("SEED_ADMIN_PASSWORD"),
      log_format,
    })
  }
}
