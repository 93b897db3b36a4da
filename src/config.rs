use anyhow::{Context, Result, anyhow, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Which attendance store backs the engine. `Memory` is degraded mode: nothing is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub store_backend: StoreBackend,
    /// Offset of the reference timezone used for day buckets and the late rule
    pub utc_offset_minutes: i32,

    // Rate limiting
    pub rate_punch_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let store_backend = match lookup("ATTENDANCE_STORE") {
            Some(raw) => StoreBackend::from_str(raw.trim())
                .map_err(|_| anyhow!("ATTENDANCE_STORE must be 'mysql' or 'memory', got '{raw}'"))?,
            None if database_url.is_some() => StoreBackend::Mysql,
            None => StoreBackend::Memory,
        };

        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            bail!("DATABASE_URL must be set when ATTENDANCE_STORE=mysql");
        }

        let utc_offset_minutes = parse_or(&lookup, "ATTENDANCE_UTC_OFFSET_MINUTES", 0i32)?;
        if utc_offset_minutes.abs() >= 24 * 60 {
            bail!("ATTENDANCE_UTC_OFFSET_MINUTES must be within ±1439, got {utc_offset_minutes}");
        }

        Ok(Self {
            server_addr: lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            database_url,
            jwt_secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            store_backend,
            utc_offset_minutes,
            rate_punch_per_min: parse_or(&lookup, "RATE_PUNCH_PER_MIN", 30)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,
            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} is not valid: {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn falls_back_to_memory_store_without_database() {
        let config = config_from(&[("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.server_addr, "127.0.0.1:8080");
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.utc_offset_minutes, 0);
        assert_eq!(config.rate_punch_per_min, 30);
    }

    #[test]
    fn picks_mysql_when_database_is_configured() {
        let config = config_from(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "mysql://localhost/hr"),
            ("ATTENDANCE_UTC_OFFSET_MINUTES", "360"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Mysql);
        assert_eq!(config.utc_offset_minutes, 360);
    }

    #[test]
    fn explicit_memory_store_wins_over_database_url() {
        let config = config_from(&[
            ("JWT_SECRET", "s"),
            ("DATABASE_URL", "mysql://localhost/hr"),
            ("ATTENDANCE_STORE", "Memory"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("JWT_SECRET", "s"), ("ATTENDANCE_STORE", "mysql")]).is_err());
        assert!(config_from(&[("JWT_SECRET", "s"), ("ATTENDANCE_STORE", "redis")]).is_err());
        assert!(config_from(&[("JWT_SECRET", "s"), ("RATE_PUNCH_PER_MIN", "lots")]).is_err());
        assert!(
            config_from(&[("JWT_SECRET", "s"), ("ATTENDANCE_UTC_OFFSET_MINUTES", "1440")]).is_err()
        );
    }
}
