use std::{str::FromStr, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use time::Duration as TimeDuration;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
    /// Serve the OpenAPI document and Swagger UI.
    pub swagger_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: u64,
    pub refresh_ttl_minutes: u64,
}

impl JwtConfig {
    /// `None` when the minute count does not fit a duration.
    pub fn access_ttl(&self) -> Option<TimeDuration> {
        minutes(self.ttl_minutes)
    }

    pub fn refresh_ttl(&self) -> Option<TimeDuration> {
        minutes(self.refresh_ttl_minutes)
    }
}

fn minutes(count: u64) -> Option<TimeDuration> {
    i64::try_from(count)
        .ok()?
        .checked_mul(60)
        .map(TimeDuration::seconds)
}

/// Argon2id work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    // argon2 crate defaults (OWASP minimum for argon2id)
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimiterConfig {
    pub enabled: bool,
    pub rps: u64,
    pub burst: u32,
    /// How often idle per-IP buckets are dropped.
    pub cleanup_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hashing: HashingConfig,
    pub limiter: LimiterConfig,
    pub operation_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let http = HttpConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080)?,
            timeout_secs: env_or("HTTP_SERVER_TIMEOUT_SECS", 4)?,
            swagger_enabled: env_or("HTTP_SERVER_SWAGGER_ENABLED", false)?,
        };
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 40)?,
            timeout_secs: env_or("DATABASE_TIMEOUT_SECS", 2)?,
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "northblog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "northblog-users".into()),
            ttl_minutes: env_or("JWT_ACCESS_TTL_MINUTES", 15)?,
            refresh_ttl_minutes: env_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 30)?,
        };
        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism)?,
        };
        let limiter = LimiterConfig {
            enabled: env_or("LIMITER_ENABLED", true)?,
            rps: env_or("LIMITER_RPS", 10)?,
            burst: env_or("LIMITER_BURST", 20)?,
            cleanup_secs: env_or("LIMITER_CLEANUP_SECS", 600)?,
        };

        Ok(Self {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "local".into()),
            http,
            database,
            jwt,
            hashing,
            limiter,
            operation_timeout_secs: env_or("AUTH_OPERATION_TIMEOUT_SECS", 4)?,
        })
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn is_local(&self) -> bool {
        self.env == "local"
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => parse_var(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}"))
}
