use std::{env, fmt::Display, str::FromStr, time::Duration};

use anyhow::Context;
use tracing::{info, warn};

const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    /// Adds `Secure` to session cookies.
    pub secure_cookies: bool,
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub public_url: String,
}

#[derive(Clone, Debug)]
pub struct DevLoginConfig {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub env_mode: String,
    pub bind_addr: String,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub storage: Option<StorageConfig>,
    /// `None` unless dev login is explicitly enabled outside production.
    pub dev_login: Option<DevLoginConfig>,
    pub payment_redirect_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let env_mode = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let production = env_mode == "production";

        let jwt = JwtConfig {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: optional("JWT_ISSUER"),
            audience: optional("JWT_AUDIENCE"),
            secure_cookies: production,
        };

        let allowed_origins = parse_origins(optional("ALLOWED_ORIGINS").as_deref());
        let allowed_origins = if allowed_origins.is_empty() {
            if production {
                anyhow::bail!("ALLOWED_ORIGINS must contain at least one origin in production");
            }
            DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect()
        } else {
            allowed_origins
        };

        let storage = match optional("OBJECT_STORAGE_ENDPOINT") {
            Some(endpoint) => Some(StorageConfig {
                bucket: required("OBJECT_STORAGE_BUCKET")?,
                region: env::var("OBJECT_STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                access_key_id: required("OBJECT_STORAGE_ACCESS_KEY_ID")?,
                secret_access_key: required("OBJECT_STORAGE_SECRET_ACCESS_KEY")?,
                public_url: required("OBJECT_STORAGE_PUBLIC_URL")?,
                endpoint,
            }),
            None => {
                if production {
                    anyhow::bail!("OBJECT_STORAGE_ENDPOINT must be set in production");
                }
                warn!("OBJECT_STORAGE_ENDPOINT not set, using in-memory storage");
                None
            }
        };

        let dev_login_enabled = env::var("ALLOW_DEV_LOGIN").unwrap_or_default() == "true";
        let dev_login = if dev_login_enabled && !production {
            Some(DevLoginConfig {
                username: env::var("DEV_USERNAME").unwrap_or_else(|_| "admin".to_string()),
                password: env::var("DEV_PASSWORD").unwrap_or_else(|_| "password".to_string()),
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr: parse_or("BIND_ADDR", "0.0.0.0:8080".to_string())?,
            database_url: parse_or("DATABASE_URL", "adoptable.db".to_string())?,
            rate_limit_per_second: parse_or("RATE_LIMIT_PER_SECOND", 1200)?,
            rate_limit_burst: parse_or("RATE_LIMIT_BURST", 2400)?,
            payment_redirect_delay: Duration::from_millis(parse_or("PAYMENT_REDIRECT_DELAY_MS", 2000)?),
            env_mode,
            jwt,
            allowed_origins,
            storage,
            dev_login,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(key: &str) -> anyhow::Result<String> {
    optional(key).with_context(|| format!("{key} must be set"))
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match optional(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {key} value {raw:?}: {e}")),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

pub(crate) fn parse_origins(raw: Option<&str>) -> Vec<String> {
    raw.map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl Config {
    /// Settings for router tests and local tooling: in-memory everything,
    /// no rate limiting concerns.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            env_mode: "test".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            database_url: ":memory:".to_string(),
            jwt: JwtConfig {
                secret: jwt_secret.to_string(),
                issuer: None,
                audience: None,
                secure_cookies: false,
            },
            allowed_origins: DEFAULT_ORIGINS.iter().map(|s| s.to_string()).collect(),
            rate_limit_per_second: 1200,
            rate_limit_burst: 2400,
            storage: None,
            dev_login: None,
            payment_redirect_delay: Duration::from_millis(2000),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(Some(" https://a.example , ,https://b.example")),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins(None).is_empty());
    }
}
