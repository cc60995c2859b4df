use std::{env, fmt::Display, str::FromStr};

use chrono::Duration;
use tracing::info;

use crate::error::ConfigError;

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub session_secret: String,
    pub cookie_name: String,
    pub session_max_age: Duration,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let session_secret = env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        let max_age_days: i64 = try_load("SESSION_MAX_AGE_DAYS", 30)?;
        if max_age_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_MAX_AGE_DAYS",
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            port: try_load("PORT", 8000)?,
            session_secret,
            cookie_name: try_load("SESSION_COOKIE_NAME", "RJ_session".to_string())?,
            session_max_age: Duration::days(max_age_days),
            cookie_secure: try_load("COOKIE_SECURE", false)?,
            bcrypt_cost: try_load("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
