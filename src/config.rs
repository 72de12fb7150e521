use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::leave::ProfileDefaults;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,

    // Values for profiles created on first sign-in
    pub default_department: String,
    pub default_annual_balance: f64,
    pub default_sick_balance: f64,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: or_default("RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            default_department: env::var("DEFAULT_DEPARTMENT").unwrap_or_else(|_| "General".to_string()),
            default_annual_balance: or_default("DEFAULT_ANNUAL_BALANCE", 25.0)?,
            default_sick_balance: or_default("DEFAULT_SICK_BALANCE", 10.0)?,
        };

        for (key, value) in [
            ("DEFAULT_ANNUAL_BALANCE", config.default_annual_balance),
            ("DEFAULT_SICK_BALANCE", config.default_sick_balance),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{key} must be a non-negative number");
            }
        }

        Ok(config)
    }

    pub fn profile_defaults(&self) -> ProfileDefaults {
        ProfileDefaults {
            department: self.default_department.clone(),
            annual_leave_balance: self.default_annual_balance,
            sick_leave_balance: self.default_sick_balance,
        }
    }
}
