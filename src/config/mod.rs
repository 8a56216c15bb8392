//! Configuration Module
//!
//! Environment-driven configuration for the account service: server, store
//! backend, token lifetimes, outgoing mail and the account policy knobs.

use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::service::email_service::EmailConfig;
use crate::service::jwt::TokenLifetimes;
use crate::utils::otp::DEFAULT_CODE_WINDOW_SECS;
use crate::utils::security::DEFAULT_BCRYPT_COST;
use crate::utils::validation::DEFAULT_SIGNUP_EMAIL_DOMAIN;

/// Environment variable helpers
pub mod env {
    use std::env;

    use super::ConfigError;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Non-empty value, if set
    pub fn get_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    pub fn get_required(key: &str) -> Result<String, ConfigError> {
        get_optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
    }

    /// Parse the variable, falling back to `default` when unset or malformed
    pub fn get_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
        env::var(key)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    pub fn get_bool(key: &str, default: bool) -> bool {
        match env::var(key) {
            Ok(v) => super::parse_bool(&v).unwrap_or(default),
            Err(_) => default,
        }
    }

    /// Comma-separated list
    pub fn get_list(key: &str, default: &str) -> Vec<String> {
        super::split_list(&get_string(key, default))
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Upper bound for refresh and remember-me lifetimes
const MAX_TOKEN_DAYS: i64 = 3650;

/// Upper bound for email verification links
const MAX_VERIFICATION_HOURS: i64 = 30 * 24;

fn check_range(key: &str, value: i64, min: i64, max: i64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(key, format!("must be between {} and {}", min, max)))
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub policy: AccountPolicy,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
}

/// Which store adapter backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(invalid(
                "STORE_BACKEND",
                format!("expected 'postgres' or 'memory', got '{}'", other),
            )),
        }
    }
}

/// Store configuration; the pool settings only apply to PostgreSQL
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub max_lifetime_seconds: u64,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_expires_minutes: i64,
    pub refresh_expires_days: i64,
    pub remember_me_expires_days: i64,
}

impl JwtConfig {
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::minutes(self.access_expires_minutes),
            refresh: Duration::days(self.refresh_expires_days),
            remember_me: Duration::days(self.remember_me_expires_days),
        }
    }
}

/// Business rules for sign-up, login and password reset
#[derive(Debug, Clone)]
pub struct AccountPolicy {
    /// Only addresses at this domain may sign up
    pub signup_email_domain: String,
    /// Refuse login until the email is verified
    pub require_verified_email: bool,
    /// Seconds a reset code may be entered
    pub reset_code_ttl_seconds: u32,
    /// Failed attempts after which a reset code is burned
    pub reset_code_max_attempts: i32,
    pub reset_grant_ttl_minutes: i64,
    pub email_verification_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for AccountPolicy {
    fn default() -> Self {
        Self {
            signup_email_domain: DEFAULT_SIGNUP_EMAIL_DOMAIN.to_string(),
            require_verified_email: true,
            reset_code_ttl_seconds: DEFAULT_CODE_WINDOW_SECS,
            reset_code_max_attempts: 5,
            reset_grant_ttl_minutes: 10,
            email_verification_ttl_hours: 24,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_parsed("SERVER_PORT", 3000),
            cors_origins: env::get_list("CORS_ORIGINS", "*"),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend: StoreBackend = env::get_string("STORE_BACKEND", "postgres").parse()?;

        Ok(Self {
            backend,
            database_url: env::get_optional("DATABASE_URL"),
            max_connections: env::get_parsed("DB_MAX_CONNECTIONS", 10),
            min_connections: env::get_parsed("DB_MIN_CONNECTIONS", 1),
            connect_timeout_seconds: env::get_parsed("DB_CONNECT_TIMEOUT", 10),
            idle_timeout_seconds: env::get_parsed("DB_IDLE_TIMEOUT", 600),
            max_lifetime_seconds: env::get_parsed("DB_MAX_LIFETIME", 3600),
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_secret: env::get_required("JWT_ACCESS_SECRET")?,
            refresh_secret: env::get_required("JWT_REFRESH_SECRET")?,
            access_expires_minutes: env::get_parsed("JWT_ACCESS_EXPIRES_MINUTES", 60),
            refresh_expires_days: env::get_parsed("JWT_REFRESH_EXPIRES_DAYS", 1),
            remember_me_expires_days: env::get_parsed("JWT_REMEMBER_ME_EXPIRES_DAYS", 30),
        })
    }
}

fn email_from_env() -> EmailConfig {
    let defaults = EmailConfig::default();
    EmailConfig {
        smtp_host: env::get_optional("SMTP_HOST"),
        smtp_port: env::get_parsed("SMTP_PORT", defaults.smtp_port),
        smtp_username: env::get_string("SMTP_USERNAME", ""),
        smtp_password: env::get_string("SMTP_PASSWORD", ""),
        from_email: env::get_string("SMTP_FROM_EMAIL", &defaults.from_email),
        from_name: env::get_string("SMTP_FROM_NAME", &defaults.from_name),
        contact_inbox: env::get_string("CONTACT_INBOX", &defaults.contact_inbox),
        app_base_url: env::get_string("APP_BASE_URL", &defaults.app_base_url),
    }
}

impl AccountPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            signup_email_domain: env::get_string(
                "SIGNUP_EMAIL_DOMAIN",
                &defaults.signup_email_domain,
            )
            .trim()
            .to_ascii_lowercase(),
            require_verified_email: env::get_bool(
                "REQUIRE_VERIFIED_EMAIL",
                defaults.require_verified_email,
            ),
            reset_code_ttl_seconds: env::get_parsed(
                "RESET_CODE_TTL_SECONDS",
                defaults.reset_code_ttl_seconds,
            ),
            reset_code_max_attempts: env::get_parsed(
                "RESET_CODE_MAX_ATTEMPTS",
                defaults.reset_code_max_attempts,
            ),
            reset_grant_ttl_minutes: env::get_parsed(
                "RESET_GRANT_TTL_MINUTES",
                defaults.reset_grant_ttl_minutes,
            ),
            email_verification_ttl_hours: env::get_parsed(
                "EMAIL_VERIFICATION_TTL_HOURS",
                defaults.email_verification_ttl_hours,
            ),
            bcrypt_cost: env::get_parsed("BCRYPT_COST", defaults.bcrypt_cost),
        }
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env(),
            store: StoreConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            email: email_from_env(),
            policy: AccountPolicy::from_env(),
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("SERVER_PORT", "must be greater than 0"));
        }

        if self.store.backend == StoreBackend::Postgres {
            if self.store.database_url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL".to_string()));
            }
            if self.store.max_connections == 0 {
                return Err(invalid("DB_MAX_CONNECTIONS", "must be greater than 0"));
            }
            if self.store.min_connections > self.store.max_connections {
                return Err(invalid(
                    "DB_MIN_CONNECTIONS",
                    "cannot be greater than DB_MAX_CONNECTIONS",
                ));
            }
        }

        if self.jwt.access_secret == self.jwt.refresh_secret {
            return Err(invalid(
                "JWT_REFRESH_SECRET",
                "access and refresh secrets must be different",
            ));
        }
        check_range(
            "JWT_ACCESS_EXPIRES_MINUTES",
            self.jwt.access_expires_minutes,
            1,
            24 * 60,
        )?;
        check_range(
            "JWT_REFRESH_EXPIRES_DAYS",
            self.jwt.refresh_expires_days,
            1,
            MAX_TOKEN_DAYS,
        )?;
        check_range(
            "JWT_REMEMBER_ME_EXPIRES_DAYS",
            self.jwt.remember_me_expires_days,
            self.jwt.refresh_expires_days,
            MAX_TOKEN_DAYS,
        )?;

        if self.email.smtp_host.is_some() && self.email.from_email.is_empty() {
            return Err(ConfigError::Missing("SMTP_FROM_EMAIL".to_string()));
        }

        if !self.policy.signup_email_domain.contains('.') {
            return Err(invalid("SIGNUP_EMAIL_DOMAIN", "must be a domain name"));
        }
        if self.policy.reset_code_ttl_seconds == 0 {
            return Err(invalid("RESET_CODE_TTL_SECONDS", "must be greater than 0"));
        }
        if self.policy.reset_code_max_attempts <= 0 {
            return Err(invalid("RESET_CODE_MAX_ATTEMPTS", "must be greater than 0"));
        }
        check_range(
            "RESET_GRANT_TTL_MINUTES",
            self.policy.reset_grant_ttl_minutes,
            1,
            24 * 60,
        )?;
        check_range(
            "EMAIL_VERIFICATION_TTL_HOURS",
            self.policy.email_verification_ttl_hours,
            1,
            MAX_VERIFICATION_HOURS,
        )?;
        if !(4..=31).contains(&self.policy.bcrypt_cost) {
            return Err(invalid("BCRYPT_COST", "must be between 4 and 31"));
        }

        Ok(())
    }
}
