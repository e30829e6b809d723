//! Application configuration read from the process environment.

use std::env;

/// The deployment profile the server runs under.
///
/// Selected via the `APP_ENV` environment variable. Development is the
/// default; Testing lowers the bcrypt work factor so test suites stay fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Local development with relaxed security defaults.
    #[default]
    Development,
    /// Automated test runs.
    Testing,
    /// A production deployment, which requires an explicit secret key.
    Production,
}

impl Profile {
    /// Read the profile from the `APP_ENV` environment variable.
    ///
    /// Unknown values fall back to [Profile::Development].
    pub fn from_env() -> Self {
        match env::var("APP_ENV").as_deref() {
            Ok("production") => Profile::Production,
            Ok("testing") => Profile::Testing,
            Ok("development") | Err(_) => Profile::Development,
            Ok(other) => {
                tracing::warn!("unknown APP_ENV value {other:?}, using the development profile");
                Profile::Development
            }
        }
    }
}

/// The errors that can occur while building a [Config].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The production profile was selected without providing `SECRET_KEY`.
    #[error("SECRET_KEY must be set when running with the production profile")]
    MissingSecret,
}

/// The fallback signing secret for development and testing.
const DEV_SECRET: &str = "dev-secret-key-change-in-production";

/// The database file used when `DATABASE_PATH` is not set.
const DEFAULT_DB_PATH: &str = "family_finance.db";

/// The runtime configuration of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The active deployment profile.
    pub profile: Profile,
    /// The secret used to derive the cookie signing key.
    pub secret: String,
    /// The path to the SQLite database file.
    pub db_path: String,
    /// Whether auth cookies are restricted to HTTPS.
    pub secure_cookies: bool,
    /// The bcrypt work factor used when hashing passwords.
    pub bcrypt_cost: u32,
}

impl Config {
    /// Build the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [ConfigError::MissingSecret] when the production profile is
    /// active and `SECRET_KEY` is unset. The other profiles fall back to a
    /// well-known development secret.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::for_profile(Profile::from_env())
    }

    /// Build the configuration for an explicit `profile`.
    pub fn for_profile(profile: Profile) -> Result<Self, ConfigError> {
        let secret = match env::var("SECRET_KEY") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if profile == Profile::Production => return Err(ConfigError::MissingSecret),
            _ => DEV_SECRET.to_string(),
        };

        let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

        let bcrypt_cost = match profile {
            Profile::Development => 12,
            // Tests create users constantly, so use the cheapest legal cost.
            Profile::Testing => 4,
            Profile::Production => 15,
        };

        Ok(Self {
            profile,
            secret,
            db_path,
            secure_cookies: profile == Profile::Production,
            bcrypt_cost,
        })
    }
}
