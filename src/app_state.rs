//! Implements a struct that holds the state of the server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Config, auth::DEFAULT_COOKIE_DURATION, pagination::PaginationConfig};

/// The state of the server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,
    /// The bcrypt work factor used when hashing passwords.
    pub bcrypt_cost: u32,
    /// Whether auth cookies are marked `Secure` (HTTPS only).
    pub secure_cookies: bool,
}

impl AppState {
    /// Create a new [AppState] from the application `config`.
    pub fn new(config: &Config, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(&config.secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
            pagination_config: PaginationConfig::default(),
            bcrypt_cost: config.bcrypt_cost,
            secure_cookies: config.secure_cookies,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret` string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
