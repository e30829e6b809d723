//! Cookie based authentication.
//!
//! A logged in user is identified by a pair of private (encrypted) cookies:
//! one holding the user ID and one holding the session expiry. The expiry is
//! checked server-side so that a tampered `Expires` attribute cannot extend a
//! session.

mod cookie;
mod middleware;

pub use cookie::{
    DEFAULT_COOKIE_DURATION, REMEMBER_COOKIE_DURATION, get_user_id_from_auth_cookie,
    invalidate_auth_cookie, set_auth_cookie,
};
pub use middleware::{AuthState, auth_guard};

#[cfg(test)]
pub use cookie::{COOKIE_EXPIRY, COOKIE_USER_ID};
