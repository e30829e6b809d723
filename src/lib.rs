//! Family Budget is a web app for tracking a household's income and expenses.
//!
//! This library serves HTML pages directly: each route handler binds a form,
//! validates it, issues the matching SQL statements scoped to the logged-in
//! user, and either redirects or re-renders the page with field errors.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod category;
mod config;
mod dashboard;
mod db;
mod endpoints;
mod health;
mod html;
mod internal_server_error;
mod language;
mod log_in;
mod log_out;
mod navigation;
mod not_found;
mod pagination;
mod password;
mod profile;
mod register;
mod report;
mod routing;
mod statistics;
mod transaction;
mod user;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::{Config, ConfigError, Profile};
pub use db::initialize as initialize_db;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID};

use crate::{
    alert::AlertTemplate,
    internal_server_error::{InternalServerErrorPageTemplate, render_internal_server_error},
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid email/password combination.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no auth cookies in the cookie jar")]
    CookieMissing,

    /// There was an error parsing the date in the cookie or creating the new
    /// expiry date time.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not parse expiry cookie date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that does not meet the strength rules.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A date in the future was used to create or edit a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// The email used during registration or a profile update already belongs
    /// to another user.
    #[error("a user with the email \"{0}\" already exists")]
    DuplicateEmail(String),

    /// The username used during registration or a profile update is already
    /// taken.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The user already has a category with this name.
    #[error("a category named \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// Tried to delete a category that still has transactions attached to it.
    #[error("the category still has transactions attached to it")]
    CategoryInUse,

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist under the user's scope
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist under the user's scope
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a category that does not exist under the user's scope
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist under the user's scope
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Writing the CSV export failed.
    #[error("could not write the CSV export: {0}")]
    CsvError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("users.email") =>
            {
                Error::DuplicateEmail(String::new())
            }
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("users.username") =>
            {
                Error::DuplicateUsername(String::new())
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::DatabaseLockError => render_internal_server_error(Default::default()),
            Error::CategoryInUse => render_internal_server_error(InternalServerErrorPageTemplate {
                description: "Category In Use",
                fix: "Remove or re-categorize the category's transactions before deleting it.",
            }),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_internal_server_error(Default::default())
            }
        }
    }
}

impl Error {
    /// A one-line summary suitable for showing next to a form or list, used by
    /// handlers that re-render the current page instead of redirecting.
    fn into_alert(self) -> AlertTemplate {
        match self {
            Error::FutureDate(date) => AlertTemplate::error(
                "Invalid transaction date",
                &format!("{date} is a date in the future, which is not allowed."),
            ),
            Error::CategoryInUse => AlertTemplate::error(
                "Could not delete category",
                "The category still has transactions attached to it. \
                Delete or re-categorize those transactions first.",
            ),
            Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => {
                AlertTemplate::error(
                    "Transaction not found",
                    "The transaction could not be found. \
                    Try refreshing the page to see if it has already been deleted.",
                )
            }
            Error::UpdateMissingCategory | Error::DeleteMissingCategory => AlertTemplate::error(
                "Category not found",
                "The category could not be found. \
                Try refreshing the page to see if it has already been deleted.",
            ),
            Error::DuplicateCategoryName(name) => AlertTemplate::error(
                "Duplicate category name",
                &format!(
                    "A category named {name} already exists. \
                    Choose a different name, or edit or delete the existing category.",
                ),
            ),
            Error::DuplicateEmail(email) => AlertTemplate::error(
                "Email already in use",
                &format!("The email {email} is already used by another account."),
            ),
            Error::DuplicateUsername(username) => AlertTemplate::error(
                "Username taken",
                &format!("The username {username} is already taken."),
            ),
            _ => AlertTemplate::error(
                "Something went wrong",
                "An unexpected error occurred, check the server logs for more details.",
            ),
        }
    }
}
