//! The log-in page and log-in form handling.
//!
//! The auth module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    alert::{AlertTemplate, FlashStatus},
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, REMEMBER_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, link, log_in_register, password_input, text_input},
    user::{User, get_user_by_email},
};

/// The error message shown for a bad email/password combination.
///
/// The same message is used whether the email is unknown or the password is
/// wrong, so the form does not reveal which emails are registered.
pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect email or password.";

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
    /// Whether auth cookies are marked `Secure` (HTTPS only).
    pub secure_cookies: bool,
}

impl LogInState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
            secure_cookies: true,
        }
    }
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
            secure_cookies: state.secure_cookies,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The query parameters accepted by the log-in page.
#[derive(Debug, Default, Deserialize)]
pub struct LogInPageQuery {
    /// Where to send the user after logging in, set by the auth middleware
    /// when an unauthenticated request is redirected here.
    pub redirect_url: Option<String>,
    pub status: Option<FlashStatus>,
}

/// The raw data entered by the user in the log-in form.
///
/// The email and password are stored as plain strings. There is no need for
/// validation here since they will be compared against the email and password
/// in the database, which have been verified.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    #[serde(default)]
    pub email: String,
    /// Password entered during log-in.
    #[serde(default)]
    pub password: String,
    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is
    /// not set. The `Some` variant should be interpreted as `true` regardless
    /// of the string value.
    pub remember_me: Option<String>,
    /// Where to send the user after logging in, carried through the form as a
    /// hidden field.
    pub redirect_url: Option<String>,
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<LogInPageQuery>) -> Response {
    let alert = query.status.map(FlashStatus::into_alert);
    let page = log_in_view("", None, query.redirect_url.as_deref(), alert);

    Html(page.into_string()).into_response()
}

/// Handle log-in form submission.
///
/// On success the auth cookie is set and the client is redirected to the
/// dashboard, or to the page it originally requested. Otherwise the form is
/// returned with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(log_in_data): Form<LogInData>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user: User = match get_user_by_email(log_in_data.email.trim(), &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            let page = log_in_view(
                &log_in_data.email,
                Some(INVALID_CREDENTIALS_ERROR_MSG),
                log_in_data.redirect_url.as_deref(),
                None,
            );
            return Ok(Html(page.into_string()).into_response());
        }
        Err(error) => return Err(error),
    };

    let is_password_valid = user
        .password_hash
        .verify(&log_in_data.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_valid {
        let page = log_in_view(
            &log_in_data.email,
            Some(INVALID_CREDENTIALS_ERROR_MSG),
            log_in_data.redirect_url.as_deref(),
            None,
        );
        return Ok(Html(page.into_string()).into_response());
    }

    let cookie_duration = if log_in_data.remember_me.is_some() {
        REMEMBER_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = set_auth_cookie(jar, user.id, cookie_duration, state.secure_cookies)
        .inspect_err(|error| tracing::error!("Error setting auth cookie: {error}"))?;

    let target = log_in_data
        .redirect_url
        .as_deref()
        .filter(|url| is_safe_redirect(url))
        .unwrap_or(endpoints::DASHBOARD_VIEW);

    Ok((jar, Redirect::to(target)).into_response())
}

/// Whether `url` is a local path the log-in flow may redirect to.
///
/// Rejects absolute and protocol-relative URLs so a crafted link cannot bounce
/// a freshly logged-in user to another site.
fn is_safe_redirect(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

fn log_in_view(
    email: &str,
    error_message: Option<&str>,
    redirect_url: Option<&str>,
    alert: Option<AlertTemplate>,
) -> Markup {
    let form = html! {
        @if let Some(alert) = alert {
            (alert.into_html())
        }

        form
            method="post"
            action=(endpoints::LOG_IN_VIEW)
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("Email", "email", "email", email, true, None))
            (password_input("password", "Password", error_message))

            div class="flex items-center gap-2"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    value="true"
                    class="w-4 h-4 rounded";
                label
                    for="remember_me"
                    class="text-sm text-gray-900 dark:text-white"
                {
                    "Remember me for 7 days"
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Sign In" }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Don't have an account? "
                (link(endpoints::REGISTER_VIEW, "Register here"))
            }
        }
    };

    base(
        "Sign In",
        &[],
        &log_in_register("Sign in to your account", &form),
    )
}

#[cfg(test)]
mod log_in_tests {
    use axum::{
        Form,
        extract::{Query, State},
        http::{StatusCode, header::SET_COOKIE},
        response::IntoResponse,
    };
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        endpoints,
        test_utils::{assert_redirect_to, assert_valid_html, parse_html, state_with_test_user},
    };

    use super::{
        INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInPageQuery, LogInState, get_log_in_page,
        is_safe_redirect, post_log_in,
    };

    fn get_test_state() -> LogInState {
        let (db_connection, _) = state_with_test_user();
        let mut state = LogInState::new("42", db_connection);
        state.secure_cookies = false;
        state
    }

    fn valid_log_in() -> LogInData {
        LogInData {
            email: "test@example.com".to_string(),
            password: "test4password!".to_string(),
            remember_me: None,
            redirect_url: None,
        }
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page(Query(LogInPageQuery::default()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(html.html().contains("Sign in to your account"));
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let response = post_log_in(State(state), jar, Form(valid_log_in()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_redirect_to(&response, endpoints::DASHBOARD_VIEW);
        assert!(response.headers().contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn log_in_follows_safe_redirect_url() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let mut log_in_data = valid_log_in();
        log_in_data.redirect_url = Some("/transactions?page=2".to_string());

        let response = post_log_in(State(state), jar, Form(log_in_data))
            .await
            .unwrap()
            .into_response();

        assert_redirect_to(&response, "/transactions?page=2");
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let mut log_in_data = valid_log_in();
        log_in_data.password = "wrong7password!".to_string();

        let response = post_log_in(State(state), jar, Form(log_in_data))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let state = get_test_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        let mut log_in_data = valid_log_in();
        log_in_data.email = "nobody@example.com".to_string();

        let response = post_log_in(State(state), jar, Form(log_in_data))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[test]
    fn unsafe_redirect_urls_are_rejected() {
        assert!(is_safe_redirect("/dashboard"));
        assert!(!is_safe_redirect("https://evil.example.com"));
        assert!(!is_safe_redirect("//evil.example.com"));
    }
}
