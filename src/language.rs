//! Switching the interface language via a plain cookie.
//!
//! The language preference is not account data: it applies before log-in too,
//! so it lives in an unencrypted cookie rather than the users table alone.

use axum::{
    extract::Path,
    http::{HeaderMap, header::REFERER},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use time::Duration;

use crate::{endpoints, profile::LANGUAGES};

/// The name of the cookie holding the language preference.
pub(crate) const COOKIE_LANGUAGE: &str = "language";

/// How long the language preference cookie lasts.
const LANGUAGE_COOKIE_DURATION: Duration = Duration::days(365);

/// Set the interface language and redirect back to the referring page.
///
/// Unknown language codes are ignored and the client is redirected without
/// changing the cookie.
pub async fn set_language_endpoint(
    Path(lang): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Response {
    let target = headers
        .get(REFERER)
        .and_then(|referer| referer.to_str().ok())
        .filter(|referer| referer.starts_with('/'))
        .unwrap_or(endpoints::ROOT)
        .to_owned();

    if !LANGUAGES.iter().any(|(code, _)| *code == lang) {
        tracing::debug!("ignoring unknown language code {lang:?}");
        return Redirect::to(&target).into_response();
    }

    let jar = jar.add(
        Cookie::build((COOKIE_LANGUAGE, lang))
            .path("/")
            .max_age(LANGUAGE_COOKIE_DURATION)
            .same_site(SameSite::Lax),
    );

    (jar, Redirect::to(&target)).into_response()
}
