//! Helpers shared by the route handler tests.

use std::sync::{Arc, Mutex};

use axum::response::Response;
use rusqlite::Connection;
use scraper::{ElementRef, Html};

use crate::{
    db::initialize,
    password::PasswordHash,
    user::{NewUser, UserID, create_user},
};

/// The credentials that [state_with_test_user] registers the test user with.
pub const TEST_USER_EMAIL: &str = "test@example.com";
pub const TEST_USER_PASSWORD: &str = "test4password!";

/// Create an in-memory database with the tables created and a single user.
///
/// The user is registered with the username `test_user`, the email
/// [TEST_USER_EMAIL] and the password [TEST_USER_PASSWORD].
pub fn state_with_test_user() -> (Arc<Mutex<Connection>>, UserID) {
    let connection = Connection::open_in_memory().expect("Could not open database");
    initialize(&connection).expect("Could not initialize database");

    let password_hash =
        PasswordHash::from_raw_password(TEST_USER_PASSWORD, 4).expect("Could not hash password");
    let user = create_user(
        NewUser {
            username: "test_user".to_string(),
            email: TEST_USER_EMAIL.to_string(),
            phone: None,
            password_hash,
        },
        &connection,
    )
    .expect("Could not create test user");

    (Arc::new(Mutex::new(connection)), user.id)
}

pub async fn parse_html(response: Response) -> Html {
    let body = response.into_body();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&body).to_string();

    Html::parse_document(&text)
}

#[track_caller]
pub fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

#[track_caller]
pub fn must_get_form(html: &Html) -> ElementRef<'_> {
    html.select(&scraper::Selector::parse("form").unwrap())
        .next()
        .expect("No form found")
}

#[track_caller]
pub fn assert_redirect_to(response: &Response, want_location: &str) {
    let location = response
        .headers()
        .get("location")
        .expect("Response has no location header")
        .to_str()
        .unwrap();

    assert_eq!(location, want_location);
}
