//! The registration page for creating a new account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PasswordHash,
    alert::{AlertTemplate, FlashStatus},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, link, log_in_register, password_input, text_input},
    user::{NewUser, create_user, email_taken, username_taken},
    validation::{ValidationErrors, validate_email, validate_password_strength, validate_phone, validate_username},
};

/// The state needed to register a new user.
#[derive(Debug, Clone)]
pub struct RegisterState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub bcrypt_cost: u32,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            bcrypt_cost: state.bcrypt_cost,
        }
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    /// The terms-of-service checkbox, present only when ticked.
    pub agree_terms: Option<String>,
}

impl RegistrationForm {
    /// Validate every field, including uniqueness of the username and email.
    fn validate(&self, connection: &Connection) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        let username = self.username.trim();
        match validate_username(username) {
            Ok(()) => match username_taken(username, None, connection) {
                Ok(true) => errors.add("username", "This username is already taken"),
                Ok(false) => {}
                Err(error) => {
                    tracing::error!("could not check username uniqueness: {error}");
                    errors.add("username", "Could not verify the username, try again");
                }
            },
            Err(message) => errors.add("username", message),
        }

        let email = self.email.trim();
        match validate_email(email) {
            Ok(()) => match email_taken(email, None, connection) {
                Ok(true) => errors.add("email", "This email is already registered"),
                Ok(false) => {}
                Err(error) => {
                    tracing::error!("could not check email uniqueness: {error}");
                    errors.add("email", "Could not verify the email, try again");
                }
            },
            Err(message) => errors.add("email", message),
        }

        let phone = self.phone.trim();
        if !phone.is_empty()
            && let Err(message) = validate_phone(phone)
        {
            errors.add("phone", message);
        }

        if let Err(message) = validate_password_strength(&self.password, true) {
            errors.add("password", message);
        }

        if self.password != self.confirm_password {
            errors.add("confirm_password", "Passwords do not match");
        }

        if self.agree_terms.is_none() {
            errors.add("agree_terms", "You must accept the terms of service");
        }

        errors
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let page = register_view(&RegistrationForm::default(), &ValidationErrors::new(), None);

    Html(page.into_string()).into_response()
}

/// Handle registration form submission.
///
/// On success the new user is created and the client is redirected to the
/// log-in page. The user still has to log in with their new credentials.
pub async fn post_register(
    State(state): State<RegisterState>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let errors = form.validate(&connection);
    if !errors.is_empty() {
        let page = register_view(&form, &errors, None);
        return Ok(Html(page.into_string()).into_response());
    }

    let password_hash = PasswordHash::from_raw_password(&form.password, state.bcrypt_cost)
        .inspect_err(|error| tracing::error!("could not hash password: {error}"))?;

    let phone = form.phone.trim();
    let new_user = NewUser {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: if phone.is_empty() {
            None
        } else {
            Some(phone.to_string())
        },
        password_hash,
    };

    match create_user(new_user, &connection) {
        Ok(_) => Ok(Redirect::to(&format!(
            "{}?{}",
            endpoints::LOG_IN_VIEW,
            FlashStatus::Registered.as_query()
        ))
        .into_response()),
        // The uniqueness checks above race with concurrent registrations, so
        // the constraint violations still need handling here.
        Err(error @ (Error::DuplicateEmail(_) | Error::DuplicateUsername(_))) => {
            let page = register_view(&form, &ValidationErrors::new(), Some(error.into_alert()));
            Ok(Html(page.into_string()).into_response())
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a user: {error}");
            Err(error)
        }
    }
}

fn register_view(
    form: &RegistrationForm,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Markup {
    let form_markup = html! {
        @if let Some(alert) = alert {
            (alert.into_html())
        }

        form
            method="post"
            action=(endpoints::REGISTER_VIEW)
            class="space-y-4 md:space-y-6"
        {
            (text_input(
                "Username",
                "text",
                "username",
                &form.username,
                true,
                errors.get("username"),
            ))
            (text_input("Email", "email", "email", &form.email, true, errors.get("email")))
            (text_input(
                "Phone (optional)",
                "tel",
                "phone",
                &form.phone,
                false,
                errors.get("phone"),
            ))
            (password_input("password", "Password", errors.get("password")))
            (password_input(
                "confirm_password",
                "Confirm password",
                errors.get("confirm_password"),
            ))

            div
            {
                div class="flex items-center gap-2"
                {
                    input
                        type="checkbox"
                        name="agree_terms"
                        id="agree_terms"
                        value="true"
                        checked[form.agree_terms.is_some()]
                        class="w-4 h-4 rounded";
                    label
                        for="agree_terms"
                        class="text-sm text-gray-900 dark:text-white"
                    {
                        "I agree to the terms of service"
                    }
                }

                @if let Some(error_message) = errors.get("agree_terms")
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Account" }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Sign in here"))
            }
        }
    };

    base(
        "Register",
        &[],
        &log_in_register("Create an account", &form_markup),
    )
}

#[cfg(test)]
mod register_tests {
    use axum::{Form, extract::State, http::StatusCode, response::IntoResponse};

    use crate::{
        alert::FlashStatus,
        endpoints,
        test_utils::{assert_redirect_to, assert_valid_html, parse_html, state_with_test_user},
        user::get_user_by_email,
    };

    use super::{RegisterState, RegistrationForm, get_register_page, post_register};

    fn get_test_state() -> RegisterState {
        let (db_connection, _) = state_with_test_user();

        RegisterState {
            db_connection,
            bcrypt_cost: 4,
        }
    }

    fn valid_form() -> RegistrationForm {
        RegistrationForm {
            username: "new_user".to_string(),
            email: "new@example.com".to_string(),
            phone: String::new(),
            password: "sturdy8password!".to_string(),
            confirm_password: "sturdy8password!".to_string(),
            agree_terms: Some("true".to_string()),
        }
    }

    #[tokio::test]
    async fn register_page_displays_form() {
        let response = get_register_page().await.into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(html.html().contains("Create an account"));
    }

    #[tokio::test]
    async fn can_register_new_user() {
        let state = get_test_state();

        let response = post_register(State(state.clone()), Form(valid_form()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_redirect_to(
            &response,
            &format!(
                "{}?{}",
                endpoints::LOG_IN_VIEW,
                FlashStatus::Registered.as_query()
            ),
        );

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_email("new@example.com", &connection).unwrap();
        assert_eq!(user.username, "new_user");
        assert!(user.password_hash.verify("sturdy8password!").unwrap());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let state = get_test_state();

        let mut form = valid_form();
        form.email = "test@example.com".to_string();

        let response = post_register(State(state), Form(form))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains("This email is already registered"));
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let state = get_test_state();

        let mut form = valid_form();
        form.password = "short1!".to_string();
        form.confirm_password = "short1!".to_string();

        let response = post_register(State(state), Form(form))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains("Password must be at least 8 characters"));
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let state = get_test_state();

        let mut form = valid_form();
        form.confirm_password = "different8password!".to_string();

        let response = post_register(State(state), Form(form))
            .await
            .unwrap()
            .into_response();

        let html = parse_html(response).await;
        assert!(html.html().contains("Passwords do not match"));
    }

    #[tokio::test]
    async fn missing_terms_agreement_is_rejected() {
        let state = get_test_state();

        let mut form = valid_form();
        form.agree_terms = None;

        let response = post_register(State(state), Form(form))
            .await
            .unwrap()
            .into_response();

        let html = parse_html(response).await;
        assert!(html.html().contains("You must accept the terms of service"));
    }
}
