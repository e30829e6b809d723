//! The profile page: account details, preferences and password changes.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::{AlertTemplate, FlashStatus},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base, password_input, select_input, text_input},
    navigation::NavBar,
    user::{
        ProfileUpdate, User, UserID, email_taken, get_user_by_id, update_password_hash,
        update_profile, username_taken,
    },
    validation::{
        ValidationErrors, validate_amount, validate_email, validate_phone, validate_username,
    },
    PasswordHash,
};

/// The display currencies a user can choose from.
pub(crate) const CURRENCIES: [(&str, &str); 5] = [
    ("USD", "US Dollar ($)"),
    ("EUR", "Euro (€)"),
    ("RUB", "Russian Ruble (₽)"),
    ("GBP", "British Pound (£)"),
    ("JPY", "Japanese Yen (¥)"),
];

/// The interface languages a user can choose from.
pub(crate) const LANGUAGES: [(&str, &str); 2] = [("en", "English"), ("ru", "Русский")];

/// The highest overall monthly budget a user may set.
const MONTHLY_BUDGET_MAX: f64 = 1_000_000.0;

/// The state needed for the profile page and its form submissions.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub bcrypt_cost: u32,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            bcrypt_cost: state.bcrypt_cost,
        }
    }
}

/// The query parameters accepted by the profile page.
#[derive(Debug, Default, Deserialize)]
pub struct ProfilePageQuery {
    pub status: Option<FlashStatus>,
}

/// Raw form data for profile updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub monthly_budget: String,
}

impl ProfileForm {
    /// Validate every field and build the profile update to write.
    ///
    /// Uniqueness of the email and username is checked against the database,
    /// excluding the user's own row so re-submitting unchanged values passes.
    pub fn validate(
        &self,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<ProfileUpdate, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = self.username.trim();
        match validate_username(username) {
            Ok(()) => match username_taken(username, Some(user_id), connection) {
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
            Ok(()) => match email_taken(email, Some(user_id), connection) {
                Ok(true) => errors.add("email", "This email is already in use"),
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

        if !CURRENCIES.iter().any(|(code, _)| *code == self.currency) {
            errors.add("currency", "Select a valid currency");
        }

        if !LANGUAGES.iter().any(|(code, _)| *code == self.language) {
            errors.add("language", "Select a valid language");
        }

        let monthly_budget = if self.monthly_budget.trim().is_empty() {
            None
        } else {
            match validate_amount(&self.monthly_budget, 0.01, MONTHLY_BUDGET_MAX) {
                Ok(amount) => Some(amount),
                Err(message) => {
                    errors.add("monthly_budget", message);
                    None
                }
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ProfileUpdate {
            username: username.to_string(),
            email: email.to_string(),
            phone: if phone.is_empty() {
                None
            } else {
                Some(phone.to_string())
            },
            currency: self.currency.clone(),
            language: self.language.clone(),
            monthly_budget,
        })
    }

    /// Rebuild the form data from the stored user row.
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
            phone: user.phone.clone().unwrap_or_default(),
            currency: user.currency.clone(),
            language: user.language.clone(),
            monthly_budget: user
                .monthly_budget
                .map(|budget| budget.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Raw form data for password changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Render the profile page.
pub async fn get_profile_page(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ProfilePageQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let alert = query.status.map(FlashStatus::into_alert);

    let page = profile_view(
        &ProfileForm::from_user(&user),
        &ValidationErrors::new(),
        &ValidationErrors::new(),
        alert,
    );

    Ok(Html(page.into_string()).into_response())
}

/// Handle profile update form submission.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let update = match form.validate(user_id, &connection) {
        Ok(update) => update,
        Err(errors) => {
            let page = profile_view(&form, &errors, &ValidationErrors::new(), None);
            return Ok(Html(page.into_string()).into_response());
        }
    };

    update_profile(user_id, &update, &connection)
        .inspect_err(|error| tracing::error!("Failed to update profile: {error}"))?;

    Ok(Redirect::to(&format!(
        "{}?{}",
        endpoints::PROFILE_VIEW,
        FlashStatus::ProfileUpdated.as_query()
    ))
    .into_response())
}

/// Handle password change form submission.
pub async fn change_password_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<PasswordChangeForm>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;

    let mut errors = ValidationErrors::new();

    match user.password_hash.verify(&form.current_password) {
        Ok(true) => {}
        Ok(false) => errors.add("current_password", "Current password is incorrect"),
        Err(error) => return Err(Error::HashingError(error.to_string())),
    }

    if form.new_password != form.confirm_password {
        errors.add("confirm_password", "Passwords do not match");
    }

    let password_hash = match PasswordHash::from_raw_password(&form.new_password, state.bcrypt_cost)
    {
        Ok(password_hash) => Some(password_hash),
        Err(Error::TooWeak(message)) => {
            errors.add("new_password", message);
            None
        }
        Err(error) => return Err(error),
    };

    match password_hash {
        Some(password_hash) if errors.is_empty() => {
            update_password_hash(user_id, &password_hash, &connection)
                .inspect_err(|error| tracing::error!("Failed to update password: {error}"))?;

            Ok(Redirect::to(&format!(
                "{}?{}",
                endpoints::PROFILE_VIEW,
                FlashStatus::PasswordChanged.as_query()
            ))
            .into_response())
        }
        _ => {
            let page = profile_view(
                &ProfileForm::from_user(&user),
                &ValidationErrors::new(),
                &errors,
                None,
            );
            Ok(Html(page.into_string()).into_response())
        }
    }
}

fn profile_view(
    form: &ProfileForm,
    errors: &ValidationErrors,
    password_errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW).into_html();

    let currency_options: Vec<(String, String)> = CURRENCIES
        .iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect();
    let language_options: Vec<(String, String)> = LANGUAGES
        .iter()
        .map(|(code, label)| (code.to_string(), label.to_string()))
        .collect();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            @if let Some(alert) = alert {
                (alert.into_html())
            }

            section class="space-y-8 w-full max-w-md"
            {
                section class="space-y-4"
                {
                    h1 class="text-xl font-bold" { "Profile" }

                    form
                        method="post"
                        action=(endpoints::PROFILE_VIEW)
                        class="w-full space-y-4 md:space-y-6"
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

                        (select_input(
                            "Currency",
                            "currency",
                            &currency_options,
                            &form.currency,
                            errors.get("currency"),
                        ))
                        (select_input(
                            "Language",
                            "language",
                            &language_options,
                            &form.language,
                            errors.get("language"),
                        ))

                        (text_input(
                            "Monthly budget (optional)",
                            "number",
                            "monthly_budget",
                            &form.monthly_budget,
                            false,
                            errors.get("monthly_budget"),
                        ))

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Changes" }
                    }
                }

                section class="space-y-4"
                {
                    h2 class="text-lg font-bold" { "Change Password" }

                    form
                        method="post"
                        action=(endpoints::CHANGE_PASSWORD)
                        class="w-full space-y-4 md:space-y-6"
                    {
                        (password_input(
                            "current_password",
                            "Current password",
                            password_errors.get("current_password"),
                        ))
                        (password_input(
                            "new_password",
                            "New password",
                            password_errors.get("new_password"),
                        ))
                        (password_input(
                            "confirm_password",
                            "Confirm new password",
                            password_errors.get("confirm_password"),
                        ))

                        button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Change Password" }
                    }
                }
            }
        }
    );

    base("Profile", &[], &content)
}
