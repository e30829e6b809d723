//! Category creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::FlashStatus,
    category::{create_category, form::CategoryFormData, list::render_categories_page},
    endpoints,
    user::UserID,
    validation::ValidationErrors,
};

/// The state needed for creating a category.
#[derive(Debug, Clone)]
pub struct CreateCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category creation form submission.
///
/// On success redirects back to the categories page. On validation failure the
/// page is re-rendered with the submitted values and per-field errors.
pub async fn create_category_endpoint(
    State(state): State<CreateCategoryEndpointState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<CategoryFormData>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let new_category = match form.validate(user_id) {
        Ok(new_category) => new_category,
        Err(errors) => {
            let page = render_categories_page(user_id, &connection, &form, &errors, None)?;
            return Ok(Html(page.into_string()).into_response());
        }
    };

    match create_category(new_category, &connection) {
        Ok(_) => Ok(Redirect::to(&format!(
            "{}?{}",
            endpoints::CATEGORIES_VIEW,
            FlashStatus::CategoryCreated.as_query()
        ))
        .into_response()),
        Err(error @ Error::DuplicateCategoryName(_)) => {
            let page = render_categories_page(
                user_id,
                &connection,
                &form,
                &ValidationErrors::new(),
                Some(error.into_alert()),
            )?;
            Ok(Html(page.into_string()).into_response())
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            Err(error)
        }
    }
}

#[cfg(test)]
mod create_category_endpoint_tests {
    use axum::{
        Extension, Form,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
    };

    use crate::{
        alert::FlashStatus,
        category::{CategoryFormData, CategoryType, get_categories},
        endpoints,
        test_utils::{assert_redirect_to, assert_valid_html, parse_html, state_with_test_user},
    };

    use super::{CreateCategoryEndpointState, create_category_endpoint};

    fn valid_form() -> CategoryFormData {
        CategoryFormData {
            name: "Groceries".to_string(),
            category_type: "expense".to_string(),
            color: "#3498db".to_string(),
            icon: "fa-shopping-cart".to_string(),
            budget_limit: String::new(),
        }
    }

    #[tokio::test]
    async fn can_create_category() {
        let (db_connection, user_id) = state_with_test_user();
        let state = CreateCategoryEndpointState {
            db_connection: db_connection.clone(),
        };

        let response = create_category_endpoint(State(state), Extension(user_id), Form(valid_form()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_redirect_to(
            &response,
            &format!(
                "{}?{}",
                endpoints::CATEGORIES_VIEW,
                FlashStatus::CategoryCreated.as_query()
            ),
        );

        let connection = db_connection.lock().unwrap();
        let categories = get_categories(user_id, &connection).unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name, "Groceries");
        assert_eq!(categories[0].category_type, CategoryType::Expense);
    }

    #[tokio::test]
    async fn invalid_form_re_renders_page_with_errors() {
        let (db_connection, user_id) = state_with_test_user();
        let state = CreateCategoryEndpointState {
            db_connection: db_connection.clone(),
        };

        let mut form = valid_form();
        form.name = "!".to_string();

        let response = create_category_endpoint(State(state), Extension(user_id), Form(form))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(
            html.html()
                .contains("Category name must be between 2 and 50 characters")
        );

        let connection = db_connection.lock().unwrap();
        assert!(get_categories(user_id, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_name_shows_alert() {
        let (db_connection, user_id) = state_with_test_user();
        let state = CreateCategoryEndpointState {
            db_connection: db_connection.clone(),
        };

        create_category_endpoint(
            State(state.clone()),
            Extension(user_id),
            Form(valid_form()),
        )
        .await
        .unwrap();

        let response = create_category_endpoint(State(state), Extension(user_id), Form(valid_form()))
            .await
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains("Duplicate category name"));
    }
}
