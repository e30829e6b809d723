//! Category editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::{AlertTemplate, FlashStatus},
    category::{
        CategoryId, form::CategoryFormData, get_category, list::category_form_view,
        update_category,
    },
    endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    user::UserID,
    validation::ValidationErrors,
};

/// The state needed for the edit category page and its form submission.
#[derive(Debug, Clone)]
pub struct EditCategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditCategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the category editing page.
pub async fn get_edit_category_page(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let category = get_category(category_id, user_id, &connection)?;
    let form = CategoryFormData::from_category(&category);

    let page = edit_category_view(category_id, &form, &ValidationErrors::new(), None);

    Ok(Html(page.into_string()).into_response())
}

/// Handle category update form submission.
pub async fn update_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<EditCategoryState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<CategoryFormData>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let update = match form.validate(user_id) {
        Ok(update) => update,
        Err(errors) => {
            let page = edit_category_view(category_id, &form, &errors, None);
            return Ok(Html(page.into_string()).into_response());
        }
    };

    match update_category(category_id, user_id, &update, &connection) {
        Ok(()) => Ok(Redirect::to(&format!(
            "{}?{}",
            endpoints::CATEGORIES_VIEW,
            FlashStatus::CategoryUpdated.as_query()
        ))
        .into_response()),
        Err(error @ Error::DuplicateCategoryName(_)) => {
            let page = edit_category_view(
                category_id,
                &form,
                &ValidationErrors::new(),
                Some(error.into_alert()),
            );
            Ok(Html(page.into_string()).into_response())
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating category {category_id}: {error}"
            );
            Err(error)
        }
    }
}

fn edit_category_view(
    category_id: CategoryId,
    form: &CategoryFormData,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Markup {
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category_id);
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            @if let Some(alert) = alert {
                (alert.into_html())
            }

            h1 class="text-xl font-bold mb-4" { "Edit Category" }

            (category_form_view(&edit_endpoint, form, errors, "Update Category"))
        }
    };

    base("Edit Category", &[], &content)
}
