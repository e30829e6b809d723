//! Category deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::FlashStatus,
    category::{CategoryId, db::delete_category, form::CategoryFormData, list::render_categories_page},
    endpoints,
    user::UserID,
    validation::ValidationErrors,
};

/// The state needed for deleting a category.
#[derive(Debug, Clone)]
pub struct DeleteCategoryEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteCategoryEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle category deletion.
///
/// A category that still has transactions cannot be deleted; the categories
/// page is re-rendered with an explanatory alert instead.
pub async fn delete_category_endpoint(
    Path(category_id): Path<CategoryId>,
    State(state): State<DeleteCategoryEndpointState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match delete_category(category_id, user_id, &connection) {
        Ok(()) => Ok(Redirect::to(&format!(
            "{}?{}",
            endpoints::CATEGORIES_VIEW,
            FlashStatus::CategoryDeleted.as_query()
        ))
        .into_response()),
        Err(error @ (Error::CategoryInUse | Error::DeleteMissingCategory)) => {
            let page = render_categories_page(
                user_id,
                &connection,
                &CategoryFormData::default(),
                &ValidationErrors::new(),
                Some(error.into_alert()),
            )?;
            Ok(Html(page.into_string()).into_response())
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting category {category_id}: {error}"
            );
            Err(error)
        }
    }
}
