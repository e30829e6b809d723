//! Transaction creation endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::FlashStatus,
    category::get_categories,
    endpoints,
    pagination::PaginationConfig,
    transaction::{
        create_transaction,
        filter::FilterForm,
        form::TransactionFormData,
        list::render_transactions_page,
    },
    user::UserID,
};

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for CreateTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// Handle transaction creation form submission.
///
/// On success redirects back to the transactions page. On validation failure
/// the page is re-rendered with the submitted values and per-field errors.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionEndpointState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionFormData>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let today = OffsetDateTime::now_utc().date();

    let new_transaction = match form.validate(user_id, &categories, today) {
        Ok(new_transaction) => new_transaction,
        Err(errors) => {
            let page = render_transactions_page(
                user_id,
                &connection,
                &state.pagination_config,
                &FilterForm::default(),
                1,
                &form,
                &errors,
                None,
            )?;
            return Ok(Html(page.into_string()).into_response());
        }
    };

    create_transaction(new_transaction, &connection)
        .inspect_err(|error| tracing::error!("Failed to create transaction: {error}"))?;

    Ok(Redirect::to(&format!(
        "{}?{}",
        endpoints::TRANSACTIONS_VIEW,
        FlashStatus::TransactionCreated.as_query()
    ))
    .into_response())
}
