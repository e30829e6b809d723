//! Transaction editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::FlashStatus,
    category::{Category, get_categories},
    endpoints,
    html::{FORM_CONTAINER_STYLE, base},
    navigation::NavBar,
    transaction::{
        TransactionId, form::TransactionFormData, get_transaction, list::transaction_form_view,
        update_transaction,
    },
    user::UserID,
    validation::ValidationErrors,
};

/// The state needed for the edit transaction page and its form submission.
#[derive(Debug, Clone)]
pub struct EditTransactionState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the transaction editing page.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = get_transaction(transaction_id, user_id, &connection)?;
    let categories = get_categories(user_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let form = TransactionFormData::from_transaction(&transaction);

    let page = edit_transaction_view(transaction_id, &form, &ValidationErrors::new(), &categories);

    Ok(Html(page.into_string()).into_response())
}

/// Handle transaction update form submission.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionState>,
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

    let update = match form.validate(user_id, &categories, today) {
        Ok(update) => update,
        Err(errors) => {
            let page = edit_transaction_view(transaction_id, &form, &errors, &categories);
            return Ok(Html(page.into_string()).into_response());
        }
    };

    update_transaction(transaction_id, user_id, &update, &connection).inspect_err(|error| {
        tracing::error!("Failed to update transaction {transaction_id}: {error}")
    })?;

    Ok(Redirect::to(&format!(
        "{}?{}",
        endpoints::TRANSACTIONS_VIEW,
        FlashStatus::TransactionUpdated.as_query()
    ))
    .into_response())
}

fn edit_transaction_view(
    transaction_id: TransactionId,
    form: &TransactionFormData,
    errors: &ValidationErrors,
    categories: &[Category],
) -> Markup {
    let edit_endpoint =
        endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction_id);
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Edit Transaction" }

            (transaction_form_view(
                &edit_endpoint,
                form,
                errors,
                categories,
                "Update Transaction",
            ))
        }
    };

    base("Edit Transaction", &[], &content)
}

#[cfg(test)]
mod edit_transaction_tests {
    use axum::{
        Extension, Form,
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use time::OffsetDateTime;

    use crate::{
        Error,
        alert::FlashStatus,
        category::{CategoryType, NewCategory, create_category},
        endpoints,
        test_utils::{
            assert_redirect_to, assert_valid_html, must_get_form, parse_html, state_with_test_user,
        },
        transaction::{
            NewTransaction, Transaction, TransactionFormData, TransactionType, create_transaction,
            get_transaction,
        },
        user::UserID,
    };

    use super::{EditTransactionState, get_edit_transaction_page, update_transaction_endpoint};

    fn setup() -> (EditTransactionState, UserID, Transaction) {
        let (db_connection, user_id) = state_with_test_user();

        let transaction = {
            let connection = db_connection.lock().unwrap();
            let category = create_category(
                NewCategory {
                    user_id,
                    name: "Groceries".to_string(),
                    category_type: CategoryType::Both,
                    color: "#3498db".to_string(),
                    icon: "fa-folder".to_string(),
                    budget_limit: None,
                },
                &connection,
            )
            .unwrap();

            create_transaction(
                NewTransaction {
                    user_id,
                    amount: 25.0,
                    transaction_type: TransactionType::Expense,
                    category_id: category.id,
                    description: Some("weekly shop".to_string()),
                    date: OffsetDateTime::now_utc().date(),
                },
                &connection,
            )
            .unwrap()
        };

        (EditTransactionState { db_connection }, user_id, transaction)
    }

    #[tokio::test]
    async fn edit_page_pre_fills_form() {
        let (state, user_id, transaction) = setup();

        let response =
            get_edit_transaction_page(Path(transaction.id), State(state), Extension(user_id))
                .await
                .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert!(form.html().contains("weekly shop"));
        assert!(form.html().contains("25"));
    }

    #[tokio::test]
    async fn edit_page_for_other_users_transaction_is_not_found() {
        let (state, _, transaction) = setup();
        let other_user = UserID::new(999);

        let result =
            get_edit_transaction_page(Path(transaction.id), State(state), Extension(other_user))
                .await;

        assert!(matches!(result, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn update_transaction_endpoint_succeeds() {
        let (state, user_id, transaction) = setup();

        let mut form = TransactionFormData::from_transaction(&transaction);
        form.amount = "99.99".to_string();
        form.transaction_type = "income".to_string();
        form.description = String::new();

        let response = update_transaction_endpoint(
            Path(transaction.id),
            State(state.clone()),
            Extension(user_id),
            Form(form),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_redirect_to(
            &response,
            &format!(
                "{}?{}",
                endpoints::TRANSACTIONS_VIEW,
                FlashStatus::TransactionUpdated.as_query()
            ),
        );

        let connection = state.db_connection.lock().unwrap();
        let updated = get_transaction(transaction.id, user_id, &connection).unwrap();
        assert_eq!(updated.amount, 99.99);
        assert_eq!(updated.transaction_type, TransactionType::Income);
        assert_eq!(updated.description, None);
    }

    #[tokio::test]
    async fn update_with_invalid_form_re_renders_with_errors() {
        let (state, user_id, transaction) = setup();

        let mut form = TransactionFormData::from_transaction(&transaction);
        form.amount = "not a number".to_string();

        let response = update_transaction_endpoint(
            Path(transaction.id),
            State(state),
            Extension(user_id),
            Form(form),
        )
        .await
        .unwrap()
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert!(html.html().contains("Enter a valid amount"));
    }
}
