//! Transactions listing page with filtering, pagination and the transaction
//! creation form.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    alert::{AlertTemplate, FlashStatus},
    category::{Category, get_categories},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, CATEGORY_BADGE_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
        select_input, text_input,
    },
    navigation::NavBar,
    pagination::{PaginationConfig, create_pagination_indicators, page_count, pagination_nav},
    transaction::{
        TransactionType,
        filter::{DATE_FORMAT, FilterForm, TransactionRow, count_transactions, get_transaction_rows},
        form::TransactionFormData,
    },
    user::{UserID, get_user_by_id},
    validation::ValidationErrors,
};

/// The state needed for the transactions listing page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters accepted by the transactions page.
///
/// The filter fields are inlined rather than nested because
/// `serde_urlencoded` does not support flattened structs.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsPageQuery {
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
    #[serde(default)]
    pub min_amount: String,
    #[serde(default)]
    pub max_amount: String,
    #[serde(default)]
    pub search: String,
    pub page: Option<u64>,
    pub status: Option<FlashStatus>,
}

impl TransactionsPageQuery {
    fn filter_form(&self) -> FilterForm {
        FilterForm {
            transaction_type: self.transaction_type.clone(),
            category_id: self.category_id.clone(),
            date_from: self.date_from.clone(),
            date_to: self.date_to.clone(),
            min_amount: self.min_amount.clone(),
            max_amount: self.max_amount.clone(),
            search: self.search.clone(),
        }
    }
}

/// Render the transactions page.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<TransactionsPageQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let alert = query.status.map(FlashStatus::into_alert);
    let page_number = query.page.unwrap_or(state.pagination_config.default_page);

    let page = render_transactions_page(
        user_id,
        &connection,
        &state.pagination_config,
        &query.filter_form(),
        page_number,
        &TransactionFormData::default(),
        &ValidationErrors::new(),
        alert,
    )?;

    Ok(Html(page.into_string()).into_response())
}

/// Build the full transactions page, optionally re-displaying a submitted
/// creation form with its validation errors.
#[allow(clippy::too_many_arguments)]
pub(crate) fn render_transactions_page(
    user_id: UserID,
    connection: &Connection,
    pagination_config: &PaginationConfig,
    filter_form: &FilterForm,
    page_number: u64,
    form: &TransactionFormData,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Result<Markup, Error> {
    let user = get_user_by_id(user_id, connection)?;
    let categories = get_categories(user_id, connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    let today = OffsetDateTime::now_utc().date();
    let (filter, filter_errors) = filter_form.validate(today);

    let transaction_count = count_transactions(&filter, user_id, connection)
        .inspect_err(|error| tracing::error!("Could not count transactions: {error}"))?;
    let page_size = pagination_config.default_page_size;
    let pages = page_count(transaction_count, page_size);
    let curr_page = page_number.clamp(1, pages);

    let rows = get_transaction_rows(
        &filter,
        user_id,
        page_size,
        (curr_page - 1) * page_size,
        connection,
    )
    .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    let indicators = create_pagination_indicators(curr_page, pages, pagination_config.max_pages);
    let pagination = pagination_nav(&indicators, |page| {
        format!(
            "{}?{}",
            endpoints::TRANSACTIONS_VIEW,
            filter_form.query_string(page)
        )
    });

    Ok(transactions_view(
        &rows,
        &categories,
        &user.currency,
        filter_form,
        &filter_errors,
        pagination,
        form,
        errors,
        alert,
    ))
}

/// The transaction create/edit form fields.
///
/// Shared between the transactions page (create) and the edit page (update).
pub(crate) fn transaction_form_view(
    action: &str,
    form: &TransactionFormData,
    errors: &ValidationErrors,
    categories: &[Category],
    submit_label: &str,
) -> Markup {
    let type_options = [
        ("expense".to_string(), "Expense".to_string()),
        ("income".to_string(), "Income".to_string()),
    ];
    let category_options: Vec<(String, String)> = categories
        .iter()
        .map(|category| (category.id.to_string(), category.name.clone()))
        .collect();

    html! {
        form
            method="post"
            action=(action)
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    type="number"
                    name="amount"
                    id="amount"
                    step="0.01"
                    min="0.01"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.amount)
                    required;

                @if let Some(error_message) = errors.get("amount")
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            (select_input(
                "Type",
                "transaction_type",
                &type_options,
                &form.transaction_type,
                errors.get("transaction_type"),
            ))

            (select_input(
                "Category",
                "category_id",
                &category_options,
                &form.category_id,
                errors.get("category_id"),
            ))

            (text_input(
                "Description (optional)",
                "text",
                "description",
                &form.description,
                false,
                errors.get("description"),
            ))
            (text_input("Date", "date", "date", &form.date, true, errors.get("date")))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_label) }
        }
    }
}

/// The filter controls shown above the transactions table.
fn filter_form_view(
    filter_form: &FilterForm,
    filter_errors: &ValidationErrors,
    categories: &[Category],
) -> Markup {
    let type_options = [
        (String::new(), "All types".to_string()),
        ("income".to_string(), "Income".to_string()),
        ("expense".to_string(), "Expense".to_string()),
    ];
    let mut category_options = vec![(String::new(), "All categories".to_string())];
    category_options.extend(
        categories
            .iter()
            .map(|category| (category.id.to_string(), category.name.clone())),
    );

    html!(
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="flex flex-wrap items-end gap-4"
        {
            (select_input(
                "Type",
                "transaction_type",
                &type_options,
                &filter_form.transaction_type,
                filter_errors.get("transaction_type"),
            ))

            (select_input(
                "Category",
                "category_id",
                &category_options,
                &filter_form.category_id,
                filter_errors.get("category_id"),
            ))

            (text_input(
                "From",
                "date",
                "date_from",
                &filter_form.date_from,
                false,
                filter_errors.get("date_from"),
            ))
            (text_input(
                "To",
                "date",
                "date_to",
                &filter_form.date_to,
                false,
                filter_errors.get("date_to"),
            ))

            (text_input(
                "Min amount",
                "number",
                "min_amount",
                &filter_form.min_amount,
                false,
                filter_errors.get("min_amount"),
            ))
            (text_input(
                "Max amount",
                "number",
                "max_amount",
                &filter_form.max_amount,
                false,
                filter_errors.get("max_amount"),
            ))

            (text_input(
                "Search description",
                "search",
                "search",
                &filter_form.search,
                false,
                filter_errors.get("search"),
            ))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Filter" }

            @if !filter_form.is_empty() {
                a href=(endpoints::TRANSACTIONS_VIEW) class=(BUTTON_SECONDARY_STYLE) { "Clear" }
            }
        }
    )
}

#[allow(clippy::too_many_arguments)]
fn transactions_view(
    rows: &[TransactionRow],
    categories: &[Category],
    currency: &str,
    filter_form: &FilterForm,
    filter_errors: &ValidationErrors,
    pagination: Markup,
    form: &TransactionFormData,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let table_row = |row: &TransactionRow| {
        let transaction = &row.transaction;
        let edit_url =
            endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_TRANSACTION, transaction.id);
        let date_string = transaction.date.format(DATE_FORMAT).unwrap_or_default();
        let (sign, amount_style) = match transaction.transaction_type {
            TransactionType::Income => ("+", "text-green-600 dark:text-green-400"),
            TransactionType::Expense => ("-", "text-red-600 dark:text-red-400"),
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (date_string) }

                td class=(TABLE_CELL_STYLE)
                {
                    span
                        class=(CATEGORY_BADGE_STYLE)
                        style=(format!("background-color: {};", row.category_color))
                    {
                        i class=(row.category_icon) {}
                        " "
                        (row.category_name)
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    @match &transaction.description {
                        Some(description) => (description),
                        None => "—",
                    }
                }

                td class=(TABLE_CELL_STYLE) { (transaction.transaction_type) }

                td class=(format!("{TABLE_CELL_STYLE} font-semibold {amount_style}"))
                {
                    (sign)
                    (format_currency(transaction.amount, currency))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                        form
                            method="post"
                            action=(delete_url)
                            onsubmit="return confirm(\"Are you sure you want to \
                                delete this transaction?\");"
                        {
                            button type="submit" class=(BUTTON_DELETE_STYLE) { "Delete" }
                        }
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            @if let Some(alert) = alert {
                (alert.into_html())
            }

            section class="space-y-4 w-full lg:max-w-5xl"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Transactions" }
                }

                (filter_form_view(filter_form, filter_errors, categories))

                section class="dark:bg-gray-800 overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in rows {
                                (table_row(row))
                            }

                            @if rows.is_empty() {
                                tr
                                {
                                    td
                                        colspan="6"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions found. \
                                        Use the form below to record your first transaction."
                                    }
                                }
                            }
                        }
                    }
                }

                (pagination)

                section class="max-w-md space-y-4"
                {
                    h2 class="text-lg font-bold" { "New Transaction" }

                    (transaction_form_view(
                        endpoints::CREATE_TRANSACTION,
                        form,
                        errors,
                        categories,
                        "Create Transaction",
                    ))
                }
            }
        }
    );

    base("Transactions", &[], &content)
}
