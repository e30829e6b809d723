//! The reports page and CSV export.
//!
//! A report covers a date range, defaulting to the start of the current month
//! through today, and shows income/expense totals plus a per-category
//! breakdown. The same range can be exported as a CSV attachment.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::{
    AppState, Error,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, text_input,
    },
    navigation::NavBar,
    transaction::{FilterForm, TransactionFilter, TransactionRow, get_transaction_rows},
    user::{UserID, get_user_by_id},
    validation::ValidationErrors,
};

/// The state needed for the reports page and export endpoint.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters accepted by the reports page and export endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub date_from: String,
    #[serde(default)]
    pub date_to: String,
}

impl ReportQuery {
    /// Resolve the raw query into a date-range filter, applying the
    /// start-of-month-to-today default when a bound is missing or invalid.
    fn resolve(&self, today: Date) -> (FilterForm, TransactionFilter, ValidationErrors) {
        let form = FilterForm {
            date_from: if self.date_from.is_empty() {
                month_start_string(today)
            } else {
                self.date_from.clone()
            },
            date_to: if self.date_to.is_empty() {
                date_string(today)
            } else {
                self.date_to.clone()
            },
            ..Default::default()
        };

        let (filter, errors) = form.validate(today);

        (form, filter, errors)
    }
}

/// Income and expense totals per category within the report range.
#[derive(Debug, Clone, PartialEq)]
struct CategoryTotals {
    name: String,
    income: f64,
    expense: f64,
}

/// Render the reports page.
pub async fn get_reports_page(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let today = OffsetDateTime::now_utc().date();
    let (form, filter, errors) = query.resolve(today);

    let rows = report_rows(&filter, user_id, &connection)?;
    let totals = category_totals(&rows);
    let income: f64 = rows
        .iter()
        .filter(|row| row.transaction.transaction_type.as_str() == "income")
        .map(|row| row.transaction.amount)
        .sum();
    let expense: f64 = rows
        .iter()
        .filter(|row| row.transaction.transaction_type.as_str() == "expense")
        .map(|row| row.transaction.amount)
        .sum();

    let page = report_view(&form, &errors, income, expense, &totals, &user.currency);

    Ok(Html(page.into_string()).into_response())
}

/// Export the transactions in the report range as a CSV attachment.
pub async fn export_report_endpoint(
    State(state): State<ReportState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let today = OffsetDateTime::now_utc().date();
    let (_, filter, _) = query.resolve(today);
    let rows = report_rows(&filter, user_id, &connection)?;

    let csv = write_csv(&rows)?;
    let filename = format!("transactions_{}.csv", date_string(today));

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// All transactions in the report range, oldest first.
fn report_rows(
    filter: &TransactionFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let mut rows = get_transaction_rows(filter, user_id, i64::MAX as u64, 0, connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve report rows: {error}"))?;
    rows.reverse();

    Ok(rows)
}

fn category_totals(rows: &[TransactionRow]) -> Vec<CategoryTotals> {
    let mut totals: Vec<CategoryTotals> = Vec::new();

    for row in rows {
        let position = match totals
            .iter()
            .position(|entry| entry.name == row.category_name)
        {
            Some(position) => position,
            None => {
                totals.push(CategoryTotals {
                    name: row.category_name.clone(),
                    income: 0.0,
                    expense: 0.0,
                });
                totals.len() - 1
            }
        };
        let entry = &mut totals[position];

        match row.transaction.transaction_type {
            crate::transaction::TransactionType::Income => entry.income += row.transaction.amount,
            crate::transaction::TransactionType::Expense => entry.expense += row.transaction.amount,
        }
    }

    totals.sort_by(|a, b| {
        (b.income + b.expense)
            .partial_cmp(&(a.income + a.expense))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    totals
}

fn write_csv(rows: &[TransactionRow]) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["date", "amount", "type", "category", "description"])
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for row in rows {
        let transaction = &row.transaction;
        writer
            .write_record([
                &transaction.date.to_string(),
                &format!("{:.2}", transaction.amount),
                transaction.transaction_type.as_str(),
                &row.category_name,
                transaction.description.as_deref().unwrap_or_default(),
            ])
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

fn report_view(
    form: &FilterForm,
    errors: &ValidationErrors,
    income: f64,
    expense: f64,
    totals: &[CategoryTotals],
    currency: &str,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORTS_VIEW).into_html();
    let export_url = format!(
        "{}?date_from={}&date_to={}",
        endpoints::REPORT_EXPORT,
        form.date_from,
        form.date_to
    );

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Reports" }

                form
                    method="get"
                    action=(endpoints::REPORTS_VIEW)
                    class="flex flex-wrap items-end gap-4"
                {
                    (text_input(
                        "From",
                        "date",
                        "date_from",
                        &form.date_from,
                        true,
                        errors.get("date_from"),
                    ))
                    (text_input("To", "date", "date_to", &form.date_to, true, errors.get("date_to")))

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Apply" }
                    a href=(export_url) class=(BUTTON_SECONDARY_STYLE) { "Export CSV" }
                }

                div class="grid grid-cols-1 sm:grid-cols-3 gap-4"
                {
                    div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Income" }
                        p class="text-xl font-bold text-green-600 dark:text-green-400"
                        {
                            (format_currency(income, currency))
                        }
                    }
                    div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Expenses" }
                        p class="text-xl font-bold text-red-600 dark:text-red-400"
                        {
                            (format_currency(expense, currency))
                        }
                    }
                    div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow"
                    {
                        p class="text-sm text-gray-500 dark:text-gray-400" { "Net" }
                        p class="text-xl font-bold" { (format_currency(income - expense, currency)) }
                    }
                }

                section class="dark:bg-gray-800 overflow-x-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Income" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Expenses" }
                            }
                        }

                        tbody
                        {
                            @for entry in totals {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (entry.name) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_currency(entry.income, currency))
                                    }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_currency(entry.expense, currency))
                                    }
                                }
                            }

                            @if totals.is_empty() {
                                tr
                                {
                                    td
                                        colspan="3"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions in this period."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Reports", &[], &content)
}

fn date_string(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn month_start_string(today: Date) -> String {
    format!("{:04}-{:02}-01", today.year(), u8::from(today.month()))
}

#[cfg(test)]
mod report_tests {
    use axum::{
        Extension,
        body::to_bytes,
        extract::{Query, State},
        http::{StatusCode, header::CONTENT_DISPOSITION},
    };
    use time::OffsetDateTime;

    use crate::{
        category::{CategoryType, NewCategory, create_category},
        test_utils::{assert_valid_html, parse_html, state_with_test_user},
        transaction::{NewTransaction, TransactionType, create_transaction},
        user::UserID,
    };

    use super::{ReportQuery, ReportState, export_report_endpoint, get_reports_page};

    fn get_test_state() -> (ReportState, UserID) {
        let (db_connection, user_id) = state_with_test_user();

        (ReportState { db_connection }, user_id)
    }

    fn seed(state: &ReportState, user_id: UserID) {
        let connection = state.db_connection.lock().unwrap();
        let today = OffsetDateTime::now_utc().date();

        let category = create_category(
            NewCategory {
                user_id,
                name: "Groceries".to_string(),
                category_type: CategoryType::Expense,
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
                amount: 42.5,
                transaction_type: TransactionType::Expense,
                category_id: category.id,
                description: Some("weekly shop".to_string()),
                date: today,
            },
            &connection,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn report_page_shows_category_totals() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let response = get_reports_page(
            State(state),
            Extension(user_id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(html.html().contains("Groceries"));
        assert!(html.html().contains("Export CSV"));
    }

    #[tokio::test]
    async fn export_produces_csv_attachment() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let response = export_report_endpoint(
            State(state),
            Extension(user_id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .expect("response should have a content disposition header")
            .to_str()
            .unwrap()
            .to_owned();
        assert!(content_disposition.starts_with("attachment; filename=\"transactions_"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();

        assert!(csv.starts_with("date,amount,type,category,description"));
        assert!(csv.contains("42.50,expense,Groceries,weekly shop"));
    }

    #[tokio::test]
    async fn export_for_empty_range_has_only_headers() {
        let (state, user_id) = get_test_state();

        let response = export_report_endpoint(
            State(state),
            Extension(user_id),
            Query(ReportQuery::default()),
        )
        .await
        .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();

        assert_eq!(csv.trim(), "date,amount,type,category,description");
    }
}
