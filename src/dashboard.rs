//! The dashboard page, showing summary figures and recent transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    endpoints,
    html::{
        CATEGORY_BADGE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    statistics::{Statistics, calculate_statistics},
    transaction::{TransactionFilter, TransactionRow, TransactionType, get_transaction_rows},
    user::{UserID, get_user_by_id},
};

/// How many recent transactions the dashboard shows.
const RECENT_TRANSACTION_COUNT: u64 = 10;

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the dashboard page.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)?;
    let statistics = calculate_statistics(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not calculate statistics: {error}"))?;
    let recent = get_transaction_rows(
        &TransactionFilter::default(),
        user_id,
        RECENT_TRANSACTION_COUNT,
        0,
        &connection,
    )
    .inspect_err(|error| tracing::error!("Failed to retrieve recent transactions: {error}"))?;

    let page = dashboard_view(
        &user.username,
        &statistics,
        user.monthly_budget,
        &user.currency,
        &recent,
    );

    Ok(Html(page.into_string()).into_response())
}

fn summary_card(title: &str, value: Markup) -> Markup {
    html!(
        div class="p-4 rounded-lg bg-white dark:bg-gray-800 shadow space-y-1"
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (title) }
            p class="text-xl font-bold" { (value) }
        }
    )
}

fn dashboard_view(
    username: &str,
    statistics: &Statistics,
    monthly_budget: Option<f64>,
    currency: &str,
    recent: &[TransactionRow],
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let budget_card = monthly_budget.map(|budget| {
        let remaining = budget - statistics.month_expense;
        let style = if remaining < 0.0 {
            "text-red-600 dark:text-red-400"
        } else {
            "text-green-600 dark:text-green-400"
        };

        summary_card(
            "Budget remaining this month",
            html!(span class=(style) { (format_currency(remaining, currency)) }),
        )
    });

    let recent_row = |row: &TransactionRow| {
        let transaction = &row.transaction;
        let (sign, amount_style) = match transaction.transaction_type {
            TransactionType::Income => ("+", "text-green-600 dark:text-green-400"),
            TransactionType::Expense => ("-", "text-red-600 dark:text-red-400"),
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }

                td class=(TABLE_CELL_STYLE)
                {
                    span
                        class=(CATEGORY_BADGE_STYLE)
                        style=(format!("background-color: {};", row.category_color))
                    {
                        (row.category_name)
                    }
                }

                td class=(format!("{TABLE_CELL_STYLE} font-semibold {amount_style}"))
                {
                    (sign)
                    (format_currency(transaction.amount, currency))
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-6 w-full lg:max-w-5xl"
            {
                h1 class="text-xl font-bold" { "Welcome back, " (username) "!" }

                div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
                {
                    (summary_card(
                        "Balance",
                        html!((format_currency(statistics.balance, currency))),
                    ))
                    (summary_card(
                        "Income this month",
                        html!((format_currency(statistics.month_income, currency))),
                    ))
                    (summary_card(
                        "Expenses this month",
                        html!((format_currency(statistics.month_expense, currency))),
                    ))

                    @if let Some(budget_card) = budget_card {
                        (budget_card)
                    } @else {
                        (summary_card(
                            "Transactions",
                            html!((statistics.transaction_count)),
                        ))
                    }
                }

                section class="space-y-2"
                {
                    header class="flex justify-between items-end"
                    {
                        h2 class="text-lg font-bold" { "Recent Transactions" }
                        a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE) { "View all" }
                    }

                    @if recent.is_empty() {
                        p class="text-gray-500 dark:text-gray-400"
                        {
                            "No transactions yet. "
                            a href=(endpoints::TRANSACTIONS_VIEW) class=(LINK_STYLE)
                            {
                                "Record your first transaction"
                            }
                            "."
                        }
                    } @else {
                        div class="dark:bg-gray-800 overflow-x-auto"
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
                                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                    }
                                }

                                tbody
                                {
                                    @for row in recent {
                                        (recent_row(row))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Dashboard", &[], &content)
}

#[cfg(test)]
mod dashboard_tests {
    use axum::{Extension, extract::State, http::StatusCode};
    use time::OffsetDateTime;

    use crate::{
        category::{CategoryType, NewCategory, create_category},
        test_utils::{assert_valid_html, parse_html, state_with_test_user},
        transaction::{NewTransaction, TransactionType, create_transaction},
        user::UserID,
    };

    use super::{DashboardState, get_dashboard_page};

    fn get_test_state() -> (DashboardState, UserID) {
        let (db_connection, user_id) = state_with_test_user();

        (DashboardState { db_connection }, user_id)
    }

    #[tokio::test]
    async fn dashboard_shows_empty_state() {
        let (state, user_id) = get_test_state();

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(html.html().contains("No transactions yet"));
    }

    #[tokio::test]
    async fn dashboard_shows_recent_transactions() {
        let (state, user_id) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
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
                    amount: 25.0,
                    transaction_type: TransactionType::Expense,
                    category_id: category.id,
                    description: None,
                    date: OffsetDateTime::now_utc().date(),
                },
                &connection,
            )
            .unwrap();
        }

        let response = get_dashboard_page(State(state), Extension(user_id))
            .await
            .unwrap();

        let html = parse_html(response).await;
        assert!(html.html().contains("Groceries"));
        assert!(html.html().contains("Recent Transactions"));
    }
}
