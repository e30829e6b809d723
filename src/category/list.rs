//! Categories listing page with per-category transaction totals and the
//! category creation form.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::{AlertTemplate, FlashStatus},
    category::{Category, CategoryId, form::CategoryFormData, get_categories},
    endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, select_input, text_input,
    },
    navigation::NavBar,
    user::{UserID, get_user_by_id},
    validation::ValidationErrors,
};

/// The state needed for the categories listing page.
#[derive(Debug, Clone)]
pub struct CategoriesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters accepted by the categories page.
#[derive(Debug, Default, Deserialize)]
pub struct CategoriesPageQuery {
    pub status: Option<FlashStatus>,
}

/// Per-category transaction totals shown in the listing table.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CategoryStats {
    pub transaction_count: i64,
    pub income_total: f64,
    pub expense_total: f64,
}

/// Render the categories page.
pub async fn get_categories_page(
    State(state): State<CategoriesPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CategoriesPageQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let alert = query.status.map(FlashStatus::into_alert);

    let page = render_categories_page(
        user_id,
        &connection,
        &CategoryFormData::default(),
        &ValidationErrors::new(),
        alert,
    )?;

    Ok(Html(page.into_string()).into_response())
}

/// Build the full categories page, optionally re-displaying a submitted form
/// with its validation errors.
pub(crate) fn render_categories_page(
    user_id: UserID,
    connection: &Connection,
    form: &CategoryFormData,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Result<Markup, Error> {
    let user = get_user_by_id(user_id, connection)?;
    let categories = get_categories(user_id, connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let stats = category_stats(user_id, connection)
        .inspect_err(|error| tracing::error!("Could not compute category totals: {error}"))?;

    Ok(categories_view(
        &categories,
        &stats,
        &user.currency,
        form,
        errors,
        alert,
    ))
}

/// Count and sum each category's transactions for the listing table.
fn category_stats(
    user_id: UserID,
    connection: &Connection,
) -> Result<HashMap<CategoryId, CategoryStats>, Error> {
    let result: Result<HashMap<CategoryId, CategoryStats>, rusqlite::Error> = connection
        .prepare(
            "SELECT category_id, COUNT(1),
                SUM(CASE WHEN type = 'income' THEN amount ELSE 0 END),
                SUM(CASE WHEN type = 'expense' THEN amount ELSE 0 END)
            FROM transactions WHERE user_id = :user_id GROUP BY category_id",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            let category_id: CategoryId = row.get(0)?;
            let stats = CategoryStats {
                transaction_count: row.get(1)?,
                income_total: row.get(2)?,
                expense_total: row.get(3)?,
            };

            Ok((category_id, stats))
        })?
        .collect();

    result.map_err(Error::from)
}

/// The category create/edit form fields.
///
/// Shared between the categories page (create) and the edit page (update).
pub(crate) fn category_form_view(
    action: &str,
    form: &CategoryFormData,
    errors: &ValidationErrors,
    submit_label: &str,
) -> Markup {
    let type_options = [
        ("expense".to_string(), "Expense".to_string()),
        ("income".to_string(), "Income".to_string()),
        ("both".to_string(), "Both".to_string()),
    ];

    html! {
        form
            method="post"
            action=(action)
            class="w-full space-y-4 md:space-y-6"
        {
            (text_input("Name", "text", "name", &form.name, true, errors.get("name")))

            (select_input(
                "Type",
                "category_type",
                &type_options,
                &form.category_type,
                errors.get("category_type"),
            ))

            div
            {
                label for="color" class=(FORM_LABEL_STYLE) { "Color" }

                input
                    type="color"
                    name="color"
                    id="color"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.color);

                @if let Some(error_message) = errors.get("color")
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            (text_input("Icon", "text", "icon", &form.icon, false, errors.get("icon")))
            (text_input(
                "Monthly budget limit (optional)",
                "number",
                "budget_limit",
                &form.budget_limit,
                false,
                errors.get("budget_limit"),
            ))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { (submit_label) }
        }
    }
}

fn categories_view(
    categories: &[Category],
    stats: &HashMap<CategoryId, CategoryStats>,
    currency: &str,
    form: &CategoryFormData,
    errors: &ValidationErrors,
    alert: Option<AlertTemplate>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::CATEGORIES_VIEW).into_html();

    let table_row = |category: &Category| {
        let category_stats = stats.get(&category.id).copied().unwrap_or_default();
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_CATEGORY_VIEW, category.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_CATEGORY, category.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'?",
            category.name
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    span
                        class=(CATEGORY_BADGE_STYLE)
                        style=(format!("background-color: {};", category.color))
                    {
                        i class=(category.icon) {}
                        " "
                        (category.name)
                    }
                }

                td class=(TABLE_CELL_STYLE) { (category.category_type) }
                td class=(TABLE_CELL_STYLE) { (category_stats.transaction_count) }
                td class=(TABLE_CELL_STYLE)
                {
                    (format_currency(category_stats.income_total, currency))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    (format_currency(category_stats.expense_total, currency))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    @match category.budget_limit {
                        Some(limit) => (format_currency(limit, currency)),
                        None => "—",
                    }
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        a href=(edit_url) class=(LINK_STYLE) { "Edit" }

                        form
                            method="post"
                            action=(delete_url)
                            onsubmit=(format!("return confirm(\"{confirm_message}\");"))
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
                    h1 class="text-xl font-bold" { "Categories" }
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Transactions" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Income" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Expenses" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for category in categories {
                                (table_row(category))
                            }

                            @if categories.is_empty() {
                                tr
                                {
                                    td
                                        colspan="7"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No categories created yet. \
                                        Use the form below to create your first category."
                                    }
                                }
                            }
                        }
                    }
                }

                section class="max-w-md space-y-4"
                {
                    h2 class="text-lg font-bold" { "New Category" }

                    (category_form_view(
                        endpoints::CREATE_CATEGORY,
                        form,
                        errors,
                        "Create Category",
                    ))
                }
            }
        }
    );

    base("Categories", &[], &content)
}

#[cfg(test)]
mod categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::{Query, State}, http::StatusCode};
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        category::{CategoryType, NewCategory, create_category},
        db::initialize,
        test_utils::{assert_valid_html, parse_html, state_with_test_user},
        transaction::{NewTransaction, TransactionType, create_transaction},
        user::UserID,
    };

    use super::{CategoriesPageQuery, CategoriesPageState, category_stats, get_categories_page};

    fn get_test_state() -> (CategoriesPageState, UserID) {
        let (db_connection, user_id) = state_with_test_user();

        (CategoriesPageState { db_connection }, user_id)
    }

    #[tokio::test]
    async fn page_lists_categories_with_counts() {
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

        let response = get_categories_page(
            State(state),
            Extension(user_id),
            Query(CategoriesPageQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html(response).await;
        assert_valid_html(&html);
        assert!(html.html().contains("Groceries"));
    }

    #[test]
    fn stats_are_scoped_to_user() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let category = create_category(
            NewCategory {
                user_id: UserID::new(1),
                name: "Salary".to_string(),
                category_type: CategoryType::Income,
                color: "#3498db".to_string(),
                icon: "fa-folder".to_string(),
                budget_limit: None,
            },
            &connection,
        )
        .unwrap();

        for (user_id, amount) in [(UserID::new(1), 100.0), (UserID::new(2), 999.0)] {
            create_transaction(
                NewTransaction {
                    user_id,
                    amount,
                    transaction_type: TransactionType::Income,
                    category_id: category.id,
                    description: None,
                    date: OffsetDateTime::now_utc().date(),
                },
                &connection,
            )
            .unwrap();
        }

        let stats = category_stats(UserID::new(1), &connection).unwrap();

        assert_eq!(stats[&category.id].transaction_count, 1);
        assert_eq!(stats[&category.id].income_total, 100.0);
        assert_eq!(stats[&category.id].expense_total, 0.0);
    }
}
