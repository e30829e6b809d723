//! JSON statistics endpoints backing the dashboard summary cards and charts.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Date, Duration, OffsetDateTime};

use crate::{AppState, Error, user::UserID};

/// The state needed for the statistics API endpoints.
#[derive(Debug, Clone)]
pub struct StatisticsApiState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StatisticsApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Aggregate transaction figures for one user.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub month_income: f64,
    pub month_expense: f64,
    pub transaction_count: i64,
}

/// Expense totals per category, for the breakdown chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub color: String,
    pub total: f64,
}

/// One point in the income/expense time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub income: f64,
    pub expense: f64,
}

/// The time window and bucketing of the chart series.
///
/// Unrecognised `period` values fall back to the last 30 days.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    /// Daily buckets since the first of the current month.
    #[default]
    Month,
    /// Monthly buckets since the first of January.
    Year,
    /// Daily buckets over the last 30 days.
    #[serde(other)]
    Last30Days,
}

/// The query parameters accepted by the chart endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ChartQuery {
    #[serde(default)]
    pub period: ChartPeriod,
}

/// Compute the all-time and current-month totals for `user_id`.
pub fn calculate_statistics(user_id: UserID, connection: &Connection) -> Result<Statistics, Error> {
    let today = OffsetDateTime::now_utc().date();
    let month_start = month_start_string(today);

    connection
        .prepare(
            "SELECT
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'income' AND date >= :month_start
                    THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' AND date >= :month_start
                    THEN amount ELSE 0 END), 0),
                COUNT(1)
            FROM transactions WHERE user_id = :user_id",
        )?
        .query_row(
            &[
                (":month_start", &month_start as &dyn rusqlite::ToSql),
                (":user_id", &user_id.as_i64()),
            ],
            |row| {
                let total_income: f64 = row.get(0)?;
                let total_expense: f64 = row.get(1)?;

                Ok(Statistics {
                    total_income,
                    total_expense,
                    balance: total_income - total_expense,
                    month_income: row.get(2)?,
                    month_expense: row.get(3)?,
                    transaction_count: row.get(4)?,
                })
            },
        )
        .map_err(Error::from)
}

/// Sum each category's expenses for the breakdown chart, largest first.
pub fn expense_breakdown(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<CategoryBreakdown>, Error> {
    connection
        .prepare(
            "SELECT categories.name, categories.color, SUM(transactions.amount) AS total
            FROM transactions
            INNER JOIN categories ON transactions.category_id = categories.id
            WHERE transactions.user_id = :user_id AND transactions.type = 'expense'
            GROUP BY transactions.category_id
            ORDER BY total DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(CategoryBreakdown {
                name: row.get(0)?,
                color: row.get(1)?,
                total: row.get(2)?,
            })
        })?
        .map(|row_result| row_result.map_err(Error::SqlError))
        .collect()
}

/// Bucket income and expense totals by day or month, oldest bucket first.
///
/// Dates are stored as `YYYY-MM-DD` text so bucketing is a substring: the
/// first 10 characters group by day, the first 7 by month.
pub fn chart_series(
    user_id: UserID,
    period: ChartPeriod,
    connection: &Connection,
) -> Result<Vec<ChartPoint>, Error> {
    let today = OffsetDateTime::now_utc().date();
    let (label_length, cutoff) = match period {
        ChartPeriod::Month => (10, month_start_string(today)),
        ChartPeriod::Year => (7, format!("{:04}-01-01", today.year())),
        ChartPeriod::Last30Days => (10, date_string(today - Duration::days(30))),
    };

    connection
        .prepare(
            "SELECT substr(date, 1, :label_length) AS label,
                COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN type = 'expense' THEN amount ELSE 0 END), 0)
            FROM transactions
            WHERE user_id = :user_id AND date >= :cutoff
            GROUP BY label
            ORDER BY label ASC",
        )?
        .query_map(
            &[
                (":label_length", &label_length as &dyn rusqlite::ToSql),
                (":user_id", &user_id.as_i64()),
                (":cutoff", &cutoff),
            ],
            |row| {
                Ok(ChartPoint {
                    label: row.get(0)?,
                    income: row.get(1)?,
                    expense: row.get(2)?,
                })
            },
        )?
        .map(|row_result| row_result.map_err(Error::SqlError))
        .collect()
}

/// Serve the dashboard summary figures as JSON.
pub async fn get_statistics_endpoint(
    State(state): State<StatisticsApiState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let statistics = calculate_statistics(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not calculate statistics: {error}"))?;
    let breakdown = expense_breakdown(user_id, &connection)
        .inspect_err(|error| tracing::error!("Could not compute expense breakdown: {error}"))?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "statistics": statistics,
            "expense_breakdown": breakdown,
        },
    }))
    .into_response())
}

/// Serve the income/expense time series as JSON.
pub async fn get_transactions_chart_endpoint(
    State(state): State<StatisticsApiState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ChartQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let series = chart_series(user_id, query.period, &connection)
        .inspect_err(|error| tracing::error!("Could not compute chart series: {error}"))?;

    Ok(Json(json!({
        "success": true,
        "data": { "series": series },
    }))
    .into_response())
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
mod statistics_tests {
    use axum::{Extension, body::to_bytes, extract::{Query, State}, http::StatusCode};
    use time::{Duration, OffsetDateTime};

    use crate::{
        category::{CategoryType, NewCategory, create_category},
        test_utils::state_with_test_user,
        transaction::{NewTransaction, TransactionType, create_transaction},
        user::UserID,
    };

    use super::{
        ChartPeriod, ChartQuery, StatisticsApiState, calculate_statistics, chart_series,
        expense_breakdown, get_statistics_endpoint, get_transactions_chart_endpoint,
    };

    fn get_test_state() -> (StatisticsApiState, UserID) {
        let (db_connection, user_id) = state_with_test_user();

        (StatisticsApiState { db_connection }, user_id)
    }

    fn seed(state: &StatisticsApiState, user_id: UserID) {
        let connection = state.db_connection.lock().unwrap();
        let today = OffsetDateTime::now_utc().date();

        let salary = create_category(
            NewCategory {
                user_id,
                name: "Salary".to_string(),
                category_type: CategoryType::Income,
                color: "#2ecc71".to_string(),
                icon: "fa-money-bill".to_string(),
                budget_limit: None,
            },
            &connection,
        )
        .unwrap();
        let groceries = create_category(
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

        let entries = [
            (1000.0, TransactionType::Income, salary.id, today),
            (200.0, TransactionType::Expense, groceries.id, today),
            // Old enough to fall outside the current month (and the 30 day chart).
            (50.0, TransactionType::Expense, groceries.id, today - Duration::days(60)),
        ];

        for (amount, transaction_type, category_id, date) in entries {
            create_transaction(
                NewTransaction {
                    user_id,
                    amount,
                    transaction_type,
                    category_id,
                    description: None,
                    date,
                },
                &connection,
            )
            .unwrap();
        }
    }

    #[test]
    fn statistics_sum_totals_and_current_month() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let connection = state.db_connection.lock().unwrap();
        let statistics = calculate_statistics(user_id, &connection).unwrap();

        assert_eq!(statistics.total_income, 1000.0);
        assert_eq!(statistics.total_expense, 250.0);
        assert_eq!(statistics.balance, 750.0);
        assert_eq!(statistics.month_income, 1000.0);
        assert_eq!(statistics.month_expense, 200.0);
        assert_eq!(statistics.transaction_count, 3);
    }

    #[test]
    fn statistics_for_user_without_transactions_are_zero() {
        let (state, user_id) = get_test_state();

        let connection = state.db_connection.lock().unwrap();
        let statistics = calculate_statistics(user_id, &connection).unwrap();

        assert_eq!(statistics, super::Statistics::default());
    }

    #[test]
    fn breakdown_sums_expenses_per_category() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let connection = state.db_connection.lock().unwrap();
        let breakdown = expense_breakdown(user_id, &connection).unwrap();

        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].name, "Groceries");
        assert_eq!(breakdown[0].total, 250.0);
    }

    #[test]
    fn thirty_day_series_excludes_old_transactions() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let connection = state.db_connection.lock().unwrap();
        let series = chart_series(user_id, ChartPeriod::Last30Days, &connection).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].income, 1000.0);
        assert_eq!(series[0].expense, 200.0);
    }

    #[test]
    fn unknown_period_falls_back_to_thirty_days() {
        let query: ChartQuery = serde_urlencoded::from_str("period=week").unwrap();

        assert_eq!(query.period, ChartPeriod::Last30Days);
    }

    #[tokio::test]
    async fn statistics_endpoint_returns_success_envelope() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let response = get_statistics_endpoint(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["statistics"]["balance"], 750.0);
    }

    #[tokio::test]
    async fn chart_endpoint_returns_series() {
        let (state, user_id) = get_test_state();
        seed(&state, user_id);

        let response = get_transactions_chart_endpoint(
            State(state),
            Extension(user_id),
            Query(ChartQuery::default()),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], true);
        assert!(json["data"]["series"].as_array().unwrap().len() >= 1);
    }
}
