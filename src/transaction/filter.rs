//! Filtering for the transactions list.
//!
//! The filter form arrives as query parameters so that a filtered view can be
//! bookmarked and so pagination links can reproduce the active filter. The
//! page query and the row-count query are built from the same WHERE clause so
//! the page count always matches the rows shown.

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, macros::format_description};

use crate::{
    Error,
    category::CategoryId,
    transaction::{Transaction, TransactionType, db::map_row},
    user::UserID,
    validation::ValidationErrors,
};

/// The date format used in filter query parameters and form fields.
pub(crate) const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// How far back a filter date range may reach.
const LOOKBACK_YEARS: i64 = 5;

/// The longest accepted description search term.
const SEARCH_MAX_LENGTH: usize = 100;

/// A validated transaction filter.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub category_id: Option<CategoryId>,
    pub date_from: Option<Date>,
    pub date_to: Option<Date>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub search: Option<String>,
}

/// The raw filter fields as they arrive in the query string.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterForm {
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
}

impl FilterForm {
    /// Whether no filter field was supplied.
    pub fn is_empty(&self) -> bool {
        self.transaction_type.is_empty()
            && self.category_id.is_empty()
            && self.date_from.is_empty()
            && self.date_to.is_empty()
            && self.min_amount.is_empty()
            && self.max_amount.is_empty()
            && self.search.is_empty()
    }

    /// Validate the raw fields into a [TransactionFilter].
    ///
    /// Invalid fields are reported and excluded from the returned filter, so a
    /// page with a bad hand-edited query string still renders.
    pub fn validate(&self, today: Date) -> (TransactionFilter, ValidationErrors) {
        let mut errors = ValidationErrors::new();
        let mut filter = TransactionFilter::default();
        let earliest = today - Duration::days(365 * LOOKBACK_YEARS);

        if !self.transaction_type.is_empty() {
            match self.transaction_type.parse() {
                Ok(transaction_type) => filter.transaction_type = Some(transaction_type),
                Err(_) => errors.add("transaction_type", "Select a valid transaction type"),
            }
        }

        if !self.category_id.is_empty() {
            match self.category_id.parse::<CategoryId>() {
                Ok(category_id) => filter.category_id = Some(category_id),
                Err(_) => errors.add("category_id", "Select a valid category"),
            }
        }

        let mut parse_date = |raw: &str, field: &'static str| -> Option<Date> {
            if raw.is_empty() {
                return None;
            }

            match Date::parse(raw, DATE_FORMAT) {
                Ok(date) if date < earliest => {
                    errors.add(
                        field,
                        format!("Date must be within the last {LOOKBACK_YEARS} years"),
                    );
                    None
                }
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add(field, "Enter a valid date (YYYY-MM-DD)");
                    None
                }
            }
        };

        filter.date_from = parse_date(&self.date_from, "date_from");
        filter.date_to = parse_date(&self.date_to, "date_to");

        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to)
            && to < from
        {
            errors.add("date_to", "End date must not be before start date");
            filter.date_to = None;
        }

        let mut parse_amount = |raw: &str, field: &'static str| -> Option<f64> {
            if raw.is_empty() {
                return None;
            }

            match raw.parse::<f64>() {
                Ok(amount) if amount.is_finite() && amount >= 0.0 => Some(amount),
                Ok(_) => {
                    errors.add(field, "Amount must not be negative");
                    None
                }
                Err(_) => {
                    errors.add(field, "Enter a valid amount");
                    None
                }
            }
        };

        filter.min_amount = parse_amount(&self.min_amount, "min_amount");
        filter.max_amount = parse_amount(&self.max_amount, "max_amount");

        if let (Some(min), Some(max)) = (filter.min_amount, filter.max_amount)
            && max < min
        {
            errors.add("max_amount", "Maximum amount must not be below the minimum");
            filter.max_amount = None;
        }

        let search = self.search.trim();
        if search.chars().count() > SEARCH_MAX_LENGTH {
            errors.add(
                "search",
                format!("Search term must not exceed {SEARCH_MAX_LENGTH} characters"),
            );
        } else if !search.is_empty() {
            filter.search = Some(search.to_string());
        }

        (filter, errors)
    }

    /// The query string for `page` of this filtered view, used to build
    /// pagination links that preserve the active filter.
    pub fn query_string(&self, page: u64) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        if !self.transaction_type.is_empty() {
            pairs.push(("transaction_type", self.transaction_type.clone()));
        }
        if !self.category_id.is_empty() {
            pairs.push(("category_id", self.category_id.clone()));
        }
        if !self.date_from.is_empty() {
            pairs.push(("date_from", self.date_from.clone()));
        }
        if !self.date_to.is_empty() {
            pairs.push(("date_to", self.date_to.clone()));
        }
        if !self.min_amount.is_empty() {
            pairs.push(("min_amount", self.min_amount.clone()));
        }
        if !self.max_amount.is_empty() {
            pairs.push(("max_amount", self.max_amount.clone()));
        }
        if !self.search.is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        pairs.push(("page", page.to_string()));

        serde_urlencoded::to_string(&pairs).unwrap_or_else(|_| format!("page={page}"))
    }
}

/// A transaction joined with its category's display fields for the listing table.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub transaction: Transaction,
    pub category_name: String,
    pub category_color: String,
    pub category_icon: String,
}

/// Build the WHERE clause and parameter list shared by the page and count queries.
fn build_where(filter: &TransactionFilter, user_id: UserID) -> (String, Vec<Value>) {
    let mut clauses = vec!["transactions.user_id = ?".to_string()];
    let mut params = vec![Value::Integer(user_id.as_i64())];

    if let Some(transaction_type) = filter.transaction_type {
        clauses.push("transactions.type = ?".to_string());
        params.push(Value::Text(transaction_type.as_str().to_string()));
    }

    if let Some(category_id) = filter.category_id {
        clauses.push("transactions.category_id = ?".to_string());
        params.push(Value::Integer(category_id));
    }

    if let Some(date_from) = filter.date_from
        && let Ok(date_string) = date_from.format(DATE_FORMAT)
    {
        clauses.push("transactions.date >= ?".to_string());
        params.push(Value::Text(date_string));
    }

    if let Some(date_to) = filter.date_to
        && let Ok(date_string) = date_to.format(DATE_FORMAT)
    {
        clauses.push("transactions.date <= ?".to_string());
        params.push(Value::Text(date_string));
    }

    if let Some(min_amount) = filter.min_amount {
        clauses.push("transactions.amount >= ?".to_string());
        params.push(Value::Real(min_amount));
    }

    if let Some(max_amount) = filter.max_amount {
        clauses.push("transactions.amount <= ?".to_string());
        params.push(Value::Real(max_amount));
    }

    if let Some(search) = &filter.search {
        clauses.push("transactions.description LIKE ?".to_string());
        params.push(Value::Text(format!("%{search}%")));
    }

    (clauses.join(" AND "), params)
}

/// Get one page of filtered transactions, newest first, joined with category
/// display data.
pub fn get_transaction_rows(
    filter: &TransactionFilter,
    user_id: UserID,
    limit: u64,
    offset: u64,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let (where_clause, mut params) = build_where(filter, user_id);

    // Sort by date, and then ID to keep transaction order stable after updates
    let query = format!(
        "SELECT transactions.id, transactions.user_id, transactions.amount, transactions.type, \
        transactions.category_id, transactions.description, transactions.date, \
        transactions.created_at, categories.name, categories.color, categories.icon \
        FROM transactions \
        INNER JOIN categories ON transactions.category_id = categories.id \
        WHERE {where_clause} \
        ORDER BY transactions.date DESC, transactions.id DESC \
        LIMIT ? OFFSET ?"
    );

    params.push(Value::Integer(limit as i64));
    params.push(Value::Integer(offset as i64));

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params), |row| {
            Ok(TransactionRow {
                transaction: map_row(row)?,
                category_name: row.get(8)?,
                category_color: row.get(9)?,
                category_icon: row.get(10)?,
            })
        })?
        .map(|row_result| row_result.map_err(Error::SqlError))
        .collect()
}

/// Count the transactions matching `filter`.
///
/// Uses the same WHERE clause as [get_transaction_rows] so the page count
/// always agrees with the rows shown.
pub fn count_transactions(
    filter: &TransactionFilter,
    user_id: UserID,
    connection: &Connection,
) -> Result<u64, Error> {
    let (where_clause, params) = build_where(filter, user_id);
    let query = format!("SELECT COUNT(*) FROM transactions WHERE {where_clause}");

    let count: i64 = connection
        .prepare(&query)?
        .query_row(params_from_iter(params), |row| row.get(0))?;

    Ok(count as u64)
}
