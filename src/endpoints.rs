//! The application's route URIs.
//!
//! For endpoints that take a parameter, e.g., '/transactions/{transaction_id}/edit',
//! use [format_endpoint].

/// The root route which redirects to the dashboard or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page for displaying a user's transactions with filters and pagination.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The route for creating a transaction.
pub const CREATE_TRANSACTION: &str = "/transactions";
/// The page and route for editing an existing transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_id}/edit";
/// The route for deleting a transaction.
pub const DELETE_TRANSACTION: &str = "/transactions/{transaction_id}/delete";
/// The page for managing categories.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The route for creating a category.
pub const CREATE_CATEGORY: &str = "/categories";
/// The page and route for editing an existing category.
pub const EDIT_CATEGORY_VIEW: &str = "/categories/{category_id}/edit";
/// The route for deleting a category.
pub const DELETE_CATEGORY: &str = "/categories/{category_id}/delete";
/// The page for the summary reports.
pub const REPORTS_VIEW: &str = "/reports";
/// The route for downloading a CSV export of transactions.
pub const REPORT_EXPORT: &str = "/reports/export";
/// The page and route for editing the user's profile.
pub const PROFILE_VIEW: &str = "/profile";
/// The route for changing the user's password.
pub const CHANGE_PASSWORD: &str = "/profile/password";
/// The page and route for registering a new user.
pub const REGISTER_VIEW: &str = "/register";
/// The page and route for logging in.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/log_out";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The liveness probe.
pub const HEALTH: &str = "/health";
/// The route for switching the interface language.
pub const SET_LANGUAGE: &str = "/set-language/{lang}";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The JSON route for the user's summary statistics.
pub const STATISTICS_API: &str = "/api/statistics";
/// The JSON route for the income/expense chart series.
pub const TRANSACTIONS_CHART_API: &str = "/api/transactions/chart";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/transactions/{transaction_id}/edit',
/// '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
