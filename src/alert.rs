//! Alert banners for displaying success and error messages to users.
//!
//! Handlers that redirect after a successful write append a `status` query
//! parameter to the target URL. The target page converts the status back into
//! a success banner via [FlashStatus]. Errors are rendered in place with
//! [AlertTemplate] directly.

use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertType {
    Success,
    Error,
}

/// Renders alert messages with appropriate styling
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTemplate {
    pub alert_type: AlertType,
    pub message: String,
    pub details: String,
}

impl AlertTemplate {
    /// Create a new success alert
    pub fn success(message: &str, details: &str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message: message.to_string(),
            details: details.to_string(),
        }
    }

    /// Create a new error alert
    pub fn error(message: &str, details: &str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message: message.to_string(),
            details: details.to_string(),
        }
    }

    pub fn into_html(self) -> Markup {
        // Template adapted from https://flowbite.com/docs/components/alerts/
        let (container_style, role) = match self.alert_type {
            AlertType::Success => (
                "w-full max-w-md p-4 mb-4 text-sm text-green-800 rounded-lg \
                bg-green-50 dark:bg-gray-800 dark:text-green-400",
                "status",
            ),
            AlertType::Error => (
                "w-full max-w-md p-4 mb-4 text-sm text-red-800 rounded-lg \
                bg-red-50 dark:bg-gray-800 dark:text-red-400",
                "alert",
            ),
        };

        html!(
            div class=(container_style) role=(role)
            {
                span class="font-medium" { (self.message) }

                @if !self.details.is_empty()
                {
                    " " (self.details)
                }
            }
        )
    }
}

/// The outcome codes that survive a redirect as a `status` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub enum FlashStatus {
    #[serde(rename = "transaction_created")]
    TransactionCreated,
    #[serde(rename = "transaction_updated")]
    TransactionUpdated,
    #[serde(rename = "transaction_deleted")]
    TransactionDeleted,
    #[serde(rename = "category_created")]
    CategoryCreated,
    #[serde(rename = "category_updated")]
    CategoryUpdated,
    #[serde(rename = "category_deleted")]
    CategoryDeleted,
    #[serde(rename = "profile_updated")]
    ProfileUpdated,
    #[serde(rename = "password_changed")]
    PasswordChanged,
    #[serde(rename = "registered")]
    Registered,
}

impl FlashStatus {
    /// The query string fragment to append to a redirect URL.
    pub fn as_query(&self) -> &'static str {
        match self {
            FlashStatus::TransactionCreated => "status=transaction_created",
            FlashStatus::TransactionUpdated => "status=transaction_updated",
            FlashStatus::TransactionDeleted => "status=transaction_deleted",
            FlashStatus::CategoryCreated => "status=category_created",
            FlashStatus::CategoryUpdated => "status=category_updated",
            FlashStatus::CategoryDeleted => "status=category_deleted",
            FlashStatus::ProfileUpdated => "status=profile_updated",
            FlashStatus::PasswordChanged => "status=password_changed",
            FlashStatus::Registered => "status=registered",
        }
    }

    /// The success banner for this outcome.
    pub fn into_alert(self) -> AlertTemplate {
        match self {
            FlashStatus::TransactionCreated => {
                AlertTemplate::success("Transaction added.", "")
            }
            FlashStatus::TransactionUpdated => {
                AlertTemplate::success("Transaction updated.", "")
            }
            FlashStatus::TransactionDeleted => {
                AlertTemplate::success("Transaction deleted.", "")
            }
            FlashStatus::CategoryCreated => AlertTemplate::success("Category added.", ""),
            FlashStatus::CategoryUpdated => AlertTemplate::success("Category updated.", ""),
            FlashStatus::CategoryDeleted => AlertTemplate::success("Category deleted.", ""),
            FlashStatus::ProfileUpdated => AlertTemplate::success("Profile updated.", ""),
            FlashStatus::PasswordChanged => AlertTemplate::success("Password changed.", ""),
            FlashStatus::Registered => AlertTemplate::success(
                "Registration successful.",
                "Log in with your new account to get started.",
            ),
        }
    }
}
