//! The transaction create/edit form and its validation.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    category::{Category, CategoryType},
    transaction::{NewTransaction, TransactionType, filter::DATE_FORMAT},
    user::UserID,
    validation::{ValidationErrors, validate_amount, validate_date_not_future},
};

/// The highest amount a single transaction may record.
const AMOUNT_MAX: f64 = 1_000_000.0;

/// The maximum length of a transaction description.
const DESCRIPTION_MAX_LENGTH: usize = 500;

/// Substrings that mark a description as spam.
const BANNED_DESCRIPTION_TERMS: [&str; 3] = ["спам", "реклама", "мошенничество"];

/// Raw form data for transaction creation and editing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionFormData {
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
}

impl TransactionFormData {
    /// Validate every field and build the row to insert.
    ///
    /// `categories` must be the user's own categories. The selected category
    /// must be among them and its type must admit the transaction type, so a
    /// user can never post an income against an expense-only category or file
    /// a transaction under someone else's category.
    ///
    /// # Errors
    ///
    /// Returns the accumulated per-field error messages so the form can be
    /// re-rendered with all of them at once.
    pub fn validate(
        &self,
        user_id: UserID,
        categories: &[Category],
        today: Date,
    ) -> Result<NewTransaction, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let amount = match validate_amount(&self.amount, 0.01, AMOUNT_MAX) {
            Ok(amount) => Some(amount),
            Err(message) => {
                errors.add("amount", message);
                None
            }
        };

        let transaction_type: Option<TransactionType> = match self.transaction_type.parse() {
            Ok(transaction_type) => Some(transaction_type),
            Err(_) => {
                errors.add("transaction_type", "Select a valid transaction type");
                None
            }
        };

        let category_id = match self.category_id.parse::<i64>() {
            Ok(category_id) => {
                match categories.iter().find(|category| category.id == category_id) {
                    Some(category) => {
                        if let Some(transaction_type) = transaction_type
                            && !category_admits(category.category_type, transaction_type)
                        {
                            errors.add(
                                "category_id",
                                format!(
                                    "Category \"{}\" cannot be used for {} transactions",
                                    category.name, transaction_type
                                ),
                            );
                        }
                        Some(category_id)
                    }
                    None => {
                        errors.add("category_id", "Select a valid category");
                        None
                    }
                }
            }
            Err(_) => {
                errors.add("category_id", "Select a valid category");
                None
            }
        };

        let description = self.description.trim();
        if description.chars().count() > DESCRIPTION_MAX_LENGTH {
            errors.add(
                "description",
                format!("Description must not exceed {DESCRIPTION_MAX_LENGTH} characters"),
            );
        } else {
            let lowered = description.to_lowercase();
            if BANNED_DESCRIPTION_TERMS
                .iter()
                .any(|term| lowered.contains(term))
            {
                errors.add("description", "Description contains a forbidden term");
            }
        }

        let date = match Date::parse(&self.date, DATE_FORMAT) {
            Ok(date) => {
                if let Err(message) = validate_date_not_future(date, today, true) {
                    errors.add("date", message);
                }
                Some(date)
            }
            Err(_) => {
                errors.add("date", "Enter a valid date (YYYY-MM-DD)");
                None
            }
        };

        match (amount, transaction_type, category_id, date) {
            (Some(amount), Some(transaction_type), Some(category_id), Some(date))
                if errors.is_empty() =>
            {
                Ok(NewTransaction {
                    user_id,
                    amount,
                    transaction_type,
                    category_id,
                    description: if description.is_empty() {
                        None
                    } else {
                        Some(description.to_string())
                    },
                    date,
                })
            }
            _ => Err(errors),
        }
    }

    /// Rebuild the form data from an existing transaction, for the edit page.
    pub fn from_transaction(transaction: &crate::transaction::Transaction) -> Self {
        Self {
            amount: transaction.amount.to_string(),
            transaction_type: transaction.transaction_type.to_string(),
            category_id: transaction.category_id.to_string(),
            description: transaction.description.clone().unwrap_or_default(),
            date: transaction
                .date
                .format(DATE_FORMAT)
                .unwrap_or_default(),
        }
    }
}

/// Whether a category of `category_type` may hold a transaction of
/// `transaction_type`.
fn category_admits(category_type: CategoryType, transaction_type: TransactionType) -> bool {
    match category_type {
        CategoryType::Both => true,
        CategoryType::Income => transaction_type == TransactionType::Income,
        CategoryType::Expense => transaction_type == TransactionType::Expense,
    }
}
