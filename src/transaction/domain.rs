//! Core transaction domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{category::CategoryId, user::UserID};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Whether a transaction adds to or subtracts from the user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// The lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!("unknown transaction type \"{other}\"")),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single income or expense entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserID,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub date: Date,
    pub created_at: OffsetDateTime,
}

/// The fields needed to insert a new transaction row.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: UserID,
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub date: Date,
}
