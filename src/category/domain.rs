//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::user::UserID;

/// The hex color assigned to categories created without an explicit color.
pub const DEFAULT_COLOR: &str = "#3498db";
/// The icon assigned to categories created without an explicit icon.
pub const DEFAULT_ICON: &str = "fa-folder";

/// Database identifier for a category.
pub type CategoryId = i64;

/// Which transaction types a category may be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
    Both,
}

impl CategoryType {
    /// The lowercase string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "income",
            CategoryType::Expense => "expense",
            CategoryType::Both => "both",
        }
    }
}

impl FromStr for CategoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryType::Income),
            "expense" => Ok(CategoryType::Expense),
            "both" => Ok(CategoryType::Both),
            other => Err(format!("unknown category type \"{other}\"")),
        }
    }
}

impl Display for CategoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-defined category for classifying transactions (e.g., 'Groceries', 'Salary').
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: UserID,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
    pub icon: String,
    pub budget_limit: Option<f64>,
    pub created_at: OffsetDateTime,
}

/// The fields needed to insert a new category row.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub user_id: UserID,
    pub name: String,
    pub category_type: CategoryType,
    pub color: String,
    pub icon: String,
    pub budget_limit: Option<f64>,
}

#[cfg(test)]
mod category_type_tests {
    use std::str::FromStr;

    use super::CategoryType;

    #[test]
    fn round_trips_through_strings() {
        for category_type in [
            CategoryType::Income,
            CategoryType::Expense,
            CategoryType::Both,
        ] {
            assert_eq!(
                CategoryType::from_str(category_type.as_str()),
                Ok(category_type)
            );
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(CategoryType::from_str("transfer").is_err());
    }
}
