//! The category create/edit form and its validation.

use serde::{Deserialize, Serialize};

use crate::{
    category::{
        NewCategory,
        domain::{DEFAULT_COLOR, DEFAULT_ICON},
    },
    user::UserID,
    validation::{
        ValidationErrors, validate_amount, validate_category_name, validate_hex_color,
        validate_icon,
    },
};

/// The highest budget limit a category may be given.
const BUDGET_LIMIT_MAX: f64 = 100_000.0;

/// Raw form data for category creation and editing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryFormData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category_type: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub budget_limit: String,
}

impl CategoryFormData {
    /// Validate every field and build the row to insert.
    ///
    /// Color and icon fall back to their defaults when left empty. The budget
    /// limit is optional.
    ///
    /// # Errors
    ///
    /// Returns the accumulated per-field error messages so the form can be
    /// re-rendered with all of them at once.
    pub fn validate(&self, user_id: UserID) -> Result<NewCategory, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.trim();
        if let Err(message) = validate_category_name(name) {
            errors.add("name", message);
        }

        let category_type = match self.category_type.parse() {
            Ok(category_type) => Some(category_type),
            Err(_) => {
                errors.add("category_type", "Select a valid category type");
                None
            }
        };

        let color = if self.color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            let color = self.color.trim().to_string();
            if let Err(message) = validate_hex_color(&color) {
                errors.add("color", message);
            }
            color
        };

        let icon = if self.icon.trim().is_empty() {
            DEFAULT_ICON.to_string()
        } else {
            let icon = self.icon.trim().to_string();
            if let Err(message) = validate_icon(&icon) {
                errors.add("icon", message);
            }
            icon
        };

        let budget_limit = if self.budget_limit.trim().is_empty() {
            None
        } else {
            match validate_amount(&self.budget_limit, 0.01, BUDGET_LIMIT_MAX) {
                Ok(amount) => Some(amount),
                Err(message) => {
                    errors.add("budget_limit", message);
                    None
                }
            }
        };

        match category_type {
            Some(category_type) if errors.is_empty() => Ok(NewCategory {
                user_id,
                name: name.to_string(),
                category_type,
                color,
                icon,
                budget_limit,
            }),
            _ => Err(errors),
        }
    }

    /// Rebuild the form data from an existing category, for the edit page.
    pub fn from_category(category: &crate::category::Category) -> Self {
        Self {
            name: category.name.clone(),
            category_type: category.category_type.to_string(),
            color: category.color.clone(),
            icon: category.icon.clone(),
            budget_limit: category
                .budget_limit
                .map(|limit| limit.to_string())
                .unwrap_or_default(),
        }
    }
}
