//! Category management for classifying transactions.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod form;
mod list;

pub use create::create_category_endpoint;
pub use db::{
    category_name_taken, create_category, create_category_table, delete_category, get_categories,
    get_category, update_category,
};
pub use delete::delete_category_endpoint;
pub use domain::{Category, CategoryId, CategoryType, NewCategory};
pub use edit::{get_edit_category_page, update_category_endpoint};
pub use form::CategoryFormData;
pub use list::get_categories_page;
