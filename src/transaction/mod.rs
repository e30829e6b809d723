//! Recording and browsing income and expense transactions.

mod create;
mod db;
mod delete;
mod domain;
mod edit;
mod filter;
mod form;
mod list;

pub use create::create_transaction_endpoint;
pub use db::{
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    update_transaction,
};
pub use delete::delete_transaction_endpoint;
pub use domain::{NewTransaction, Transaction, TransactionId, TransactionType};
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use filter::{
    FilterForm, TransactionFilter, TransactionRow, count_transactions, get_transaction_rows,
};
pub use form::TransactionFormData;
pub use list::get_transactions_page;
