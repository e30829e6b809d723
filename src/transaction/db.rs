//! Database operations for transactions.
//!
//! All queries are scoped to a user ID so that one user can never read or
//! modify another user's transactions.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    transaction::{NewTransaction, Transaction, TransactionId},
    user::UserID,
};

/// Initialize the transactions table and indexes.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            amount REAL NOT NULL,
            type TEXT NOT NULL,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            description TEXT,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_user_id ON transactions(user_id);
        CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);",
    )?;

    Ok(())
}

/// Create a transaction and return it with its generated ID.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO transactions (user_id, amount, type, category_id, description, date, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            new_transaction.user_id.as_i64(),
            new_transaction.amount,
            new_transaction.transaction_type.as_str(),
            new_transaction.category_id,
            &new_transaction.description,
            new_transaction.date,
            created_at,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Transaction {
        id,
        user_id: new_transaction.user_id,
        amount: new_transaction.amount,
        transaction_type: new_transaction.transaction_type,
        category_id: new_transaction.category_id,
        description: new_transaction.description,
        date: new_transaction.date,
        created_at,
    })
}

/// Retrieve a single transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// a different user.
pub fn get_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, type, category_id, description, date, created_at
            FROM transactions WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &transaction_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Replace the editable fields of the transaction with `transaction_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingTransaction] if the transaction does not exist
/// or belongs to a different user.
pub fn update_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    update: &NewTransaction,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE transactions
        SET amount = ?1, type = ?2, category_id = ?3, description = ?4, date = ?5
        WHERE id = ?6 AND user_id = ?7",
        (
            update.amount,
            update.transaction_type.as_str(),
            update.category_id,
            &update.description,
            update.date,
            transaction_id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(())
}

/// Delete a transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if the transaction does not exist
/// or belongs to a different user.
pub fn delete_transaction(
    transaction_id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM transactions WHERE id = ?1 AND user_id = ?2",
        (transaction_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

pub(crate) fn map_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_type: String = row.get(3)?;
    let transaction_type = raw_type.parse().map_err(|_| {
        rusqlite::Error::InvalidColumnType(3, "type".to_owned(), rusqlite::types::Type::Text)
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        transaction_type,
        category_id: row.get(4)?,
        description: row.get(5)?,
        date: row.get(6)?,
        created_at: row.get(7)?,
    })
}
