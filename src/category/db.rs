//! Database operations for categories.
//!
//! All queries are scoped to a user ID so that one user can never read or
//! modify another user's categories.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryType, NewCategory},
    user::UserID,
};

/// Initialize the categories table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            type TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            budget_limit REAL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, name)
        );

        CREATE INDEX IF NOT EXISTS idx_categories_user_id ON categories(user_id);",
    )?;

    Ok(())
}

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if the user already has a category
/// with this name.
pub fn create_category(new_category: NewCategory, connection: &Connection) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO categories (user_id, name, type, color, icon, budget_limit, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            (
                new_category.user_id.as_i64(),
                &new_category.name,
                new_category.category_type.as_str(),
                &new_category.color,
                &new_category.icon,
                new_category.budget_limit,
                created_at,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("categories") =>
            {
                Error::DuplicateCategoryName(new_category.name.clone())
            }
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id: new_category.user_id,
        name: new_category.name,
        category_type: new_category.category_type,
        color: new_category.color,
        icon: new_category.icon,
        budget_limit: new_category.budget_limit,
        created_at,
    })
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the category does not exist or belongs to a
/// different user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, color, icon, budget_limit, created_at
            FROM categories WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &category_id), (":user_id", &user_id.as_i64())],
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories ordered alphabetically by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, type, color, icon, budget_limit, created_at
            FROM categories WHERE user_id = :user_id ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Whether the user already has another category (excluding `exclude`) named `name`.
///
/// The comparison is case-insensitive, matching SQLite's default NOCASE
/// behavior for LIKE.
pub fn category_name_taken(
    name: &str,
    user_id: UserID,
    exclude: Option<CategoryId>,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection
        .prepare(
            "SELECT COUNT(*) FROM categories
            WHERE user_id = ?1 AND name = ?2 COLLATE NOCASE AND id != ?3",
        )?
        .query_row(
            (user_id.as_i64(), name, exclude.unwrap_or(-1)),
            |row| row.get(0),
        )?;

    Ok(count > 0)
}

/// Replace the editable fields of the category with `category_id`.
///
/// # Errors
///
/// Returns [Error::UpdateMissingCategory] if the category does not exist or
/// belongs to a different user.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserID,
    update: &NewCategory,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "UPDATE categories SET name = ?1, type = ?2, color = ?3, icon = ?4, budget_limit = ?5
            WHERE id = ?6 AND user_id = ?7",
            (
                &update.name,
                update.category_type.as_str(),
                &update.color,
                &update.icon,
                update.budget_limit,
                category_id,
                user_id.as_i64(),
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("categories") =>
            {
                Error::DuplicateCategoryName(update.name.clone())
            }
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category owned by `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::CategoryInUse] if any transactions still reference the category.
/// - [Error::DeleteMissingCategory] if the category does not exist or belongs
///   to a different user.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction_count: i64 = connection
        .prepare("SELECT COUNT(*) FROM transactions WHERE category_id = ?1 AND user_id = ?2")?
        .query_row((category_id, user_id.as_i64()), |row| row.get(0))?;

    if transaction_count > 0 {
        return Err(Error::CategoryInUse);
    }

    let rows_affected = connection.execute(
        "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_type: String = row.get(3)?;
    let category_type = raw_type.parse().map_err(|_| {
        rusqlite::Error::InvalidColumnType(3, "type".to_owned(), rusqlite::types::Type::Text)
    })?;

    Ok(Category {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        category_type,
        color: row.get(4)?,
        icon: row.get(5)?,
        budget_limit: row.get(6)?,
        created_at: row.get(7)?,
    })
}
