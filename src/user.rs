//! Code for creating the users table and fetching and updating users.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The unique display name chosen at registration.
    pub username: String,
    /// The unique email address used for logging in.
    pub email: String,
    /// An optional phone number.
    pub phone: Option<String>,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The preferred display currency code, e.g. "RUB".
    pub currency: String,
    /// The preferred interface language code, e.g. "en".
    pub language: String,
    /// An optional overall monthly budget.
    pub monthly_budget: Option<f64>,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// The fields needed to insert a new user row.
pub struct NewUser {
    /// The unique display name chosen at registration.
    pub username: String,
    /// The unique email address used for logging in.
    pub email: String,
    /// An optional phone number.
    pub phone: Option<String>,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The profile fields that a full-replace profile update writes.
pub struct ProfileUpdate {
    /// The new username.
    pub username: String,
    /// The new email address.
    pub email: String,
    /// The new phone number, clearing the column when `None`.
    pub phone: Option<String>,
    /// The new display currency code.
    pub currency: String,
    /// The new interface language code.
    pub language: String,
    /// The new monthly budget, clearing the column when `None`.
    pub monthly_budget: Option<f64>,
}

/// Create the users table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            password_hash TEXT NOT NULL,
            currency TEXT NOT NULL DEFAULT 'RUB',
            language TEXT NOT NULL DEFAULT 'en',
            monthly_budget REAL,
            created_at TEXT NOT NULL
            )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns [Error::DuplicateEmail] or [Error::DuplicateUsername] if the email
/// or username is already taken, or [Error::SqlError] for other SQL errors.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO users (username, email, phone, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                &new_user.username,
                &new_user.email,
                &new_user.phone,
                new_user.password_hash.as_ref(),
                created_at,
            ),
        )
        .map_err(|error| match Error::from(error) {
            Error::DuplicateEmail(_) => Error::DuplicateEmail(new_user.email.clone()),
            Error::DuplicateUsername(_) => Error::DuplicateUsername(new_user.username.clone()),
            other => other,
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: new_user.username,
        email: new_user.email,
        phone: new_user.phone,
        password_hash: new_user.password_hash,
        currency: "RUB".to_string(),
        language: "en".to_string(),
        monthly_budget: None,
        created_at,
    })
}

/// Retrieve a user by their email address.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the email address.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, phone, password_hash, currency, language,
            monthly_budget, created_at FROM users WHERE email = :email",
        )?
        .query_row(&[(":email", email)], map_user_row)
        .map_err(|error| error.into())
}

/// Retrieve a user by their ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the ID.
pub fn get_user_by_id(id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, phone, password_hash, currency, language,
            monthly_budget, created_at FROM users WHERE id = :id",
        )?
        .query_row(&[(":id", &id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Whether another user (excluding `exclude`) already uses `email`.
pub fn email_taken(
    email: &str,
    exclude: Option<UserID>,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection
        .prepare("SELECT COUNT(*) FROM users WHERE email = ?1 AND id != ?2")?
        .query_row((email, exclude.map_or(-1, |id| id.as_i64())), |row| {
            row.get(0)
        })?;

    Ok(count > 0)
}

/// Whether another user (excluding `exclude`) already uses `username`.
pub fn username_taken(
    username: &str,
    exclude: Option<UserID>,
    connection: &Connection,
) -> Result<bool, Error> {
    let count: i64 = connection
        .prepare("SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2")?
        .query_row((username, exclude.map_or(-1, |id| id.as_i64())), |row| {
            row.get(0)
        })?;

    Ok(count > 0)
}

/// Replace the profile fields of the user with `id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the ID.
pub fn update_profile(
    id: UserID,
    update: &ProfileUpdate,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE users SET username = ?1, email = ?2, phone = ?3, currency = ?4,
        language = ?5, monthly_budget = ?6 WHERE id = ?7",
        (
            &update.username,
            &update.email,
            &update.phone,
            &update.currency,
            &update.language,
            update.monthly_budget,
            id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Replace the password hash of the user with `id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the ID.
pub fn update_password_hash(
    id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        (password_hash.as_ref(), id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        currency: row.get(5)?,
        language: row.get(6)?,
        monthly_budget: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod user_query_tests {
    use rusqlite::Connection;

    use crate::{Error, PasswordHash, user::ProfileUpdate};

    use super::{
        NewUser, create_user, create_user_table, email_taken, get_user_by_email, get_user_by_id,
        update_password_hash, update_profile, username_taken,
    };

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).expect("Could not create users table");
        connection
    }

    fn test_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: PasswordHash::new_unchecked("dummy_hash"),
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let connection = get_test_db_connection();

        let inserted = create_user(test_user("alice", "alice@example.com"), &connection)
            .expect("Could not create user");

        assert!(inserted.id.as_i64() > 0);
        assert_eq!(inserted.currency, "RUB");

        let by_email =
            get_user_by_email("alice@example.com", &connection).expect("Could not fetch user");
        assert_eq!(by_email, inserted);

        let by_id = get_user_by_id(inserted.id, &connection).expect("Could not fetch user");
        assert_eq!(by_id, inserted);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let connection = get_test_db_connection();
        create_user(test_user("alice", "alice@example.com"), &connection).unwrap();

        let result = create_user(test_user("bob", "alice@example.com"), &connection);

        assert_eq!(
            result.unwrap_err(),
            Error::DuplicateEmail("alice@example.com".to_string())
        );
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let connection = get_test_db_connection();
        create_user(test_user("alice", "alice@example.com"), &connection).unwrap();

        let result = create_user(test_user("alice", "alice2@example.com"), &connection);

        assert_eq!(
            result.unwrap_err(),
            Error::DuplicateUsername("alice".to_string())
        );
    }

    #[test]
    fn unknown_email_returns_not_found() {
        let connection = get_test_db_connection();

        let result = get_user_by_email("nobody@example.com", &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn taken_checks_exclude_own_row() {
        let connection = get_test_db_connection();
        let user = create_user(test_user("alice", "alice@example.com"), &connection).unwrap();

        assert!(email_taken("alice@example.com", None, &connection).unwrap());
        assert!(!email_taken("alice@example.com", Some(user.id), &connection).unwrap());
        assert!(username_taken("alice", None, &connection).unwrap());
        assert!(!username_taken("alice", Some(user.id), &connection).unwrap());
    }

    #[test]
    fn update_profile_replaces_fields() {
        let connection = get_test_db_connection();
        let user = create_user(test_user("alice", "alice@example.com"), &connection).unwrap();

        let update = ProfileUpdate {
            username: "alice_92".to_string(),
            email: "alice92@example.com".to_string(),
            phone: Some("+79161234567".to_string()),
            currency: "EUR".to_string(),
            language: "ru".to_string(),
            monthly_budget: Some(50_000.0),
        };
        update_profile(user.id, &update, &connection).expect("Could not update profile");

        let updated = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(updated.username, "alice_92");
        assert_eq!(updated.email, "alice92@example.com");
        assert_eq!(updated.phone.as_deref(), Some("+79161234567"));
        assert_eq!(updated.currency, "EUR");
        assert_eq!(updated.language, "ru");
        assert_eq!(updated.monthly_budget, Some(50_000.0));
    }

    #[test]
    fn update_password_hash_replaces_hash() {
        let connection = get_test_db_connection();
        let user = create_user(test_user("alice", "alice@example.com"), &connection).unwrap();

        let new_hash = PasswordHash::new_unchecked("another_hash");
        update_password_hash(user.id, &new_hash, &connection).expect("Could not update password");

        let updated = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(updated.password_hash, new_hash);
    }

    #[test]
    fn update_missing_user_returns_not_found() {
        let connection = get_test_db_connection();

        let result = update_password_hash(
            crate::UserID::new(999),
            &PasswordHash::new_unchecked("hash"),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
