//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    auth::PasswordHash,
    db::{RowsAffected, now_utc},
};

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
    /// The user's display name.
    pub name: String,
    /// The email the user logs in with. Unique across users.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// When the user registered.
    pub created_at: OffsetDateTime,
    /// When the user's details were last changed.
    pub updated_at: OffsetDateTime,
}

/// The data needed to insert a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The user's display name.
    pub name: String,
    /// The email the user logs in with.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// The fields of a user that may be shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct UserProfile {
    pub id: UserID,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "criado_em", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(rename = "atualizado_em", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// The new values for a user. The password is left unchanged when
/// `password_hash` is `None`.
#[derive(Debug, Clone)]
pub(crate) struct UserUpdate {
    pub name: String,
    pub email: String,
    pub password_hash: Option<PasswordHash>,
}

/// Check that `email` is a valid email address and return it without
/// surrounding whitespace.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if `email` is not a valid address.
pub(crate) fn validate_email(email: &str) -> Result<String, Error> {
    EmailAddress::from_str(email.trim())
        .map(|address| address.to_string())
        .map_err(|_| Error::InvalidEmail(email.to_owned()))
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub(crate) fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS usuarios (
                id INTEGER PRIMARY KEY,
                nome TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                senha TEXT NOT NULL,
                criado_em TEXT NOT NULL,
                atualizado_em TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str = "id, nome, email, senha, criado_em, atualizado_em";

fn map_row_to_user(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - [Error::SqlError] if an SQL related error occurred.
pub fn create_user(new_user: &NewUser, connection: &Connection) -> Result<User, Error> {
    let now = now_utc();

    connection.execute(
        "INSERT INTO usuarios (nome, email, senha, criado_em, atualizado_em)
            VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            new_user.name,
            new_user.email,
            new_user.password_hash.to_string(),
            now
        ],
    )?;

    Ok(User {
        id: UserID::new(connection.last_insert_rowid()),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        password_hash: new_user.password_hash.clone(),
        created_at: now,
        updated_at: now,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub(crate) fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM usuarios WHERE id = ?1"),
            params![user_id.as_i64()],
            map_row_to_user,
        )
        .optional()?
        .ok_or(Error::NotFound("user"))
}

/// Whether a user with `user_id` is still registered.
pub(crate) fn user_exists(user_id: UserID, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM usuarios WHERE id = ?1)",
            params![user_id.as_i64()],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that email.
pub(crate) fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM usuarios WHERE email = ?1"),
            params![email],
            map_row_to_user,
        )
        .optional()?
        .ok_or(Error::NotFound("user"))
}

/// Get every registered user, in registration order.
pub(crate) fn list_users(connection: &Connection) -> Result<Vec<User>, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM usuarios ORDER BY id"))?
        .query_map([], map_row_to_user)?
        .map(|maybe_user| maybe_user.map_err(Error::from))
        .collect()
}

/// Overwrite the name and email (and optionally the password) of `user_id`.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the user does not exist,
/// - [Error::DuplicateEmail] if another user already has the new email.
pub(crate) fn update_user(
    user_id: UserID,
    update: &UserUpdate,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .query_row(
            &format!(
                "UPDATE usuarios
                SET nome = ?1, email = ?2, senha = COALESCE(?3, senha), atualizado_em = ?4
                WHERE id = ?5
                RETURNING {USER_COLUMNS}"
            ),
            params![
                update.name,
                update.email,
                update.password_hash.as_ref().map(|hash| hash.to_string()),
                now_utc(),
                user_id.as_i64()
            ],
            map_row_to_user,
        )
        .optional()?
        .ok_or(Error::NotFound("user"))
}

/// Delete the user. Their categories, accounts, transactions and sessions are
/// removed with them.
pub(crate) fn delete_user(user_id: UserID, connection: &Connection) -> Result<RowsAffected, Error> {
    connection
        .execute(
            "DELETE FROM usuarios WHERE id = ?1",
            params![user_id.as_i64()],
        )
        .map_err(Error::from)
}
