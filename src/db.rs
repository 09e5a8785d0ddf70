//! Database initialisation and helpers shared by the model modules.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::{
    Error, account::create_account_table, auth::create_session_table,
    category::create_category_table, transaction::create_transaction_table,
    user::create_user_table,
};

/// The number of rows changed by an `UPDATE` or `DELETE` statement.
pub(crate) type RowsAffected = usize;

/// The current UTC time truncated to whole seconds, so that timestamps read
/// back from the database compare equal to the ones that were written.
pub(crate) fn now_utc() -> OffsetDateTime {
    truncate_to_seconds(OffsetDateTime::now_utc())
}

/// Drop the sub-second part of `date_time` and convert it to UTC.
pub(crate) fn truncate_to_seconds(date_time: OffsetDateTime) -> OffsetDateTime {
    let date_time = date_time.to_offset(time::UtcOffset::UTC);

    date_time.replace_nanosecond(0).unwrap_or(date_time)
}

/// Create all of the database tables for the application.
///
/// Foreign key enforcement is switched on for `connection`, which the
/// cascading user deletes and the category/account delete guards rely on.
///
/// # Errors
/// This function may return a [Error::SqlError] if something went wrong creating the tables.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_category_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Map a failed delete of a parent row to [Error::ResourceInUse] when child
/// rows still refer to it.
pub(crate) fn map_delete_error(error: rusqlite::Error, resource: &'static str) -> Error {
    match error {
        // Code 787 occurs when a FOREIGN KEY constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, _) if sql_error.extended_code == 787 => {
            Error::ResourceInUse(resource)
        }
        error => error.into(),
    }
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
