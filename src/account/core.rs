use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::{Error, db::map_delete_error, json::MAX_AMOUNT, user::UserID};

pub type AccountId = i64;

/// The amount of money available in a bank account or credit card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The name of the account.
    #[serde(rename = "nome")]
    pub name: String,
    /// The balance.
    #[serde(rename = "saldo")]
    pub balance: f64,
    /// The user that owns the account.
    #[serde(rename = "usuario_id")]
    pub user_id: UserID,
}

/// The new values for an account. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub balance: Option<f64>,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS contas (
            id INTEGER PRIMARY KEY,
            nome TEXT NOT NULL,
            saldo REAL NOT NULL DEFAULT 0,
            usuario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_contas_usuario ON contas(usuario_id)",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let balance = row.get(2)?;
    let user_id = UserID::new(row.get(3)?);

    Ok(Account {
        id,
        name,
        balance,
        user_id,
    })
}

pub fn create_account(
    name: &str,
    balance: f64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection.execute(
        "INSERT INTO contas (nome, saldo, usuario_id) VALUES (?1, ?2, ?3)",
        params![name, balance, user_id.as_i64()],
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        balance,
        user_id,
    })
}

/// Get the accounts of `user_id`, sorted by name.
pub fn list_accounts(user_id: UserID, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, nome, saldo, usuario_id FROM contas WHERE usuario_id = ?1 ORDER BY nome, id",
        )?
        .query_map(params![user_id.as_i64()], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

/// Get an account by its ID.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn get_account(
    id: AccountId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .query_row(
            "SELECT id, nome, saldo, usuario_id FROM contas WHERE id = ?1 AND usuario_id = ?2",
            params![id, user_id.as_i64()],
            map_row_to_account,
        )
        .optional()?
        .ok_or(Error::NotFound("account"))
}

/// Change the name and/or balance of an account in a single statement.
///
/// # Errors
///
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn update_account(
    id: AccountId,
    update: &AccountUpdate,
    user_id: UserID,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .query_row(
            "UPDATE contas
            SET nome = COALESCE(?1, nome), saldo = COALESCE(?2, saldo)
            WHERE id = ?3 AND usuario_id = ?4
            RETURNING id, nome, saldo, usuario_id",
            params![update.name, update.balance, id, user_id.as_i64()],
            map_row_to_account,
        )
        .optional()?
        .ok_or(Error::NotFound("account"))
}

/// Delete an account that no transaction refers to.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::ResourceInUse] if transactions still refer to the account.
pub fn delete_account(id: AccountId, user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute(
            "DELETE FROM contas WHERE id = ?1 AND usuario_id = ?2",
            params![id, user_id.as_i64()],
        )
        .map_err(|error| map_delete_error(error, "account"))?;

    if rows_affected == 0 {
        return Err(Error::NotFound("account"));
    }

    Ok(())
}

/// Add `delta` to the balance of an account owned by `user_id`.
///
/// The increment happens inside SQLite, so concurrent postings cannot
/// overwrite each other. Call it inside a SQLite transaction: the new balance
/// is written before it is checked, and only a rollback undoes it.
///
/// # Errors
///
/// Returns a:
/// - [Error::NotFound] if the account does not exist or belongs to another user,
/// - [Error::Validation] if the new balance would be larger than [MAX_AMOUNT]
///   in magnitude.
pub fn apply_posting(
    id: AccountId,
    user_id: UserID,
    delta: f64,
    connection: &Connection,
) -> Result<(), Error> {
    let new_balance: f64 = connection
        .query_row(
            "UPDATE contas SET saldo = saldo + ?1 WHERE id = ?2 AND usuario_id = ?3
            RETURNING saldo",
            params![delta, id, user_id.as_i64()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(Error::NotFound("account"))?;

    if !new_balance.is_finite() || new_balance.abs() > MAX_AMOUNT {
        return Err(Error::Validation(format!(
            "saldo would go beyond the limit of {MAX_AMOUNT}"
        )));
    }

    Ok(())
}

/// Get the total balance across all accounts of `user_id`.
///
/// # Errors
/// Returns [Error] if the SQL query preparation or execution fails.
pub fn get_total_account_balance(user_id: UserID, connection: &Connection) -> Result<f64, Error> {
    let mut stmt =
        connection.prepare("SELECT COALESCE(SUM(saldo), 0) FROM contas WHERE usuario_id = ?1")?;

    let total: f64 = stmt.query_row(params![user_id.as_i64()], |row| row.get(0))?;

    Ok(total)
}
