//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, params,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::OffsetDateTime;

use crate::{Error, account::AccountId, category::CategoryId, db::now_utc, user::UserID};

pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction brings money in or takes it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    /// Money earned, posted as a credit.
    #[serde(rename = "receita")]
    Income,
    /// Money spent, posted as a debit.
    #[serde(rename = "despesa")]
    Expense,
}

impl TransactionKind {
    /// The name stored in the database and sent to clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "receita",
            TransactionKind::Expense => "despesa",
        }
    }

    /// The change to an account balance for a transaction of `amount`.
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            TransactionKind::Income => amount,
            TransactionKind::Expense => -amount,
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    /// Parse a kind, ignoring case. The English names are accepted too.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.trim().to_lowercase().as_str() {
            "receita" | "income" => Ok(TransactionKind::Income),
            "despesa" | "expense" => Ok(TransactionKind::Expense),
            _ => Err(Error::Validation(
                "tipo must be \"receita\" or \"despesa\"".to_owned(),
            )),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error: Error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    #[serde(rename = "descricao")]
    pub description: String,
    /// The amount of money spent or earned. Always posted with the sign of `kind`.
    #[serde(rename = "valor")]
    pub amount: f64,
    /// Whether the money was earned or spent.
    #[serde(rename = "tipo")]
    pub kind: TransactionKind,
    /// The category the transaction belongs to.
    #[serde(rename = "categoria_id")]
    pub category_id: CategoryId,
    /// The account the transaction posts to.
    #[serde(rename = "conta_id")]
    pub account_id: AccountId,
    /// The user that owns the transaction.
    #[serde(rename = "usuario_id")]
    pub user_id: UserID,
    /// When the transaction happened.
    #[serde(rename = "data", with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// When the transaction was last changed.
    #[serde(rename = "atualizado_em", with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The validated data for a new transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// The category the transaction belongs to.
    pub category_id: CategoryId,
    /// The account the transaction posts to.
    pub account_id: AccountId,
    /// When the transaction happened.
    pub date: OffsetDateTime,
}

/// The validated changes to a transaction. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdate {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub kind: Option<TransactionKind>,
    pub category_id: Option<CategoryId>,
    pub account_id: Option<AccountId>,
    pub date: Option<OffsetDateTime>,
}

impl TransactionUpdate {
    /// Whether the update would leave the transaction unchanged.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The transaction `current` with this update applied.
    pub fn apply_to(&self, current: &Transaction) -> NewTransaction {
        NewTransaction {
            description: self
                .description
                .clone()
                .unwrap_or_else(|| current.description.clone()),
            amount: self.amount.unwrap_or(current.amount),
            kind: self.kind.unwrap_or(current.kind),
            category_id: self.category_id.unwrap_or(current.category_id),
            account_id: self.account_id.unwrap_or(current.account_id),
            date: self.date.unwrap_or(current.date),
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table.
///
/// Categories and accounts cannot be deleted while a transaction refers to
/// them. Deleting the owning user deletes the transaction.
///
/// # Errors
/// Returns an error if the table could not be created.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    // The category and account keys use the default NO ACTION so the check
    // runs at the end of the statement, after a user delete has cascaded.
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transacoes (
            id INTEGER PRIMARY KEY,
            descricao TEXT NOT NULL,
            valor REAL NOT NULL,
            tipo TEXT NOT NULL CHECK (tipo IN ('receita', 'despesa')),
            categoria_id INTEGER NOT NULL REFERENCES categorias(id),
            conta_id INTEGER NOT NULL REFERENCES contas(id),
            usuario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
            data TEXT NOT NULL,
            atualizado_em TEXT NOT NULL
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transacoes_usuario_data ON transacoes(usuario_id, data)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transacoes_categoria ON transacoes(categoria_id)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transacoes_conta ON transacoes(conta_id)",
        (),
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str =
    "id, descricao, valor, tipo, categoria_id, conta_id, usuario_id, data, atualizado_em";

/// Map a database row to a [Transaction].
///
/// The row must hold the columns in the order of `TRANSACTION_COLUMNS`.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        kind: row.get(3)?,
        category_id: row.get(4)?,
        account_id: row.get(5)?,
        user_id: UserID::new(row.get(6)?),
        date: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a transaction row. The caller is responsible for posting it.
pub(super) fn insert_transaction(
    new_transaction: &NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!(
                "INSERT INTO transacoes
                (descricao, valor, tipo, categoria_id, conta_id, usuario_id, data, atualizado_em)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                RETURNING {TRANSACTION_COLUMNS}"
            ),
            params![
                new_transaction.description,
                new_transaction.amount,
                new_transaction.kind,
                new_transaction.category_id,
                new_transaction.account_id,
                user_id.as_i64(),
                new_transaction.date,
                now_utc(),
            ],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Overwrite a transaction row. The caller is responsible for re-posting it.
pub(super) fn overwrite_transaction(
    id: TransactionId,
    values: &NewTransaction,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!(
                "UPDATE transacoes
                SET descricao = ?1, valor = ?2, tipo = ?3, categoria_id = ?4, conta_id = ?5,
                    data = ?6, atualizado_em = ?7
                WHERE id = ?8 AND usuario_id = ?9
                RETURNING {TRANSACTION_COLUMNS}"
            ),
            params![
                values.description,
                values.amount,
                values.kind,
                values.category_id,
                values.account_id,
                values.date,
                now_utc(),
                id,
                user_id.as_i64(),
            ],
            map_transaction_row,
        )
        .optional()?
        .ok_or(Error::NotFound("transaction"))
}

/// Delete a transaction row and return what it held. The caller is
/// responsible for reversing its posting.
pub(super) fn remove_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!(
                "DELETE FROM transacoes WHERE id = ?1 AND usuario_id = ?2
                RETURNING {TRANSACTION_COLUMNS}"
            ),
            params![id, user_id.as_i64()],
            map_transaction_row,
        )
        .optional()?
        .ok_or(Error::NotFound("transaction"))
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transacoes WHERE id = ?1 AND usuario_id = ?2"
            ),
            params![id, user_id.as_i64()],
            map_transaction_row,
        )
        .optional()?
        .ok_or(Error::NotFound("transaction"))
}

/// Get the transactions of `user_id`, newest first.
pub fn list_transactions(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transacoes
            WHERE usuario_id = ?1
            ORDER BY data DESC, id DESC"
        ))?
        .query_map(params![user_id.as_i64()], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}


#[cfg(test)]
mod database_tests {
    use time::macros::datetime;

    use crate::{
        Error,
        account::create_account,
        category::create_category,
        test_utils::{must_create_test_connection, must_create_user},
        transaction::{
            NewTransaction, TransactionKind, TransactionUpdate,
            core::{get_transaction, insert_transaction, list_transactions, remove_transaction},
        },
    };

    #[test]
    fn list_is_newest_first_and_scoped_to_owner() {
        let connection = must_create_test_connection();
        let maria = must_create_user("maria@example.com", &connection);
        let joao = must_create_user("joao@example.com", &connection);
        let category = create_category("Lazer", maria.id, &connection).unwrap();
        let account = create_account("Conta", 0.0, maria.id, &connection).unwrap();
        let new_transaction = |description: &str, date| NewTransaction {
            description: description.to_owned(),
            amount: 10.0,
            kind: TransactionKind::Expense,
            category_id: category.id,
            account_id: account.id,
            date,
        };

        let older = insert_transaction(
            &new_transaction("Cinema", datetime!(2025-01-01 20:00 UTC)),
            maria.id,
            &connection,
        )
        .unwrap();
        let newer = insert_transaction(
            &new_transaction("Teatro", datetime!(2025-02-01 20:00 UTC)),
            maria.id,
            &connection,
        )
        .unwrap();

        assert_eq!(
            list_transactions(maria.id, &connection).unwrap(),
            [newer, older.clone()]
        );
        assert!(list_transactions(joao.id, &connection).unwrap().is_empty());
        assert_eq!(
            get_transaction(older.id, joao.id, &connection),
            Err(Error::NotFound("transaction"))
        );
        assert_eq!(
            remove_transaction(older.id, joao.id, &connection),
            Err(Error::NotFound("transaction"))
        );
    }

    #[test]
    fn update_applies_only_given_fields() {
        let connection = must_create_test_connection();
        let maria = must_create_user("maria@example.com", &connection);
        let category = create_category("Lazer", maria.id, &connection).unwrap();
        let account = create_account("Conta", 0.0, maria.id, &connection).unwrap();
        let current = insert_transaction(
            &NewTransaction {
                description: "Cinema".to_owned(),
                amount: 30.0,
                kind: TransactionKind::Expense,
                category_id: category.id,
                account_id: account.id,
                date: datetime!(2025-01-01 20:00 UTC),
            },
            maria.id,
            &connection,
        )
        .unwrap();

        let update = TransactionUpdate {
            amount: Some(45.0),
            ..Default::default()
        };
        let merged = update.apply_to(&current);

        assert!(!update.is_empty());
        assert!(TransactionUpdate::default().is_empty());
        assert_eq!(merged.amount, 45.0);
        assert_eq!(merged.description, "Cinema");
        assert_eq!(merged.kind, TransactionKind::Expense);
    }
}
