//! Creating, changing and deleting transactions together with the balance
//! postings they cause.
//!
//! Each function runs in its own SQLite transaction: either the transaction
//! row and every balance change are stored, or nothing is.

use rusqlite::Connection;

use crate::{
    Error,
    account::apply_posting,
    category::ensure_category_owned,
    transaction::core::{
        NewTransaction, Transaction, TransactionId, TransactionUpdate, get_transaction,
        insert_transaction, overwrite_transaction, remove_transaction,
    },
    user::UserID,
};

/// Store a new transaction and post its amount to its account.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the category or the account does not exist
/// or belongs to another user. Nothing is changed on error.
pub fn create_transaction(
    new_transaction: &NewTransaction,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;

    ensure_category_owned(new_transaction.category_id, user_id, &sql_transaction)?;
    apply_posting(
        new_transaction.account_id,
        user_id,
        new_transaction.kind.signed(new_transaction.amount),
        &sql_transaction,
    )?;
    let transaction = insert_transaction(new_transaction, user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    tracing::debug!(
        "Posted transaction {} ({} {}) to account {}",
        transaction.id,
        transaction.kind,
        transaction.amount,
        transaction.account_id
    );

    Ok(transaction)
}

/// Change a transaction, reversing its old posting and applying the new one.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the transaction, the new category or the
/// new account does not exist or belongs to another user. Nothing is changed
/// on error.
pub fn update_transaction(
    id: TransactionId,
    update: &TransactionUpdate,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;

    let current = get_transaction(id, user_id, &sql_transaction)?;
    let values = update.apply_to(&current);

    if let Some(category_id) = update.category_id {
        ensure_category_owned(category_id, user_id, &sql_transaction)?;
    }

    apply_posting(
        current.account_id,
        user_id,
        -current.kind.signed(current.amount),
        &sql_transaction,
    )?;
    apply_posting(
        values.account_id,
        user_id,
        values.kind.signed(values.amount),
        &sql_transaction,
    )?;
    let transaction = overwrite_transaction(id, &values, user_id, &sql_transaction)?;

    sql_transaction.commit()?;

    Ok(transaction)
}

/// Delete a transaction and reverse its posting.
///
/// # Errors
///
/// Returns a [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &mut Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.transaction()?;

    let removed = remove_transaction(id, user_id, &sql_transaction)?;
    apply_posting(
        removed.account_id,
        user_id,
        -removed.kind.signed(removed.amount),
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(removed)
}
