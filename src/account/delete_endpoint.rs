//! Defines the endpoint for deleting an account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    account::core::{AccountId, delete_account},
    db::lock_connection,
    json::PathParam,
    user::UserID,
};

/// The state needed to delete an account.
#[derive(Debug, Clone)]
pub struct DeleteAccountState {
    /// The database connection for managing account.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the logged-in user's accounts.
///
/// Accounts that transactions still refer to cannot be deleted.
pub async fn delete_account_endpoint(
    State(state): State<DeleteAccountState>,
    Extension(user_id): Extension<UserID>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_account(account_id, user_id, &connection)?;
    tracing::info!("User {user_id} deleted account {account_id}");

    Ok(Json(json!({ "message": "Account deleted" })))
}
