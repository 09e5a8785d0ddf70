//! Defines the endpoints for listing accounts and fetching a single account.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::core::{Account, AccountId, get_account, list_accounts},
    db::lock_connection,
    json::PathParam,
    user::UserID,
};

/// The state needed to read accounts.
#[derive(Debug, Clone)]
pub struct GetAccountState {
    /// The database connection for reading accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for GetAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that lists the logged-in user's accounts.
pub async fn list_accounts_endpoint(
    State(state): State<GetAccountState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_accounts(user_id, &connection).map(Json)
}

/// A route handler that fetches one of the logged-in user's accounts.
pub async fn get_account_endpoint(
    State(state): State<GetAccountState>,
    Extension(user_id): Extension<UserID>,
    PathParam(account_id): PathParam<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, user_id, &connection).map(Json)
}
