//! Defines the endpoint for creating a new account.
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{Account, create_account},
    db::lock_connection,
    json::{JsonBody, NumberInput, required_text},
    user::UserID,
};

/// The state needed to create an account.
#[derive(Debug, Clone)]
pub struct CreateAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The data for creating an account.
#[derive(Debug, Deserialize)]
pub struct AccountData {
    /// The account name.
    pub nome: Option<String>,
    /// The opening balance.
    pub saldo: Option<NumberInput>,
}

/// A route handler for creating a new account for the logged-in user.
pub async fn create_account_endpoint(
    State(state): State<CreateAccountState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<AccountData>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let name = required_text(data.nome, "nome is required")?;
    let balance = data
        .saldo
        .ok_or_else(|| Error::Validation("saldo is required".to_owned()))?
        .parse("saldo")?;

    let connection = lock_connection(&state.db_connection)?;
    let account = create_account(&name, balance, user_id, &connection)?;

    Ok((StatusCode::CREATED, Json(account)))
}
