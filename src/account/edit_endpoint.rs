//! Defines the endpoint for updating an account
use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    account::core::{Account, AccountId, AccountUpdate, update_account},
    db::lock_connection,
    json::{JsonBody, NumberInput, PathParam, optional_text},
    user::UserID,
};

/// The state needed to edit an account.
#[derive(Debug, Clone)]
pub struct EditAccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditAccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The fields of an account to change. At least one must be given.
#[derive(Debug, Default, Deserialize)]
pub struct EditAccountData {
    /// The new name.
    pub nome: Option<String>,
    /// The new balance.
    pub saldo: Option<NumberInput>,
}

impl EditAccountData {
    /// Check the request before anything touches the database.
    fn validate(self) -> Result<AccountUpdate, Error> {
        if self.nome.is_none() && self.saldo.is_none() {
            return Err(Error::Validation(
                "at least one of nome or saldo is required".to_owned(),
            ));
        }

        Ok(AccountUpdate {
            name: optional_text(self.nome, "nome must not be blank")?,
            balance: self.saldo.map(|saldo| saldo.parse("saldo")).transpose()?,
        })
    }
}

/// A route handler for changing the name or balance of one of the logged-in
/// user's accounts.
pub async fn edit_account_endpoint(
    State(state): State<EditAccountState>,
    Extension(user_id): Extension<UserID>,
    PathParam(account_id): PathParam<AccountId>,
    JsonBody(data): JsonBody<EditAccountData>,
) -> Result<Json<Account>, Error> {
    let update = data.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    update_account(account_id, &update, user_id, &connection).map(Json)
}
