//! The JSON endpoints for managing transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    db::lock_connection,
    json::{JsonBody, PathParam},
    transaction::{
        core::{Transaction, TransactionId, get_transaction, list_transactions},
        posting::{create_transaction, delete_transaction, update_transaction},
        request::{EditTransactionData, TransactionData},
    },
    user::UserID,
};

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new transaction and posting it to its account.
///
/// The body is validated before the database is touched. The category and the
/// account must belong to the logged-in user.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    JsonBody(data): JsonBody<TransactionData>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let new_transaction = data.validate()?;
    let mut connection = lock_connection(&state.db_connection)?;

    let transaction = create_transaction(&new_transaction, user_id, &mut connection)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// A route handler that lists the logged-in user's transactions, newest first.
pub async fn list_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_transactions(user_id, &connection).map(Json)
}

/// A route handler that fetches one of the logged-in user's transactions.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, user_id, &connection).map(Json)
}

/// A route handler for editing a transaction. The balance postings of the old
/// and new values are settled in the same database transaction.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
    JsonBody(data): JsonBody<EditTransactionData>,
) -> Result<Json<Transaction>, Error> {
    let update = data.validate()?;
    let mut connection = lock_connection(&state.db_connection)?;

    update_transaction(transaction_id, &update, user_id, &mut connection).map(Json)
}

/// A route handler for deleting a transaction and reversing its posting.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    PathParam(transaction_id): PathParam<TransactionId>,
) -> Result<Json<Value>, Error> {
    let mut connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, user_id, &mut connection)?;
    tracing::info!("User {user_id} deleted transaction {transaction_id}");

    Ok(Json(json!({ "message": "Transaction deleted" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        AppState,
        auth::AuthStrategy,
        endpoints::{self, format_endpoint},
        test_utils::{get_test_server, must_log_in_new_user},
    };

    /// Create a category and an account with a balance of 1000 for the user
    /// holding `token`, returning their IDs.
    async fn must_create_category_and_account(server: &TestServer, token: &str) -> (i64, i64) {
        let category: Value = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(token)
            .json(&json!({ "nome": "Alimentação" }))
            .await
            .json();
        let account: Value = server
            .post(endpoints::ACCOUNTS)
            .authorization_bearer(token)
            .json(&json!({ "nome": "Conta corrente", "saldo": 1000 }))
            .await
            .json();

        (
            category["id"].as_i64().unwrap(),
            account["id"].as_i64().unwrap(),
        )
    }

    async fn get_balance(server: &TestServer, token: &str, account_id: i64) -> f64 {
        let account: Value = server
            .get(&format_endpoint(endpoints::ACCOUNT, account_id))
            .authorization_bearer(token)
            .await
            .json();

        account["saldo"].as_f64().unwrap()
    }

    async fn setup() -> (TestServer, AppState, String) {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;

        (server, state, token)
    }

    #[tokio::test]
    async fn create_posts_expense_and_returns_created() {
        let (server, _state, token) = setup().await;
        let (category_id, account_id) = must_create_category_and_account(&server, &token).await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "descricao": "Mercado",
                "valor": 150.75,
                "tipo": "despesa",
                "categoria_id": category_id,
                "conta_id": account_id,
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let created: Value = response.json();
        assert_eq!(created["descricao"], "Mercado");
        assert_eq!(created["valor"], 150.75);
        assert_eq!(created["tipo"], "despesa");
        assert_eq!(get_balance(&server, &token, account_id).await, 849.25);

        let fetched: Value = server
            .get(&format_endpoint(
                endpoints::TRANSACTION,
                created["id"].as_i64().unwrap(),
            ))
            .authorization_bearer(&token)
            .await
            .json();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_with_other_users_account_is_not_found() {
        let (server, state, maria) = setup().await;
        let joao = must_log_in_new_user(&server, &state, "joao@example.com").await;
        let (category_id, _) = must_create_category_and_account(&server, &maria).await;
        let (_, joao_account_id) = must_create_category_and_account(&server, &joao).await;

        let response = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&maria)
            .json(&json!({
                "descricao": "Mercado",
                "valor": 150.75,
                "tipo": "despesa",
                "categoria_id": category_id,
                "conta_id": joao_account_id,
            }))
            .await;

        response.assert_status_not_found();
        assert_eq!(get_balance(&server, &joao, joao_account_id).await, 1000.0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_body() {
        let (server, _state, token) = setup().await;
        let (category_id, account_id) = must_create_category_and_account(&server, &token).await;

        for body in [
            json!({ "valor": 1, "tipo": "despesa", "categoria_id": category_id, "conta_id": account_id }),
            json!({ "descricao": "x", "valor": "abc", "tipo": "despesa", "categoria_id": category_id, "conta_id": account_id }),
            json!({ "descricao": "x", "valor": 1, "tipo": "gasto", "categoria_id": category_id, "conta_id": account_id }),
            json!({ "descricao": "x", "valor": 1, "tipo": "despesa", "conta_id": account_id }),
        ] {
            server
                .post(endpoints::TRANSACTIONS)
                .authorization_bearer(&token)
                .json(&body)
                .await
                .assert_status_bad_request();
        }

        assert_eq!(get_balance(&server, &token, account_id).await, 1000.0);
    }

    #[tokio::test]
    async fn create_requires_authentication() {
        let (server, _state, _token) = setup().await;

        server
            .post(endpoints::TRANSACTIONS)
            .json(&json!({ "descricao": "Mercado" }))
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn update_and_delete_settle_the_balance() {
        let (server, _state, token) = setup().await;
        let (category_id, account_id) = must_create_category_and_account(&server, &token).await;
        let created: Value = server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&token)
            .json(&json!({
                "descricao": "Salário",
                "valor": "3000",
                "tipo": "receita",
                "categoria_id": category_id,
                "conta_id": account_id,
                "data": "2025-03-05",
            }))
            .await
            .json();
        let path = format_endpoint(endpoints::TRANSACTION, created["id"].as_i64().unwrap());
        assert_eq!(get_balance(&server, &token, account_id).await, 4000.0);

        let updated: Value = server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({ "valor": 2500 }))
            .await
            .json();
        assert_eq!(updated["valor"], 2500.0);
        assert_eq!(updated["descricao"], "Salário");
        assert_eq!(get_balance(&server, &token, account_id).await, 3500.0);

        server
            .delete(&path)
            .authorization_bearer(&token)
            .await
            .assert_status_ok();
        assert_eq!(get_balance(&server, &token, account_id).await, 1000.0);
        server
            .get(&path)
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_user() {
        let (server, state, maria) = setup().await;
        let joao = must_log_in_new_user(&server, &state, "joao@example.com").await;
        let (category_id, account_id) = must_create_category_and_account(&server, &maria).await;
        server
            .post(endpoints::TRANSACTIONS)
            .authorization_bearer(&maria)
            .json(&json!({
                "descricao": "Mercado",
                "valor": 10,
                "tipo": "despesa",
                "categoria_id": category_id,
                "conta_id": account_id,
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let marias: Vec<Value> = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&maria)
            .await
            .json();
        let joaos: Vec<Value> = server
            .get(endpoints::TRANSACTIONS)
            .authorization_bearer(&joao)
            .await
            .json();

        assert_eq!(marias.len(), 1);
        assert!(joaos.is_empty());
    }
}
