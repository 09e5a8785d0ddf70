//! The `/users` endpoints. Any logged-in user may look users up, but only the
//! user themself may change or delete their account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    db::lock_connection,
    json::{JsonBody, PathParam, required_text},
    user::core::{
        User, UserID, UserUpdate, delete_user, get_user_by_id, list_users, update_user,
        validate_email,
    },
};

/// The state needed by the user endpoints.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for hashing a changed password.
    pub password_cost: u32,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: state.password_cost,
        }
    }
}

/// A user as shown in listings.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    id: UserID,
    nome: String,
    email: String,
    #[serde(with = "time::serde::rfc3339")]
    criado_em: OffsetDateTime,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nome: user.name,
            email: user.email,
            criado_em: user.created_at,
        }
    }
}

/// A user as returned after an update.
#[derive(Debug, Serialize)]
pub struct UpdatedUser {
    id: UserID,
    nome: String,
    email: String,
    #[serde(with = "time::serde::rfc3339")]
    atualizado_em: OffsetDateTime,
}

/// The body of a request to change a user.
#[derive(Debug, Deserialize)]
pub struct UpdateUserData {
    /// The new display name.
    pub nome: Option<String>,
    /// The new email address.
    pub email: Option<String>,
    /// A new password, leave out to keep the current one.
    pub senha: Option<String>,
}

fn ensure_self(target: UserID, user_id: UserID) -> Result<(), Error> {
    if target == user_id {
        Ok(())
    } else {
        tracing::warn!("User {user_id} tried to modify user {target}");
        Err(Error::Forbidden)
    }
}

/// List every registered user.
pub async fn list_users_endpoint(
    State(state): State<UserState>,
) -> Result<Json<Vec<UserSummary>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let users = list_users(&connection)?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(Json(users))
}

/// Get a single user by ID.
pub async fn get_user_endpoint(
    State(state): State<UserState>,
    PathParam(target): PathParam<i64>,
) -> Result<Json<UserSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_user_by_id(UserID::new(target), &connection)
        .map(UserSummary::from)
        .map(Json)
}

/// Change the logged-in user's name, email and optionally their password.
///
/// # Errors
///
/// Returns a:
/// - [Error::Forbidden] if `target` is not the logged-in user,
/// - [Error::Validation], [Error::InvalidEmail] or [Error::TooWeak] for bad input,
/// - [Error::DuplicateEmail] if another user has the new email.
pub async fn update_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
    PathParam(target): PathParam<i64>,
    JsonBody(data): JsonBody<UpdateUserData>,
) -> Result<Json<UpdatedUser>, Error> {
    ensure_self(UserID::new(target), user_id)?;

    let name = required_text(data.nome, "nome is required")?;
    let email = validate_email(&required_text(data.email, "email is required")?)?;
    let password_hash = match data.senha.filter(|password| !password.is_empty()) {
        Some(raw_password) => {
            let password = ValidatedPassword::new(&raw_password, &[&name, &email])?;
            Some(PasswordHash::new(password, state.password_cost)?)
        }
        None => None,
    };

    let connection = lock_connection(&state.db_connection)?;
    let user = update_user(
        user_id,
        &UserUpdate {
            name,
            email,
            password_hash,
        },
        &connection,
    )?;

    Ok(Json(UpdatedUser {
        id: user.id,
        nome: user.name,
        email: user.email,
        atualizado_em: user.updated_at,
    }))
}

/// Delete the logged-in user along with everything they own.
pub async fn delete_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
    PathParam(target): PathParam<i64>,
) -> Result<Json<Value>, Error> {
    ensure_self(UserID::new(target), user_id)?;

    let connection = lock_connection(&state.db_connection)?;

    if delete_user(user_id, &connection)? == 0 {
        return Err(Error::NotFound("user"));
    }

    tracing::info!("Deleted user {user_id}");

    Ok(Json(json!({ "message": "User deleted" })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        auth::AuthStrategy,
        endpoints::{self, format_endpoint},
        test_utils::{TEST_PASSWORD, get_test_server, must_log_in_new_user},
        user::core::{get_user_by_email, list_users},
    };

    async fn user_id_of(server: &axum_test::TestServer, token: &str, email: &str) -> i64 {
        let users: Vec<Value> = server
            .get(endpoints::USERS)
            .authorization_bearer(token)
            .await
            .json();

        users
            .iter()
            .find(|user| user["email"] == email)
            .and_then(|user| user["id"].as_i64())
            .unwrap()
    }

    #[tokio::test]
    async fn list_shows_public_fields_only() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;

        let response = server
            .get(endpoints::USERS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let users: Vec<Value> = response.json();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["email"], "maria@example.com");
        assert!(users[0].get("criado_em").is_some());
        assert!(users[0].get("senha").is_none());
    }

    #[tokio::test]
    async fn users_require_authentication() {
        let (server, _state) = get_test_server(AuthStrategy::Token);

        server.get(endpoints::USERS).await.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn get_missing_user_is_not_found() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;

        server
            .get(&format_endpoint(endpoints::USER, 999))
            .authorization_bearer(&token)
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn user_can_update_themself() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;
        let id = user_id_of(&server, &token, "maria@example.com").await;

        let response = server
            .put(&format_endpoint(endpoints::USER, id))
            .authorization_bearer(&token)
            .json(&json!({ "nome": "Maria Silva", "email": "silva@example.com" }))
            .await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["nome"], "Maria Silva");
        assert_eq!(body["email"], "silva@example.com");
        assert!(body.get("atualizado_em").is_some());

        // The password was left unchanged.
        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "silva@example.com", "senha": TEST_PASSWORD }))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn updating_another_user_is_forbidden() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let maria = must_log_in_new_user(&server, &state, "maria@example.com").await;
        must_log_in_new_user(&server, &state, "joao@example.com").await;
        let joao_id = user_id_of(&server, &maria, "joao@example.com").await;

        server
            .put(&format_endpoint(endpoints::USER, joao_id))
            .authorization_bearer(&maria)
            .json(&json!({ "nome": "Hacked", "email": "hacked@example.com" }))
            .await
            .assert_status(StatusCode::FORBIDDEN);
        server
            .delete(&format_endpoint(endpoints::USER, joao_id))
            .authorization_bearer(&maria)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let connection = state.db_connection.lock().unwrap();
        assert!(get_user_by_email("joao@example.com", &connection).is_ok());
    }

    #[tokio::test]
    async fn update_to_taken_email_is_conflict() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let maria = must_log_in_new_user(&server, &state, "maria@example.com").await;
        must_log_in_new_user(&server, &state, "joao@example.com").await;
        let maria_id = user_id_of(&server, &maria, "maria@example.com").await;

        server
            .put(&format_endpoint(endpoints::USER, maria_id))
            .authorization_bearer(&maria)
            .json(&json!({ "nome": "Maria", "email": "joao@example.com" }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_requires_name_and_email() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;
        let id = user_id_of(&server, &token, "maria@example.com").await;

        for body in [
            json!({ "email": "maria@example.com" }),
            json!({ "nome": "Maria" }),
            json!({ "nome": "Maria", "email": "maria@example.com", "senha": "123" }),
        ] {
            server
                .put(&format_endpoint(endpoints::USER, id))
                .authorization_bearer(&token)
                .json(&body)
                .await
                .assert_status_bad_request();
        }
    }

    #[tokio::test]
    async fn user_can_delete_themself() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;
        let id = user_id_of(&server, &token, "maria@example.com").await;

        server
            .delete(&format_endpoint(endpoints::USER, id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        let connection = state.db_connection.lock().unwrap();
        assert!(list_users(&connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn token_stops_working_once_the_user_is_deleted() {
        let (server, state) = get_test_server(AuthStrategy::Token);
        let token = must_log_in_new_user(&server, &state, "maria@example.com").await;
        let id = user_id_of(&server, &token, "maria@example.com").await;
        server
            .delete(&format_endpoint(endpoints::USER, id))
            .authorization_bearer(&token)
            .await
            .assert_status_ok();

        server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&json!({ "nome": "Viagem" }))
            .await
            .assert_status_unauthorized();
        server
            .get(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .await
            .assert_status_unauthorized();
    }
}
