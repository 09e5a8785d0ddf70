//! Registering new users.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    account::create_account,
    category::create_category,
    db::lock_connection,
    json::{JsonBody, required_text},
    user::{NewUser, UserID, UserProfile, create_user, validate_email},
};

/// The categories every new user starts with.
pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Saúde",
    "Alimentação",
    "Transporte",
    "Lazer",
    "Educação",
    "Moradia",
    "Outros",
];

/// The accounts every new user starts with. They all start with a zero balance.
pub const DEFAULT_ACCOUNTS: [&str; 3] = ["Conta corrente", "Conta poupança", "Cartão de crédito"];

/// Create the default categories and accounts for `user_id`.
///
/// Call this inside the same SQLite transaction that created the user so a
/// user never exists without their starting data.
///
/// # Errors
///
/// Returns an [Error::SqlError] if any insert fails.
pub fn seed_default_data(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    for name in DEFAULT_CATEGORIES {
        create_category(name, user_id, connection)?;
    }

    for name in DEFAULT_ACCOUNTS {
        create_account(name, 0.0, user_id, connection)?;
    }

    Ok(())
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for storing the new user.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for hashing the password.
    pub password_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: state.password_cost,
        }
    }
}

/// The details sent by the client to register.
#[derive(Deserialize)]
pub struct RegisterData {
    /// The user's display name.
    pub nome: Option<String>,
    /// The email to log in with.
    pub email: Option<String>,
    /// The raw password.
    pub senha: Option<String>,
}

/// The body returned after registering.
#[derive(Serialize)]
pub struct RegisterResponse {
    message: &'static str,
    user: UserProfile,
}

/// Handler for registering a new user.
///
/// # Errors
///
/// Returns a:
/// - [Error::Validation], [Error::InvalidEmail] or [Error::TooWeak] for bad input,
/// - [Error::DuplicateEmail] if the email is already registered.
pub async fn register_user_endpoint(
    State(state): State<RegistrationState>,
    JsonBody(data): JsonBody<RegisterData>,
) -> Result<(StatusCode, Json<RegisterResponse>), Error> {
    let name = required_text(data.nome, "nome is required")?;
    let email = validate_email(&required_text(data.email, "email is required")?)?;
    let raw_password = data
        .senha
        .filter(|password| !password.is_empty())
        .ok_or_else(|| Error::Validation("senha is required".to_owned()))?;

    let password = ValidatedPassword::new(&raw_password, &[&name, &email])?;
    let password_hash = PasswordHash::new(password, state.password_cost)?;

    let mut connection = lock_connection(&state.db_connection)?;
    let transaction = connection.transaction()?;
    let user = create_user(
        &NewUser {
            name,
            email,
            password_hash,
        },
        &transaction,
    )?;
    seed_default_data(user.id, &transaction)?;
    transaction.commit()?;

    tracing::info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered",
            user: UserProfile::from(&user),
        }),
    ))
}
