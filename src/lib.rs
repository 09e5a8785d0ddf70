//! A multi-tenant personal finance tracker.
//!
//! Users register and log in, then manage categories, accounts and
//! transactions through a JSON API. Creating, editing or deleting a
//! transaction posts its signed amount to the linked account balance inside a
//! single SQLite transaction.
//!
//! A small server-rendered dashboard shows the logged-in user's totals and
//! charts.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod category;
mod dashboard;
mod db;
mod endpoints;
mod html;
mod json;
mod logging;
mod not_found;
mod routing;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    AuthStrategy, Authenticator, PasswordHash, SessionAuthenticator, TokenAuthenticator,
    ValidatedPassword, build_authenticator, seed_default_data,
};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use routing::build_router;
pub use transaction::{NewTransaction, TransactionKind, create_transaction};
pub use user::{NewUser, User, UserID, create_user};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A required field was missing or had an invalid value.
    ///
    /// The string is shown to the client and should explain how to fix the
    /// request.
    #[error("{0}")]
    Validation(String),

    /// The request body could not be parsed as JSON of the expected shape.
    #[error("invalid request body: {0}")]
    InvalidRequestBody(String),

    /// A path parameter, such as a resource ID, could not be parsed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The email address is not a valid address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The request did not carry a valid credential (token or session).
    #[error("authentication required")]
    Unauthenticated,

    /// The email and password do not match a registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The authenticated user may not act on the requested resource.
    #[error("access denied")]
    Forbidden,

    /// The requested resource was not found, or it belongs to another user.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The email address is already registered to another user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// The resource cannot be deleted while transactions still refer to it.
    #[error("the {0} is still used by one or more transactions")]
    ResourceInUse(&'static str),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A bearer token could not be signed.
    #[error("could not create auth token: {0}")]
    TokenCreation(String),

    /// A handler's response body could not be buffered for logging.
    #[error("could not read response body: {0}")]
    ResponseBody(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("usuarios.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound("record"),
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequestBody(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Error::InvalidPath(rejection.body_text())
    }
}

impl Error {
    /// The HTTP status code that the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::InvalidRequestBody(_)
            | Error::InvalidPath(_)
            | Error::InvalidEmail(_)
            | Error::TooWeak(_) => StatusCode::BAD_REQUEST,
            Error::Unauthenticated | Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateEmail | Error::ResourceInUse(_) => StatusCode::CONFLICT,
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::ResponseBody(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server errors are not intended to be shown to the client.
        let message = if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
