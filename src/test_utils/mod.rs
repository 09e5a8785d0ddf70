//! Fixtures shared by the test suites: in-memory databases, users, a test
//! server wired like the real one, and HTML parsing helpers.

#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use axum::{body::Body, response::Response};
use axum_test::TestServer;
use rusqlite::Connection;
use scraper::Html;
use serde_json::json;
use time::Duration;

use crate::{
    AppState, PasswordHash, ValidatedPassword,
    auth::{AuthStrategy, build_authenticator},
    build_router,
    db::initialize,
    endpoints,
    user::{NewUser, User, create_user},
};

/// A password that passes the strength check.
pub(crate) const TEST_PASSWORD: &str = "correct horse battery staple";

/// The bcrypt cost used in tests, the minimum bcrypt allows.
const TEST_PASSWORD_COST: u32 = 4;

pub(crate) fn must_create_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not create in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Insert a user with `email` whose password is [TEST_PASSWORD].
#[track_caller]
pub(crate) fn must_create_user(email: &str, connection: &Connection) -> User {
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(TEST_PASSWORD),
        TEST_PASSWORD_COST,
    )
    .expect("Could not hash password");

    create_user(
        &NewUser {
            name: "Test User".to_owned(),
            email: email.to_owned(),
            password_hash,
        },
        connection,
    )
    .expect("Could not create test user")
}

/// Build the full application router on an in-memory database.
pub(crate) fn get_test_server(strategy: AuthStrategy) -> (TestServer, AppState) {
    let db_connection = Arc::new(Mutex::new(
        Connection::open_in_memory().expect("Could not create in-memory SQLite database"),
    ));
    let authenticator = build_authenticator(
        strategy,
        "foobar",
        Duration::minutes(60),
        db_connection.clone(),
    );
    let state = AppState::new(db_connection, authenticator, TEST_PASSWORD_COST)
        .expect("Could not create app state");

    let server =
        TestServer::new(build_router(state.clone()));

    (server, state)
}

/// Create a user with `email` and log them in through the API, returning the
/// bearer token. `server` must use the token strategy.
pub(crate) async fn must_log_in_new_user(
    server: &TestServer,
    state: &AppState,
    email: &str,
) -> String {
    {
        let connection = state.db_connection.lock().unwrap();
        must_create_user(email, &connection);
    }

    let body: serde_json::Value = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": email, "senha": TEST_PASSWORD }))
        .await
        .json();

    body["token"]
        .as_str()
        .expect("log in response has no token")
        .to_owned()
}

pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    Html::parse_document(&String::from_utf8_lossy(&body))
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}
