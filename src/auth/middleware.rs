//! Authentication middleware that resolves the user behind a request.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Authenticator,
    db::lock_connection,
    endpoints,
    user::{UserID, user_exists},
};

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The strategy used to resolve credentials.
    pub authenticator: Arc<dyn Authenticator>,
    /// The database connection, for checking the user still exists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            authenticator: state.authenticator.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Find the user behind `request`.
///
/// A bearer token outlives the user it was issued to, so a credential for a
/// deleted user is rejected with [Error::Unauthenticated].
fn resolve_user(state: &AuthState, request: &Request) -> Result<UserID, Error> {
    let user_id = state.authenticator.resolve(request.headers())?;
    let connection = lock_connection(&state.db_connection)?;

    if !user_exists(user_id, &connection)? {
        tracing::debug!("Rejected credential for deleted user {user_id}");
        return Err(Error::Unauthenticated);
    }

    Ok(user_id)
}

/// Resolve the user and run the request, or return `on_failure(error)` without
/// running the handler.
#[inline]
async fn auth_guard_internal(
    state: AuthState,
    mut request: Request,
    next: Next,
    on_failure: impl Fn(Error) -> Response,
) -> Response {
    let user_id = match resolve_user(&state, &request) {
        Ok(user_id) => user_id,
        Err(error) => {
            tracing::debug!(
                "Rejected request to {}: {error}",
                request.uri().path()
            );
            return on_failure(error);
        }
    };

    request.extensions_mut().insert(user_id);

    next.run(request).await
}

/// Middleware function that checks for a valid credential.
/// The user ID is placed into the request and the request executed normally if the credential is
/// valid, otherwise a JSON error with the status 401 is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |error| error.into_response()).await
}

/// Middleware function that checks for a valid credential.
/// The user ID is placed into the request and the request executed normally if the credential is
/// valid, otherwise the client is redirected to the log-in page.
///
/// Store errors are still returned as errors so that a broken database does
/// not look like a logged-out user.
pub async fn auth_guard_page(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |error| match error {
        Error::Unauthenticated => Redirect::to(endpoints::LOG_IN_VIEW).into_response(),
        error => error.into_response(),
    })
    .await
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, middleware, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use time::Duration;

    use super::AuthState;
    use crate::{
        auth::{Authenticator, Credential, TokenAuthenticator, auth_guard, auth_guard_page},
        endpoints,
        test_utils::{must_create_test_connection, must_create_user},
        user::{UserID, delete_user},
    };

    async fn test_handler(Extension(user_id): Extension<UserID>) -> String {
        user_id.to_string()
    }

    const TEST_API_ROUTE: &str = "/api/protected";
    const TEST_PAGE_ROUTE: &str = "/protected";

    struct Fixture {
        server: TestServer,
        authenticator: Arc<TokenAuthenticator>,
        db_connection: Arc<Mutex<Connection>>,
        user_id: UserID,
    }

    fn get_test_server() -> Fixture {
        let connection = must_create_test_connection();
        let user_id = must_create_user("maria@example.com", &connection).id;
        let db_connection = Arc::new(Mutex::new(connection));
        let authenticator = Arc::new(TokenAuthenticator::new("nafstenoas", Duration::minutes(5)));
        let state = AuthState {
            authenticator: authenticator.clone(),
            db_connection: db_connection.clone(),
        };

        let api = Router::new()
            .route(TEST_API_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));
        let pages = Router::new()
            .route(TEST_PAGE_ROUTE, get(test_handler))
            .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_page));
        let app = api.merge(pages).with_state(state);

        Fixture {
            server: TestServer::new(app),
            authenticator,
            db_connection,
            user_id,
        }
    }

    fn must_get_token(authenticator: &TokenAuthenticator, user_id: UserID) -> String {
        match authenticator.issue(user_id) {
            Ok(Credential::Bearer(token)) => token.token,
            _ => panic!("expected a bearer token"),
        }
    }

    #[tokio::test]
    async fn get_protected_route_with_valid_token() {
        let fixture = get_test_server();
        let token = must_get_token(&fixture.authenticator, fixture.user_id);

        let response = fixture
            .server
            .get(TEST_API_ROUTE)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        response.assert_text(fixture.user_id.to_string());
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_unauthorized() {
        let fixture = get_test_server();
        let token = must_get_token(&fixture.authenticator, UserID::new(999));

        fixture
            .server
            .get(TEST_API_ROUTE)
            .authorization_bearer(token)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn token_for_deleted_user_is_unauthorized() {
        let fixture = get_test_server();
        let token = must_get_token(&fixture.authenticator, fixture.user_id);
        {
            let connection = fixture.db_connection.lock().unwrap();
            delete_user(fixture.user_id, &connection).unwrap();
        }

        fixture
            .server
            .get(TEST_API_ROUTE)
            .authorization_bearer(token)
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn get_protected_route_without_token_is_unauthorized() {
        let fixture = get_test_server();

        let response = fixture.server.get(TEST_API_ROUTE).await;

        response.assert_status_unauthorized();
        let body: serde_json::Value = response.json();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn get_protected_route_with_invalid_token_is_unauthorized() {
        let fixture = get_test_server();

        fixture
            .server
            .get(TEST_API_ROUTE)
            .authorization_bearer("FOOBAR")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn get_protected_page_without_token_redirects_to_log_in() {
        let fixture = get_test_server();

        let response = fixture.server.get(TEST_PAGE_ROUTE).await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
    }
}
