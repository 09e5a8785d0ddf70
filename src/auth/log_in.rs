//! The log-in page and the handlers for logging in and out.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{Authenticator, BearerToken, Credential},
    db::lock_connection,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, base, log_in_register, text_input},
    json::{JsonBody, required_text},
    user::{UserProfile, get_user_by_email},
};

/// The state needed to log users in and out.
#[derive(Clone)]
pub struct LogInState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The strategy that issues and revokes credentials.
    pub authenticator: Arc<dyn Authenticator>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            authenticator: state.authenticator.clone(),
        }
    }
}

/// The credentials sent by the client to log in.
///
/// The password is kept as a plain string. There is no need for validation
/// here since it is only compared against the stored hash.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    /// The email the user registered with.
    pub email: Option<String>,
    /// The user's password.
    pub senha: Option<String>,
}

#[derive(Serialize)]
struct LogInResponse {
    message: &'static str,
    user: UserProfile,
    #[serde(flatten)]
    token: Option<BearerToken>,
}

#[derive(Serialize)]
struct LogOutResponse {
    message: &'static str,
}

/// Split a credential into the parts of a response: a bearer token for the
/// body or cookies for the headers.
fn split_credential(credential: Credential) -> (Option<BearerToken>, Option<PrivateCookieJar>) {
    match credential {
        Credential::Bearer(token) => (Some(token), None),
        Credential::Cookies(jar) => (None, Some(jar)),
        Credential::Nothing => (None, None),
    }
}

/// Handler for log-in requests.
///
/// On success the response carries the user's profile plus either a bearer
/// token in the body or a session cookie, depending on the auth strategy.
///
/// # Errors
///
/// Returns a:
/// - [Error::Validation] if the email or password is missing,
/// - [Error::InvalidCredentials] if no user has that email or the password is wrong.
pub async fn post_log_in(
    State(state): State<LogInState>,
    JsonBody(data): JsonBody<LogInData>,
) -> Result<Response, Error> {
    let email = required_text(data.email, "email is required")?;
    let password = data
        .senha
        .filter(|password| !password.is_empty())
        .ok_or_else(|| Error::Validation("senha is required".to_owned()))?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound(_)) => {
                tracing::debug!("Log-in attempt for unknown email");
                return Err(Error::InvalidCredentials);
            }
            Err(error) => return Err(error),
        }
    };

    if !user.password_hash.verify(&password)? {
        tracing::debug!("Wrong password for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let (token, jar) = split_credential(state.authenticator.issue(user.id)?);
    tracing::info!("User {} logged in", user.id);

    Ok((
        jar,
        Json(LogInResponse {
            message: "Login successful",
            user: UserProfile::from(&user),
            token,
        }),
    )
        .into_response())
}

/// Handler for log-out requests.
///
/// Session cookies are expired and the session deleted. Bearer tokens cannot
/// be revoked, the client simply forgets the token.
pub async fn post_log_out(
    State(state): State<LogInState>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let (_, jar) = split_credential(state.authenticator.revoke(&headers)?);

    Ok((
        jar,
        Json(LogOutResponse {
            message: "Logout successful",
        }),
    )
        .into_response())
}

const LOG_IN_SCRIPT: &str = r#"
document.addEventListener("DOMContentLoaded", () => {
    const form = document.getElementById("log-in-form");
    const errorMessage = document.getElementById("error-message");

    form.addEventListener("submit", async (event) => {
        event.preventDefault();
        errorMessage.textContent = "";

        const response = await fetch(form.dataset.endpoint, {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify({
                email: form.elements.email.value,
                senha: form.elements.senha.value,
            }),
        });
        const body = await response.json();

        if (!response.ok) {
            errorMessage.textContent = body.error;
        } else if (body.token) {
            errorMessage.textContent =
                "Logged in with a bearer token. The dashboard needs the session strategy.";
        } else {
            window.location.assign(form.dataset.redirect);
        }
    });
});
"#;

fn log_in_form() -> Markup {
    html! {
        form
            id="log-in-form"
            data-endpoint=(endpoints::LOG_IN)
            data-redirect=(endpoints::DASHBOARD_VIEW)
        {
            (text_input("Email", "email", "email"))
            (text_input("Senha", "senha", "password"))

            p id="error-message" class="error-message" {}

            button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
            {
                "Entrar"
            }
        }
    }
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    let content = log_in_register("Entrar na sua conta", &log_in_form());
    let script = HeadElement::ScriptSource(PreEscaped(LOG_IN_SCRIPT.to_owned()));

    base("Log In", &[script], &content).into_response()
}


#[cfg(test)]
mod log_in_tests {
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        auth::{AuthStrategy, COOKIE_SESSION},
        endpoints,
        test_utils::{TEST_PASSWORD, get_test_server, must_create_user},
    };

    fn server_with_user(strategy: AuthStrategy) -> TestServer {
        let (server, state) = get_test_server(strategy);
        must_create_user("maria@example.com", &state.db_connection.lock().unwrap());

        server
    }

    #[tokio::test]
    async fn log_in_returns_token_for_token_strategy() {
        let server = server_with_user(AuthStrategy::Token);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "maria@example.com", "senha": TEST_PASSWORD }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["email"], "maria@example.com");
        assert!(body["user"].get("senha").is_none());
        assert!(body["token"].is_string());
        assert!(body["expires_at"].is_string());
    }

    #[tokio::test]
    async fn log_in_sets_cookie_for_session_strategy() {
        let server = server_with_user(AuthStrategy::Session);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "maria@example.com", "senha": TEST_PASSWORD }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert!(body.get("token").is_none());
        let cookie = response.cookie(COOKIE_SESSION);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let server = server_with_user(AuthStrategy::Token);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "maria@example.com", "senha": "wrongpassword" }))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let server = server_with_user(AuthStrategy::Token);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "joao@example.com", "senha": TEST_PASSWORD }))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_in_fails_with_missing_fields() {
        let server = server_with_user(AuthStrategy::Token);

        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "maria@example.com" }))
            .await
            .assert_status_bad_request();
        server
            .post(endpoints::LOG_IN)
            .json(&json!({ "senha": TEST_PASSWORD }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn log_out_ends_the_session() {
        let server = server_with_user(AuthStrategy::Session);
        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "email": "maria@example.com", "senha": TEST_PASSWORD }))
            .await;
        let cookie = response.cookie(COOKIE_SESSION);

        server
            .get(endpoints::CATEGORIES)
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();

        server
            .post(endpoints::LOG_OUT)
            .add_cookie(cookie.clone())
            .await
            .assert_status_ok();

        server
            .get(endpoints::CATEGORIES)
            .add_cookie(cookie)
            .await
            .assert_status_unauthorized();
    }
}
