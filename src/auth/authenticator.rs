//! The capability interface shared by the authentication strategies.

use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum_extra::extract::PrivateCookieJar;
use clap::ValueEnum;
use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{SessionAuthenticator, TokenAuthenticator},
    user::UserID,
};

/// Resolves the user behind a request and hands out credentials.
///
/// The server picks one implementation at startup, see [build_authenticator].
pub trait Authenticator: Send + Sync {
    /// Find the user that `headers` authenticate.
    ///
    /// # Errors
    ///
    /// Returns [Error::Unauthenticated] if the credential is missing, malformed,
    /// expired or otherwise invalid. Store errors are passed through.
    fn resolve(&self, headers: &HeaderMap) -> Result<UserID, Error>;

    /// Create a credential for a user who has just proven their identity.
    fn issue(&self, user_id: UserID) -> Result<Credential, Error>;

    /// Invalidate the credential carried by `headers`, if the strategy can.
    fn revoke(&self, headers: &HeaderMap) -> Result<Credential, Error>;
}

/// A signed bearer token and when it stops being valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BearerToken {
    /// The encoded token to send in the `Authorization` header.
    pub token: String,
    /// When the token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// What the client has to store (or forget) after logging in or out.
pub enum Credential {
    /// A token the client sends back as `Authorization: Bearer <token>`.
    Bearer(BearerToken),
    /// Cookies to set on, or expire from, the client.
    Cookies(PrivateCookieJar),
    /// The client does not need to change anything.
    Nothing,
}

/// The available authentication strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthStrategy {
    /// Stateless signed tokens in the `Authorization` header.
    Token,
    /// Server-side sessions referenced by an encrypted cookie.
    Session,
}

/// Create the authenticator for `strategy`.
///
/// `secret` signs tokens or encrypts session cookies, and credentials stay
/// valid for `duration`. Sessions are stored through `db_connection`.
pub fn build_authenticator(
    strategy: AuthStrategy,
    secret: &str,
    duration: Duration,
    db_connection: Arc<Mutex<Connection>>,
) -> Arc<dyn Authenticator> {
    match strategy {
        AuthStrategy::Token => Arc::new(TokenAuthenticator::new(secret, duration)),
        AuthStrategy::Session => {
            Arc::new(SessionAuthenticator::new(secret, duration, db_connection))
        }
    }
}
