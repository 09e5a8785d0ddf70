//! Stateful authentication with server-side sessions.
//!
//! Logging in stores a random session ID in the `sessoes` table. The ID is
//! sent to the client in a private (encrypted and signed) cookie, and each
//! request is authenticated by looking the ID up. Logging out deletes the row.

use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Authenticator, Credential},
    db::lock_connection,
    user::UserID,
};

/// The name of the cookie holding the session ID.
pub(crate) const COOKIE_SESSION: &str = "session_id";

/// Authenticates requests with session cookies.
pub struct SessionAuthenticator {
    cookie_key: Key,
    duration: Duration,
    db_connection: Arc<Mutex<Connection>>,
}

impl SessionAuthenticator {
    /// Create an authenticator whose cookie key is derived from `secret` and
    /// whose sessions last for `duration`.
    pub fn new(secret: &str, duration: Duration, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(secret),
            duration,
            db_connection,
        }
    }

    fn session_id_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        PrivateCookieJar::from_headers(headers, self.cookie_key.clone())
            .get(COOKIE_SESSION)
            .map(|cookie| cookie.value_trimmed().to_owned())
    }

    fn session_cookie(&self, value: String, expires_at: OffsetDateTime) -> Cookie<'static> {
        Cookie::build((COOKIE_SESSION, value))
            .path("/")
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .build()
    }
}

impl Authenticator for SessionAuthenticator {
    fn resolve(&self, headers: &HeaderMap) -> Result<UserID, Error> {
        let session_id = self
            .session_id_from_headers(headers)
            .ok_or(Error::Unauthenticated)?;
        let connection = lock_connection(&self.db_connection)?;

        get_session_user(&session_id, OffsetDateTime::now_utc(), &connection)
    }

    fn issue(&self, user_id: UserID) -> Result<Credential, Error> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.duration;

        let session_id = {
            let connection = lock_connection(&self.db_connection)?;
            delete_expired_sessions(now, &connection)?;
            create_session(user_id, expires_at, &connection)?
        };

        let jar = PrivateCookieJar::new(self.cookie_key.clone())
            .add(self.session_cookie(session_id, expires_at));

        Ok(Credential::Cookies(jar))
    }

    fn revoke(&self, headers: &HeaderMap) -> Result<Credential, Error> {
        if let Some(session_id) = self.session_id_from_headers(headers) {
            let connection = lock_connection(&self.db_connection)?;
            delete_session(&session_id, &connection)?;
        }

        let mut expired_cookie =
            self.session_cookie("deleted".to_owned(), OffsetDateTime::UNIX_EPOCH);
        expired_cookie.set_max_age(Duration::ZERO);

        Ok(Credential::Cookies(
            PrivateCookieJar::new(self.cookie_key.clone()).add(expired_cookie),
        ))
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub(crate) fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

/// Create the session table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub(crate) fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS sessoes (
                id TEXT PRIMARY KEY,
                usuario_id INTEGER NOT NULL REFERENCES usuarios(id) ON DELETE CASCADE,
                expira_em INTEGER NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Store a new session for `user_id` and return its ID.
///
/// The ID is 256 random bits encoded as hex.
fn create_session(
    user_id: UserID,
    expires_at: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let session_id = hex::encode(bytes);

    connection.execute(
        "INSERT INTO sessoes (id, usuario_id, expira_em) VALUES (?1, ?2, ?3)",
        params![session_id, user_id.as_i64(), expires_at.unix_timestamp()],
    )?;

    Ok(session_id)
}

/// Get the user that owns the session `session_id`, if the session has not
/// expired by `now`.
///
/// # Errors
///
/// Returns [Error::Unauthenticated] for unknown or expired sessions.
fn get_session_user(
    session_id: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    connection
        .query_row(
            "SELECT usuario_id FROM sessoes WHERE id = ?1 AND expira_em > ?2",
            params![session_id, now.unix_timestamp()],
            |row| row.get(0).map(UserID::new),
        )
        .optional()?
        .ok_or(Error::Unauthenticated)
}

fn delete_session(session_id: &str, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM sessoes WHERE id = ?1", params![session_id])?;

    Ok(())
}

fn delete_expired_sessions(now: OffsetDateTime, connection: &Connection) -> Result<(), Error> {
    let deleted = connection.execute(
        "DELETE FROM sessoes WHERE expira_em <= ?1",
        params![now.unix_timestamp()],
    )?;

    if deleted > 0 {
        tracing::debug!("Deleted {deleted} expired sessions");
    }

    Ok(())
}
