//! Stateless authentication with signed JSON Web Tokens.
//!
//! The client receives a token at log-in and sends it back in the
//! `Authorization: Bearer <token>` header. There is no refresh or revocation:
//! a token is valid until it expires.

use axum::http::HeaderMap;
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Authenticator, BearerToken, Credential},
    user::UserID,
};

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Claims {
    /// The ID of the user the token was issued to.
    pub sub: i64,
    /// The time the token was issued, in seconds since the Unix epoch.
    pub iat: u64,
    /// The expiry time of the token, in seconds since the Unix epoch.
    pub exp: u64,
}

/// Authenticates requests with bearer tokens.
pub struct TokenAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration: Duration,
}

impl TokenAuthenticator {
    /// Create an authenticator that signs tokens with `secret` and issues
    /// tokens that are valid for `duration`.
    pub fn new(secret: &str, duration: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            duration,
        }
    }

    fn encode(&self, user_id: UserID, issued_at: OffsetDateTime) -> Result<BearerToken, Error> {
        let expires_at = issued_at + self.duration;
        let claims = Claims {
            sub: user_id.as_i64(),
            iat: unix_seconds(issued_at),
            exp: unix_seconds(expires_at),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map(|token| BearerToken { token, expires_at })
            .map_err(|error| Error::TokenCreation(error.to_string()))
    }

    fn decode(&self, token: &str) -> Result<Claims, Error> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|token_data| token_data.claims)
            .map_err(|error| {
                tracing::debug!("Rejected bearer token: {error}");
                Error::Unauthenticated
            })
    }
}

fn unix_seconds(date_time: OffsetDateTime) -> u64 {
    date_time.unix_timestamp().max(0) as u64
}

impl Authenticator for TokenAuthenticator {
    fn resolve(&self, headers: &HeaderMap) -> Result<UserID, Error> {
        let Authorization(bearer) = headers
            .typed_get::<Authorization<Bearer>>()
            .ok_or(Error::Unauthenticated)?;

        self.decode(bearer.token())
            .map(|claims| UserID::new(claims.sub))
    }

    fn issue(&self, user_id: UserID) -> Result<Credential, Error> {
        self.encode(user_id, OffsetDateTime::now_utc())
            .map(Credential::Bearer)
    }

    fn revoke(&self, _headers: &HeaderMap) -> Result<Credential, Error> {
        Ok(Credential::Nothing)
    }
}
