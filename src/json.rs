//! Request plumbing: extractors that report bad bodies and path parameters as
//! `400 Bad Request` JSON errors, and helpers for validating the optional
//! fields of request bodies.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::Error;

/// The largest amount or balance, in either direction, that the API accepts.
pub(crate) const MAX_AMOUNT: f64 = 1e15;

/// Like [axum::Json], but a body that cannot be parsed is rejected with
/// [Error::InvalidRequestBody] so the client gets the usual JSON error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// Like [axum::extract::Path], but a parameter that cannot be parsed, such as
/// a non-numeric ID, is rejected with [Error::InvalidPath].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct PathParam<T>(pub T);

/// A number sent by the client, either as a JSON number or as a string such
/// as `"150.75"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    /// A JSON number.
    Number(f64),
    /// A string that should hold a number.
    Text(String),
}

impl NumberInput {
    /// Parse the input as a number no larger than [MAX_AMOUNT] in magnitude.
    ///
    /// # Errors
    /// Returns [Error::Validation] naming `field` if the input is not a finite
    /// number or is out of range.
    pub fn parse(&self, field: &str) -> Result<f64, Error> {
        let value = match self {
            NumberInput::Number(value) => *value,
            NumberInput::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::Validation(format!("{field} must be a number")))?,
        };

        if !value.is_finite() {
            return Err(Error::Validation(format!("{field} must be a number")));
        }

        if value.abs() > MAX_AMOUNT {
            return Err(Error::Validation(format!(
                "{field} must be between -{MAX_AMOUNT} and {MAX_AMOUNT}"
            )));
        }

        Ok(value)
    }
}

/// Return the trimmed text, or a [Error::Validation] with `message` if it is
/// missing or blank.
pub(crate) fn required_text(value: Option<String>, message: &str) -> Result<String, Error> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(Error::Validation(message.to_owned())),
    }
}

/// Like [required_text] but a missing value is fine, only a blank one is not.
pub(crate) fn optional_text(value: Option<String>, message: &str) -> Result<Option<String>, Error> {
    match value {
        Some(text) => required_text(Some(text), message).map(Some),
        None => Ok(None),
    }
}
