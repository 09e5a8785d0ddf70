//! Password strength checks and bcrypt hashing.

use std::fmt::Display;

use zxcvbn::{Score, zxcvbn};

use crate::Error;

/// A raw password that passed the strength check and may be hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check the strength of `raw_password`.
    ///
    /// `user_inputs` holds the other details the user entered, such as their
    /// name and email, so that passwords derived from them score as weak.
    ///
    /// # Errors
    ///
    /// Returns [Error::TooWeak] with zxcvbn's advice if the password is too
    /// easy to guess.
    pub fn new(raw_password: &str, user_inputs: &[&str]) -> Result<Self, Error> {
        let entropy = zxcvbn(raw_password, user_inputs);

        if matches!(entropy.score(), Score::Three | Score::Four) {
            return Ok(Self(raw_password.to_owned()));
        }

        let advice = entropy
            .feedback()
            .map(|feedback| feedback.to_string())
            .filter(|advice| !advice.trim().is_empty())
            .unwrap_or_else(|| "use a longer password with less common words".to_owned());

        Err(Error::TooWeak(advice))
    }

    /// Wrap `raw_password` without checking its strength, for fixtures and
    /// seeded accounts.
    pub fn new_unchecked(raw_password: &str) -> Self {
        Self(raw_password.to_owned())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("********")
    }
}

/// A salted bcrypt hash, as stored in `usuarios.senha`.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// bcrypt's recommended cost.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with `cost` rounds of bcrypt.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if bcrypt fails, e.g. for a cost outside 4 to 31.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        bcrypt::hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap a hash read back from the database.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_owned())
    }

    /// Whether `raw_password` is the password this hash was made from.
    ///
    /// # Errors
    ///
    /// Returns [Error::HashingError] if the stored hash is malformed.
    pub fn verify(&self, raw_password: &str) -> Result<bool, Error> {
        bcrypt::verify(raw_password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
