//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    auth::Authenticator,
    db::{initialize, lock_connection},
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// The strategy used to authenticate requests, chosen at startup.
    pub authenticator: Arc<dyn Authenticator>,

    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// The `authenticator` should share `db_connection` if it needs the database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        authenticator: Arc<dyn Authenticator>,
        password_cost: u32,
    ) -> Result<Self, Error> {
        {
            let connection = lock_connection(&db_connection)?;
            initialize(&connection)?;
        }

        Ok(Self {
            db_connection,
            authenticator,
            password_cost,
        })
    }
}
