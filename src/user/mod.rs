//! Registered users: the user table and the `/users` endpoints.

mod core;
mod endpoints;

pub use core::{NewUser, User, UserID, create_user};
pub(crate) use core::{
    UserProfile, create_user_table, get_user_by_email, user_exists, validate_email,
};
pub use endpoints::{
    delete_user_endpoint, get_user_endpoint, list_users_endpoint, update_user_endpoint,
};

#[cfg(test)]
pub(crate) use core::{delete_user, list_users};
