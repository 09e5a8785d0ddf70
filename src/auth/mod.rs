//! Authentication: password handling, the two credential strategies (bearer
//! tokens and server-side sessions), the middleware that guards protected
//! routes, and the register/log-in/log-out handlers.

mod authenticator;
mod log_in;
mod middleware;
mod password;
mod register;
mod session;
mod token;

pub use authenticator::{AuthStrategy, Authenticator, BearerToken, Credential, build_authenticator};
pub use log_in::{get_log_in_page, post_log_in, post_log_out};
pub use middleware::{auth_guard, auth_guard_page};
pub use password::{PasswordHash, ValidatedPassword};
pub use register::{register_user_endpoint, seed_default_data};
pub use session::SessionAuthenticator;
pub(crate) use session::create_session_table;
pub use token::TokenAuthenticator;

#[cfg(test)]
pub(crate) use session::COOKIE_SESSION;
