//! The API endpoints URIs.

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/login";

/// The route for registering a new user.
pub const REGISTER: &str = "/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";

/// The route to list users.
pub const USERS: &str = "/users";
/// The route to access a single user.
pub const USER: &str = "/users/{user_id}";

/// The route to create and list categories.
pub const CATEGORIES: &str = "/api/categorias";
/// The route to access a single category.
pub const CATEGORY: &str = "/api/categorias/{category_id}";

/// The route to create and list accounts.
pub const ACCOUNTS: &str = "/api/contas";
/// The route to access a single account.
pub const ACCOUNT: &str = "/api/contas/{account_id}";

/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transacoes";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transacoes/{transaction_id}";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let (Some(start), Some(end)) = (endpoint_path.find('{'), endpoint_path.find('}')) else {
        return endpoint_path.to_owned();
    };

    if end < start {
        return endpoint_path.to_owned();
    }

    format!("{}{}{}", &endpoint_path[..start], id, &endpoint_path[end + 1..])
}
