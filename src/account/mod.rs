//! Accounts hold a balance that transactions post to.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;

pub(crate) use core::{
    Account, AccountId, apply_posting, create_account, create_account_table,
    get_total_account_balance, list_accounts,
};
pub use create_endpoint::create_account_endpoint;
pub use delete_endpoint::delete_account_endpoint;
pub use edit_endpoint::edit_account_endpoint;
pub use get_endpoint::{get_account_endpoint, list_accounts_endpoint};

#[cfg(test)]
pub(crate) use core::{delete_account, get_account};
