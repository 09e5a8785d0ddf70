//! Transactions record money earned or spent. Every transaction posts its
//! signed amount to the balance of its account.

mod core;
mod endpoints;
mod posting;
mod request;

pub use core::{NewTransaction, TransactionKind, create_transaction_table};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
    list_transactions_endpoint, update_transaction_endpoint,
};
pub use posting::create_transaction;

#[cfg(test)]
pub(crate) use core::TransactionUpdate;
