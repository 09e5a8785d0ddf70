//! Categories group a user's transactions, e.g. "Alimentação" or "Lazer".

mod core;
mod endpoints;

pub(crate) use core::{
    CategoryId, create_category, create_category_table, ensure_category_owned, list_categories,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_category_endpoint,
    list_categories_endpoint, update_category_endpoint,
};

#[cfg(test)]
pub(crate) use core::delete_category;
