//! Dashboard module
//!
//! Provides an overview page with the logged-in user's totals, recent
//! transactions and charts, plus a form for adding transactions.

mod aggregation;
mod charts;
mod handlers;

pub use handlers::get_dashboard_page;
