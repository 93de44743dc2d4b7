//! Transaction routes - entry form, deletion and listings
//!
//! Structure:
//! - api.rs: JSON listing with selection tokens
//! - page.rs: Entry and delete forms, listing pages

pub mod api;
pub mod page;

pub use api::{api_transactions, TransactionItem};
pub use page::{
    delete_submit,
    entry_submit,
    page_account_transactions,
    page_delete,
    page_entry,
    page_transactions,
};
