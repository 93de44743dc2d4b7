//! Easy-button routes - shortcuts that pre-fill the entry form
//!
//! Structure:
//! - api.rs: JSON listing
//! - page.rs: Add and delete forms

pub mod api;
pub mod page;

pub use api::api_easy_buttons;
pub use page::{easy_button_add, easy_button_delete, page_easy_buttons};
