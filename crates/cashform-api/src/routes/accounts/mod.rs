//! Account routes - account maintenance and balances
//!
//! Features:
//! - Add an account under an existing parent
//! - Delete an account, its transactions move to the inheriting ancestor
//! - Balance of every account, rolled up over sub-accounts
//!
//! Structure:
//! - api.rs: JSON balances
//! - page.rs: Forms and the balances table

pub mod api;
pub mod page;

pub use api::api_accounts;
pub use page::{account_add, account_delete, page_accounts, page_balances};
