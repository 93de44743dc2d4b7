//! Route modules for the server
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API endpoints
//! - page.rs: Form pages and their POST handlers

pub mod transactions;
pub mod accounts;
pub mod easy_buttons;

use cashform_utils::escape_html;

/// `<option>` list of account names with an optional preselection
pub fn account_options(names: &[String], selected: Option<&str>) -> String {
    let mut html = String::from("<option value=''>Choose an account</option>");
    for name in names {
        let is_selected = if selected == Some(name.as_str()) { " selected" } else { "" };
        html.push_str(&format!(
            "<option value='{0}'{1}>{0}</option>",
            escape_html(name),
            is_selected
        ));
    }
    html
}

/// Link to the listing filtered by one account
pub fn account_link(fullname: &str) -> String {
    format!(
        "<a href='/transactions/{}' class='text-indigo-600 hover:underline'>{}</a>",
        urlencoding::encode(fullname),
        escape_html(fullname)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_options() {
        let names = vec!["Assets:Checking".to_string(), "Expenses:Food".to_string()];
        let html = account_options(&names, Some("Expenses:Food"));
        assert!(html.contains("<option value='Expenses:Food' selected>Expenses:Food</option>"));
        assert!(html.contains("<option value='Assets:Checking'>"));
    }

    #[test]
    fn test_account_link_encodes_path() {
        let html = account_link("Assets:Checking");
        assert!(html.contains("href='/transactions/Assets%3AChecking'"));
    }
}
