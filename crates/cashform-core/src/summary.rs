//! Flat string tokens that identify a transaction in a form dropdown
//!
//! A token reads like
//! `Txn: Coffee,Amount: $4.20,Date: 2024-03-01,Source: Checking,Dest: Dining,GUID: 3f2a...`.
//! Everything but the GUID is for display only; decoding looks at nothing else.

use crate::error::{CoreError, CoreResult};
use crate::models::short_name;
use crate::transactions::TransactionView;

pub const FIELD_DELIMITER: char = ',';

/// Stands in for the delimiter inside display fields
const DELIMITER_STANDIN: &str = ";";
const DESCRIPTION_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    Txn,
    Amount,
    Date,
    Source,
    Dest,
    Guid,
}

impl SummaryField {
    /// Field order in a token. The GUID is always last.
    pub const ORDER: [SummaryField; 6] = [
        SummaryField::Txn,
        SummaryField::Amount,
        SummaryField::Date,
        SummaryField::Source,
        SummaryField::Dest,
        SummaryField::Guid,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SummaryField::Txn => "Txn: ",
            SummaryField::Amount => "Amount: ",
            SummaryField::Date => "Date: ",
            SummaryField::Source => "Source: ",
            SummaryField::Dest => "Dest: ",
            SummaryField::Guid => "GUID: ",
        }
    }

    fn value(&self, view: &TransactionView, symbol: &str) -> String {
        match self {
            SummaryField::Txn => view.description.chars().take(DESCRIPTION_WIDTH).collect(),
            SummaryField::Amount => format!("{}{:.2}", symbol, view.amount.round_dp(2)),
            SummaryField::Date => view.date.format("%Y-%m-%d").to_string(),
            SummaryField::Source => short_name(&view.source).to_string(),
            SummaryField::Dest => short_name(&view.dest).to_string(),
            SummaryField::Guid => view.id.clone(),
        }
    }
}

/// Encode a listed transaction as a selection token
pub fn summarize(view: &TransactionView, symbol: &str) -> String {
    let mut token = String::new();
    for (i, field) in SummaryField::ORDER.iter().enumerate() {
        if i > 0 {
            token.push(FIELD_DELIMITER);
        }
        let value = field.value(view, symbol);
        token.push_str(field.label());
        if *field == SummaryField::Guid {
            token.push_str(&value);
        } else {
            token.push_str(&value.replace(FIELD_DELIMITER, DELIMITER_STANDIN));
        }
    }
    token
}

/// Recover the transaction id from a token made by [`summarize`]
pub fn extract_id(token: &str) -> CoreResult<&str> {
    let last = match token.rsplit_once(FIELD_DELIMITER) {
        Some((_, last)) => last,
        None => token,
    };
    match last.trim().strip_prefix(SummaryField::Guid.label()) {
        Some(id) if !id.trim().is_empty() => Ok(id.trim()),
        _ => Err(CoreError::InvalidFormat {
            message: format!("no transaction id in {:?}", token),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn view(description: &str, id: &str) -> TransactionView {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        TransactionView {
            id: id.to_string(),
            date,
            enter_date: date.and_hms_opt(12, 30, 0).unwrap(),
            description: description.to_string(),
            source: "Assets:Checking".to_string(),
            dest: "Expenses:Food:Dining".to_string(),
            amount: Decimal::new(42, 1),
        }
    }

    #[test]
    fn test_summarize_layout() {
        let token = summarize(&view("Coffee", "abc123"), "$");
        assert_eq!(
            token,
            "Txn: Coffee,Amount: $4.20,Date: 2024-03-01,Source: Checking,Dest: Dining,GUID: abc123"
        );
    }

    #[test]
    fn test_description_is_truncated() {
        let token = summarize(&view("Weekly grocery run at the market", "id"), "$");
        assert!(token.starts_with("Txn: Weekly grocery run a,"));
    }

    #[test]
    fn test_delimiter_in_description_keeps_six_fields() {
        let token = summarize(&view("Milk, eggs, bread", "f00d"), "$");
        assert_eq!(token.split(FIELD_DELIMITER).count(), SummaryField::ORDER.len());
        assert!(token.starts_with("Txn: Milk; eggs; bread,"));
        assert_eq!(extract_id(&token).unwrap(), "f00d");
    }

    #[test]
    fn test_extract_id_from_summary() {
        let id = "9b1deb4d3b7d4bad9bdd2b0d7b3dcb6d";
        assert_eq!(extract_id(&summarize(&view("Rent", id), "€")).unwrap(), id);
    }

    #[test]
    fn test_extract_id_rejects_garbage() {
        assert!(matches!(extract_id(""), Err(CoreError::InvalidFormat { .. })));
        assert!(matches!(extract_id("Txn: Rent,Amount: $1.00"), Err(CoreError::InvalidFormat { .. })));
        assert!(matches!(extract_id("Txn: Rent,GUID: "), Err(CoreError::InvalidFormat { .. })));
        assert_eq!(extract_id("GUID: lonely").unwrap(), "lonely");
    }
}
