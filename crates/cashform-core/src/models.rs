//! Core data models for the ledger

use cashform_parser::{AccountType, Meta};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

/// Separator between account name segments
pub const ACCOUNT_SEPARATOR: char = ':';

/// Account in the hierarchy. The parent is not stored, it is the fullname minus its last segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Full account name (e.g., "Assets:Checking:Budget")
    pub fullname: String,
    pub account_type: AccountType,
    /// Organizational node only, holds no direct balance
    pub placeholder: bool,
    /// Currencies the account is constrained to, empty for any
    pub currencies: Vec<String>,
    pub open_date: NaiveDate,
    /// Metadata other than the placeholder flag, kept for the next save
    #[serde(skip)]
    pub meta: Meta,
}

impl Account {
    /// Last segment of the fullname
    pub fn name(&self) -> &str {
        short_name(&self.fullname)
    }

    pub fn parent_name(&self) -> Option<&str> {
        self.fullname.rsplit_once(ACCOUNT_SEPARATOR).map(|(parent, _)| parent)
    }

    pub fn is_root(&self) -> bool {
        !self.fullname.contains(ACCOUNT_SEPARATOR)
    }

    /// First declared currency
    pub fn commodity(&self) -> Option<&str> {
        self.currencies.first().map(|c| c.as_str())
    }

    /// Depth level (0 = root)
    pub fn depth(&self) -> usize {
        self.fullname.matches(ACCOUNT_SEPARATOR).count()
    }

    /// True when `other` is this account or one of its descendants
    pub fn contains(&self, other: &str) -> bool {
        other == self.fullname
            || other
                .strip_prefix(self.fullname.as_str())
                .is_some_and(|rest| rest.starts_with(ACCOUNT_SEPARATOR))
    }
}

/// Last colon-segment of an account name
pub fn short_name(fullname: &str) -> &str {
    fullname
        .rsplit_once(ACCOUNT_SEPARATOR)
        .map(|(_, last)| last)
        .unwrap_or(fullname)
}

/// One leg of a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    /// Fullname of the account the split posts to
    pub account: String,
    pub value: Decimal,
}

/// Transaction information
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// 32-character hex identifier, stable across saves
    pub id: String,
    /// Posting date
    pub date: NaiveDate,
    /// When the transaction was entered
    pub enter_date: NaiveDateTime,
    pub description: String,
    pub currency: String,
    pub splits: Vec<Split>,
    #[serde(skip)]
    pub flag: String,
    #[serde(skip)]
    pub payee: Option<String>,
    #[serde(skip)]
    pub tags: Vec<String>,
    #[serde(skip)]
    pub links: Vec<String>,
    /// Metadata other than guid/entered
    #[serde(skip)]
    pub meta: Meta,
}

impl Transaction {
    /// A cleared transaction with no payee, tags or extra metadata
    pub fn new(
        id: String,
        date: NaiveDate,
        enter_date: NaiveDateTime,
        description: impl Into<String>,
        currency: impl Into<String>,
        splits: Vec<Split>,
    ) -> Self {
        Self {
            id,
            date,
            enter_date,
            description: description.into(),
            currency: currency.into(),
            splits,
            flag: "*".to_string(),
            payee: None,
            tags: vec![],
            links: vec![],
            meta: Meta::default(),
        }
    }

    pub fn involves_account(&self, fullname: &str) -> bool {
        self.splits.iter().any(|s| s.account == fullname)
    }

    /// Sum of all split values, zero for a balanced transaction
    pub fn imbalance(&self) -> Decimal {
        self.splits.iter().map(|s| s.value).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(fullname: &str) -> Account {
        Account {
            fullname: fullname.to_string(),
            account_type: AccountType::Assets,
            placeholder: false,
            currencies: vec![],
            open_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            meta: Meta::default(),
        }
    }

    #[test]
    fn test_account_hierarchy_helpers() {
        let acct = account("Assets:Checking:Budget");
        assert_eq!(acct.name(), "Budget");
        assert_eq!(acct.parent_name(), Some("Assets:Checking"));
        assert_eq!(acct.depth(), 2);
        assert!(!acct.is_root());

        let root = account("Assets");
        assert!(root.is_root());
        assert_eq!(root.parent_name(), None);
        assert_eq!(root.name(), "Assets");
    }

    #[test]
    fn test_account_contains() {
        let acct = account("Assets:Checking");
        assert!(acct.contains("Assets:Checking"));
        assert!(acct.contains("Assets:Checking:Budget"));
        assert!(!acct.contains("Assets:CheckingOld"));
        assert!(!acct.contains("Assets"));
    }

    #[test]
    fn test_transaction_imbalance() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let txn = Transaction::new(
            "abc".to_string(),
            date,
            date.and_hms_opt(0, 0, 0).unwrap(),
            "x",
            "USD",
            vec![
                Split { account: "Assets:Cash".to_string(), value: Decimal::new(-500, 2) },
                Split { account: "Expenses:Food".to_string(), value: Decimal::new(500, 2) },
            ],
        );
        assert!(txn.imbalance().is_zero());
        assert!(txn.involves_account("Expenses:Food"));
        assert!(!txn.involves_account("Expenses"));
    }
}
