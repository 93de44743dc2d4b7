//! Common types for the ledger parser

use serde::{Deserialize, Serialize};

/// Line range of a directive in its source file (1-indexed, inclusive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanInfo {
    pub start: usize,
    pub end: usize,
}

/// Account reference with type and components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_type: AccountType,
    pub name: String,
    pub components: Vec<String>,
}

impl Account {
    /// Split a full account name into its root type and the remaining segments.
    /// Returns None when the root segment is not one of the five account types.
    pub fn from_name(name: &str) -> Option<Self> {
        let mut parts = name.split(':');
        let account_type = parts.next()?.parse().ok()?;
        let components: Vec<String> = parts.map(|s| s.to_string()).collect();
        if components.iter().any(|c| c.is_empty()) {
            return None;
        }
        Some(Account {
            account_type,
            name: name.to_string(),
            components,
        })
    }
}

/// Amount with currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub amount: rust_decimal::Decimal,
    pub currency: String,
}

/// String value (quoted or unquoted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StringValue {
    Quote(String),
    Unquote(String),
}

impl StringValue {
    pub fn as_str(&self) -> &str {
        match self {
            StringValue::Quote(s) => s.as_str(),
            StringValue::Unquote(s) => s.as_str(),
        }
    }
}

/// Account type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountType {
    Assets,
    Liabilities,
    Equity,
    Income,
    Expenses,
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Assets => "Assets",
            AccountType::Liabilities => "Liabilities",
            AccountType::Equity => "Equity",
            AccountType::Income => "Income",
            AccountType::Expenses => "Expenses",
        }
    }

    /// Credit-normal accounts show their balance with the sign flipped
    pub fn is_credit_normal(&self) -> bool {
        matches!(self, AccountType::Liabilities | AccountType::Equity | AccountType::Income)
    }
}

impl std::str::FromStr for AccountType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Assets" => Ok(AccountType::Assets),
            "Liabilities" => Ok(AccountType::Liabilities),
            "Equity" => Ok(AccountType::Equity),
            "Income" => Ok(AccountType::Income),
            "Expenses" => Ok(AccountType::Expenses),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata key-value pairs, kept in file order so a rewrite does not shuffle them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta(Vec<(String, StringValue)>);

impl Meta {
    pub fn get(&self, key: &str) -> Option<&StringValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace a value, keeping the original position of an existing key
    pub fn insert(&mut self, key: String, value: StringValue) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<StringValue> {
        let idx = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, StringValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(String, StringValue)>> for Meta {
    fn from(v: Vec<(String, StringValue)>) -> Self {
        let mut meta = Meta::default();
        for (k, val) in v {
            meta.insert(k, val);
        }
        meta
    }
}

/// Undo the escaping applied by [`escape_string`]
pub fn unescape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Escape a string for use inside double quotes in the ledger file
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_from_name() {
        let acct = Account::from_name("Expenses:Food:Dining").unwrap();
        assert_eq!(acct.account_type, AccountType::Expenses);
        assert_eq!(acct.components, vec!["Food", "Dining"]);

        let root = Account::from_name("Assets").unwrap();
        assert!(root.components.is_empty());

        assert!(Account::from_name("Savings:Cash").is_none());
        assert!(Account::from_name("Assets::Cash").is_none());
    }

    #[test]
    fn test_escape_roundtrip_special_chars() {
        let original = "Say \"hi\"\\bye\nnext";
        let escaped = escape_string(original);
        assert!(!escaped.contains('\n'));
        assert_eq!(unescape_string(&escaped), original);
    }

    #[test]
    fn test_meta_insert_keeps_position() {
        let mut meta = Meta::default();
        meta.insert("guid".to_string(), StringValue::Quote("a".to_string()));
        meta.insert("entered".to_string(), StringValue::Quote("b".to_string()));
        meta.insert("guid".to_string(), StringValue::Quote("c".to_string()));

        let keys: Vec<&str> = meta.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["guid", "entered"]);
        assert_eq!(meta.get("guid").map(|v| v.as_str()), Some("c"));
    }
}
