//! Ledger directive types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::types::{Account, Amount, Meta, SpanInfo};

/// Spanned directive with position info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpannedDirective {
    pub data: Directive,
    pub span: SpanInfo,
    /// Source file path
    pub source: Option<String>,
}

/// Directives the application understands. Everything else is kept as `Raw`
/// so that a load/save cycle does not drop it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    Transaction(Transaction),
    Open(OpenDirective),
    Close(CloseDirective),
    Option(OptionDirective),
    Raw(RawDirective),
}

/// Transaction directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub flag: String,
    pub payee: Option<String>,
    pub narration: String,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    pub postings: Vec<Posting>,
    pub meta: Meta,
}

/// Open directive (account declaration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenDirective {
    pub date: NaiveDate,
    pub account: Account,
    pub currencies: Vec<String>,
    pub meta: Meta,
}

/// Close directive (account closure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseDirective {
    pub date: NaiveDate,
    pub account: Account,
}

/// Option directive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDirective {
    pub key: String,
    pub value: String,
}

/// Verbatim text of a directive the parser does not model, continuation lines included
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDirective {
    pub content: String,
}

/// Posting (transaction entry). A missing amount is inferred from the other postings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub flag: Option<String>,
    pub account: Account,
    pub amount: Option<Amount>,
}
