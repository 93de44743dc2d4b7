//! Renders directives back into ledger file text

use crate::directives::{Directive, Posting, Transaction};
use crate::error::ParseError;
use crate::types::{escape_string, Account, Meta, StringValue};

pub struct BeancountWriter;

impl BeancountWriter {
    /// Render a full ledger file. Transactions and raw blocks are separated
    /// by a blank line, runs of options and opens are kept together.
    pub fn write(directives: &[Directive]) -> Result<String, ParseError> {
        let mut out = String::new();
        let mut previous: Option<&Directive> = None;

        for directive in directives {
            if let Some(prev) = previous {
                if Self::needs_gap(prev, directive) {
                    out.push('\n');
                }
            }
            Self::write_directive(directive, &mut out)?;
            previous = Some(directive);
        }

        Ok(out)
    }

    fn needs_gap(prev: &Directive, next: &Directive) -> bool {
        match (prev, next) {
            (Directive::Option(_), Directive::Option(_)) => false,
            (Directive::Open(_) | Directive::Close(_), Directive::Open(_) | Directive::Close(_)) => false,
            _ => true,
        }
    }

    pub fn write_directive(directive: &Directive, out: &mut String) -> Result<(), ParseError> {
        match directive {
            Directive::Option(option) => {
                out.push_str(&format!(
                    "option \"{}\" \"{}\"\n",
                    escape_string(&option.key),
                    escape_string(&option.value)
                ));
            }
            Directive::Open(open) => {
                Self::check_account(&open.account)?;
                out.push_str(&format!("{} open {}", open.date.format("%Y-%m-%d"), open.account.name));
                if !open.currencies.is_empty() {
                    out.push(' ');
                    out.push_str(&open.currencies.join(","));
                }
                out.push('\n');
                Self::write_meta(&open.meta, out);
            }
            Directive::Close(close) => {
                Self::check_account(&close.account)?;
                out.push_str(&format!("{} close {}\n", close.date.format("%Y-%m-%d"), close.account.name));
            }
            Directive::Transaction(txn) => Self::write_transaction(txn, out)?,
            Directive::Raw(raw) => {
                out.push_str(raw.content.trim_end_matches('\n'));
                out.push('\n');
            }
        }
        Ok(())
    }

    fn write_transaction(txn: &Transaction, out: &mut String) -> Result<(), ParseError> {
        out.push_str(&format!("{} {}", txn.date.format("%Y-%m-%d"), txn.flag));
        if let Some(payee) = &txn.payee {
            out.push_str(&format!(" \"{}\"", escape_string(payee)));
        }
        out.push_str(&format!(" \"{}\"", escape_string(&txn.narration)));
        for tag in &txn.tags {
            out.push_str(&format!(" #{}", tag));
        }
        for link in &txn.links {
            out.push_str(&format!(" ^{}", link));
        }
        out.push('\n');

        Self::write_meta(&txn.meta, out);
        for posting in &txn.postings {
            Self::write_posting(posting, out)?;
        }
        Ok(())
    }

    fn write_posting(posting: &Posting, out: &mut String) -> Result<(), ParseError> {
        Self::check_account(&posting.account)?;
        out.push_str("  ");
        if let Some(flag) = &posting.flag {
            out.push_str(flag);
            out.push(' ');
        }
        out.push_str(&posting.account.name);
        if let Some(amount) = &posting.amount {
            if amount.currency.is_empty() || amount.currency.chars().any(char::is_whitespace) {
                return Err(ParseError::ValidationError {
                    message: format!("invalid currency '{}' on {}", amount.currency, posting.account.name),
                });
            }
            out.push_str(&format!("  {} {}", amount.amount, amount.currency));
        }
        out.push('\n');
        Ok(())
    }

    fn write_meta(meta: &Meta, out: &mut String) {
        for (key, value) in meta.iter() {
            match value {
                StringValue::Quote(v) => out.push_str(&format!("  {}: \"{}\"\n", key, escape_string(v))),
                StringValue::Unquote(v) => out.push_str(&format!("  {}: {}\n", key, v)),
            }
        }
    }

    /// An account name the parser would not read back must never reach the file
    fn check_account(account: &Account) -> Result<(), ParseError> {
        let readable = !account.name.chars().any(char::is_whitespace)
            && Account::from_name(&account.name).is_some();
        if readable {
            Ok(())
        } else {
            Err(ParseError::ValidationError {
                message: format!("invalid account name '{}'", account.name),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::{OpenDirective, OptionDirective};
    use crate::parser::SimpleBeancountParser;
    use crate::types::Amount;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn account(name: &str) -> Account {
        Account::from_name(name).unwrap()
    }

    fn sample_transaction(narration: &str) -> Transaction {
        let mut meta = Meta::default();
        meta.insert("guid".to_string(), StringValue::Quote("abc123".to_string()));
        Transaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            flag: "*".to_string(),
            payee: None,
            narration: narration.to_string(),
            tags: vec![],
            links: vec![],
            postings: vec![
                Posting {
                    flag: None,
                    account: account("Assets:Checking"),
                    amount: Some(Amount { amount: Decimal::new(-420, 2), currency: "USD".to_string() }),
                },
                Posting {
                    flag: None,
                    account: account("Expenses:Food"),
                    amount: Some(Amount { amount: Decimal::new(420, 2), currency: "USD".to_string() }),
                },
            ],
            meta,
        }
    }

    #[test]
    fn test_write_layout() {
        let mut meta = Meta::default();
        meta.insert("placeholder".to_string(), StringValue::Quote("TRUE".to_string()));
        let directives = vec![
            Directive::Option(OptionDirective { key: "operating_currency".to_string(), value: "USD".to_string() }),
            Directive::Open(OpenDirective {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                account: account("Expenses"),
                currencies: vec![],
                meta,
            }),
            Directive::Open(OpenDirective {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                account: account("Expenses:Food"),
                currencies: vec!["USD".to_string()],
                meta: Meta::default(),
            }),
            Directive::Transaction(sample_transaction("Groceries")),
        ];

        let text = BeancountWriter::write(&directives).unwrap();
        let expected = "option \"operating_currency\" \"USD\"\n\n\
2020-01-01 open Expenses\n  placeholder: \"TRUE\"\n\
2020-01-01 open Expenses:Food USD\n\n\
2024-03-01 * \"Groceries\"\n  guid: \"abc123\"\n  Assets:Checking  -4.20 USD\n  Expenses:Food  4.20 USD\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_written_transaction_reads_back() {
        let txn = sample_transaction("Dinner, \"fancy\"\nsecond line");
        let text = BeancountWriter::write(&[Directive::Transaction(txn.clone())]).unwrap();
        let parsed = SimpleBeancountParser::parse(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].data, Directive::Transaction(txn));
    }

    #[test]
    fn test_rejects_unreadable_account() {
        let mut txn = sample_transaction("x");
        txn.postings[1].account.name = "Expenses:Eating Out".to_string();
        let err = BeancountWriter::write(&[Directive::Transaction(txn)]).unwrap_err();
        assert!(matches!(err, ParseError::ValidationError { .. }));
    }
}
