//! In-memory image of the ledger file
//!
//! A [`Book`] is built from parsed directives and turned back into directives
//! for saving. Options, accounts and transactions are modelled; close
//! directives and raw blocks pass through untouched. On save the file is laid
//! out as options, opens, pass-through blocks, then transactions in book order.

use cashform_parser::{
    Account as ParserAccount, Amount, Directive, Meta, OpenDirective, OptionDirective, Posting,
    SpannedDirective, StringValue, Transaction as ParserTransaction,
};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};
use crate::models::{Account, Split, Transaction};

const META_GUID: &str = "guid";
const META_ENTERED: &str = "entered";
const META_PLACEHOLDER: &str = "placeholder";
const ENTERED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Location of one split inside the book
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SplitRef {
    pub transaction_id: String,
    pub index: usize,
}

/// Location of one posting inside a transaction kept as a pass-through block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassthroughPostingRef {
    pub block: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Book {
    options: Vec<OptionDirective>,
    accounts: Vec<Account>,
    transactions: Vec<Transaction>,
    passthrough: Vec<Directive>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a book from parsed directives and check it is consistent
    pub fn from_directives(directives: Vec<SpannedDirective>) -> CoreResult<Self> {
        let mut book = Book::new();
        let mut seen_ids = HashSet::new();

        for spanned in directives {
            let line = spanned.span.start;
            match spanned.data {
                Directive::Option(option) => book.options.push(option),
                Directive::Open(open) => {
                    let account = account_from_open(open);
                    if book.account(&account.fullname).is_some() {
                        return Err(CoreError::DuplicateEntry {
                            entry: format!("account {} (line {})", account.fullname, line),
                        });
                    }
                    book.accounts.push(account);
                }
                Directive::Transaction(txn) => match transaction_from_directive(&txn, line)? {
                    Some(converted) => {
                        if !seen_ids.insert(converted.id.clone()) {
                            return Err(CoreError::DuplicateEntry {
                                entry: format!("transaction {} (line {})", converted.id, line),
                            });
                        }
                        book.transactions.push(converted);
                    }
                    None => {
                        log::warn!("Transaction at line {} mixes currencies, keeping it as-is", line);
                        book.passthrough.push(Directive::Transaction(txn));
                    }
                },
                other => book.passthrough.push(other),
            }
        }

        book.check_integrity()?;
        log::debug!(
            "Loaded book: {} accounts, {} transactions, {} pass-through blocks",
            book.accounts.len(),
            book.transactions.len(),
            book.passthrough.len()
        );
        Ok(book)
    }

    /// Directives in file order for the writer
    pub fn to_directives(&self) -> Vec<Directive> {
        let mut out = Vec::with_capacity(
            self.options.len() + self.accounts.len() + self.passthrough.len() + self.transactions.len(),
        );
        out.extend(self.options.iter().cloned().map(Directive::Option));
        out.extend(self.accounts.iter().map(|a| Directive::Open(open_from_account(a))));
        out.extend(self.passthrough.iter().cloned());
        out.extend(self.transactions.iter().map(|t| Directive::Transaction(directive_from_transaction(t))));
        out
    }

    // ==================== Queries ====================

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.iter().find(|o| o.key == key).map(|o| o.value.as_str())
    }

    /// Exact fullname lookup
    pub fn account(&self, fullname: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.fullname == fullname)
    }

    /// Case-insensitive fullname lookup. An exact match wins over a case-folded one.
    pub fn find_account(&self, name: &str) -> Option<&Account> {
        let name = name.trim();
        self.account(name).or_else(|| {
            let folded = name.to_lowercase();
            self.accounts.iter().find(|a| a.fullname.to_lowercase() == folded)
        })
    }

    /// Direct children of an account
    pub fn children<'a>(&'a self, fullname: &'a str) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts
            .iter()
            .filter(move |a| a.parent_name() == Some(fullname))
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Every split posted directly to `fullname`, in book order
    pub fn splits_for_account(&self, fullname: &str) -> Vec<SplitRef> {
        self.transactions
            .iter()
            .flat_map(|t| {
                t.splits
                    .iter()
                    .enumerate()
                    .filter(move |(_, s)| s.account == fullname)
                    .map(move |(index, _)| SplitRef {
                        transaction_id: t.id.clone(),
                        index,
                    })
            })
            .collect()
    }

    /// Postings naming `fullname` in transactions the book keeps as-is
    pub fn passthrough_postings(&self, fullname: &str) -> Vec<PassthroughPostingRef> {
        self.passthrough
            .iter()
            .enumerate()
            .filter_map(|(block, d)| match d {
                Directive::Transaction(txn) => Some((block, txn)),
                _ => None,
            })
            .flat_map(|(block, txn)| {
                txn.postings
                    .iter()
                    .enumerate()
                    .filter(move |(_, p)| p.account.name == fullname)
                    .map(move |(index, _)| PassthroughPostingRef { block, index })
            })
            .collect()
    }

    /// Number of unparsed blocks that mention `fullname`
    pub fn raw_references(&self, fullname: &str) -> usize {
        self.passthrough
            .iter()
            .filter(|d| match d {
                Directive::Raw(raw) => raw.content.split_whitespace().any(|token| token == fullname),
                _ => false,
            })
            .count()
    }

    /// Sum of split values posted to the account, and to its descendants when `recursive`
    pub fn balance(&self, fullname: &str, recursive: bool) -> Decimal {
        let prefix = format!("{}:", fullname);
        self.transactions
            .iter()
            .flat_map(|t| t.splits.iter())
            .filter(|s| s.account == fullname || (recursive && s.account.starts_with(&prefix)))
            .map(|s| s.value)
            .sum()
    }

    // ==================== Mutations ====================

    /// Add an account. Its parent must already exist.
    pub fn add_account(&mut self, account: Account) -> CoreResult<()> {
        if self.account(&account.fullname).is_some() {
            return Err(CoreError::DuplicateEntry {
                entry: account.fullname,
            });
        }
        if let Some(parent) = account.parent_name() {
            if self.account(parent).is_none() {
                return Err(CoreError::AccountNotFound {
                    name: parent.to_string(),
                });
            }
        }
        self.accounts.push(account);
        Ok(())
    }

    /// Remove an account that has no children and no splits
    pub fn remove_account(&mut self, fullname: &str) -> CoreResult<Account> {
        let idx = self
            .accounts
            .iter()
            .position(|a| a.fullname == fullname)
            .ok_or_else(|| CoreError::AccountNotFound {
                name: fullname.to_string(),
            })?;

        let children = self.children(fullname).count();
        if children > 0 {
            return Err(CoreError::ReferentialConstraint {
                entity: fullname.to_string(),
                reason: format!("it still has {} child account(s)", children),
            });
        }
        let splits = self.splits_for_account(fullname).len() + self.passthrough_postings(fullname).len();
        if splits > 0 {
            return Err(CoreError::ReferentialConstraint {
                entity: fullname.to_string(),
                reason: format!("{} split(s) still post to it", splits),
            });
        }
        let raw = self.raw_references(fullname);
        if raw > 0 {
            return Err(CoreError::ReferentialConstraint {
                entity: fullname.to_string(),
                reason: format!("{} entry(ies) the app does not edit still name it", raw),
            });
        }

        self.passthrough.retain(|d| match d {
            Directive::Close(close) => close.account.name != fullname,
            _ => true,
        });
        Ok(self.accounts.remove(idx))
    }

    /// Append a transaction. Every split must reference an existing account.
    pub fn add_transaction(&mut self, transaction: Transaction) -> CoreResult<()> {
        if self.transaction(&transaction.id).is_some() {
            return Err(CoreError::DuplicateEntry {
                entry: transaction.id,
            });
        }
        for split in &transaction.splits {
            if self.account(&split.account).is_none() {
                return Err(CoreError::AccountNotFound {
                    name: split.account.clone(),
                });
            }
        }
        self.transactions.push(transaction);
        Ok(())
    }

    pub fn remove_transaction(&mut self, id: &str) -> CoreResult<Transaction> {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoreError::TransactionNotFound { id: id.to_string() })?;
        Ok(self.transactions.remove(idx))
    }

    /// Point one split at another account. Returns the split's value.
    pub fn reassign_split(&mut self, split: &SplitRef, new_account: &str) -> CoreResult<Decimal> {
        if self.account(new_account).is_none() {
            return Err(CoreError::AccountNotFound {
                name: new_account.to_string(),
            });
        }
        let txn = self
            .transactions
            .iter_mut()
            .find(|t| t.id == split.transaction_id)
            .ok_or_else(|| CoreError::TransactionNotFound {
                id: split.transaction_id.clone(),
            })?;
        let target = txn.splits.get_mut(split.index).ok_or_else(|| CoreError::InternalError {
            message: format!("transaction {} has no split {}", split.transaction_id, split.index),
        })?;
        target.account = new_account.to_string();
        Ok(target.value)
    }

    /// Point one pass-through posting at another account
    pub fn reassign_passthrough_posting(&mut self, posting: &PassthroughPostingRef, new_account: &str) -> CoreResult<()> {
        if self.account(new_account).is_none() {
            return Err(CoreError::AccountNotFound {
                name: new_account.to_string(),
            });
        }
        let target = match self.passthrough.get_mut(posting.block) {
            Some(Directive::Transaction(txn)) => txn.postings.get_mut(posting.index),
            _ => None,
        }
        .ok_or_else(|| CoreError::InternalError {
            message: format!("no pass-through posting {} in block {}", posting.index, posting.block),
        })?;
        target.account = parser_account(new_account);
        Ok(())
    }

    /// Every split references an existing account and every transaction balances.
    /// Postings of pass-through transactions must reference existing accounts too.
    pub fn check_integrity(&self) -> CoreResult<()> {
        for directive in &self.passthrough {
            if let Directive::Transaction(txn) = directive {
                for posting in &txn.postings {
                    if self.account(&posting.account.name).is_none() {
                        return Err(CoreError::AccountNotFound {
                            name: posting.account.name.clone(),
                        });
                    }
                }
            }
        }
        for txn in &self.transactions {
            for split in &txn.splits {
                if self.account(&split.account).is_none() {
                    return Err(CoreError::AccountNotFound {
                        name: split.account.clone(),
                    });
                }
            }
            if !txn.imbalance().is_zero() {
                return Err(CoreError::ValidationError {
                    message: format!("transaction {} does not balance ({})", txn.id, txn.imbalance()),
                });
            }
        }
        Ok(())
    }
}

// ==================== Directive conversion ====================

fn account_from_open(mut open: OpenDirective) -> Account {
    let placeholder = open
        .meta
        .remove(META_PLACEHOLDER)
        .map(|v| v.as_str().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Account {
        fullname: open.account.name,
        account_type: open.account.account_type,
        placeholder,
        currencies: open.currencies,
        open_date: open.date,
        meta: open.meta,
    }
}

fn open_from_account(account: &Account) -> OpenDirective {
    let mut meta = Meta::default();
    if account.placeholder {
        meta.insert(META_PLACEHOLDER.to_string(), StringValue::Quote("TRUE".to_string()));
    }
    for (key, value) in account.meta.iter() {
        meta.insert(key.clone(), value.clone());
    }
    OpenDirective {
        date: account.open_date,
        account: parser_account(&account.fullname),
        currencies: account.currencies.clone(),
        meta,
    }
}

fn parser_account(fullname: &str) -> ParserAccount {
    ParserAccount::from_name(fullname).unwrap_or_else(|| ParserAccount {
        // The writer rejects names it cannot read back, so keep the name as-is here
        account_type: cashform_parser::AccountType::Assets,
        name: fullname.to_string(),
        components: vec![],
    })
}

/// Convert a parsed transaction. Returns None for multi-currency entries.
fn transaction_from_directive(txn: &ParserTransaction, line: usize) -> CoreResult<Option<Transaction>> {
    let currencies: HashSet<&str> = txn
        .postings
        .iter()
        .filter_map(|p| p.amount.as_ref().map(|a| a.currency.as_str()))
        .collect();
    if currencies.len() != 1 {
        return Ok(None);
    }
    let currency = currencies.into_iter().next().unwrap_or_default().to_string();

    let missing = txn.postings.iter().filter(|p| p.amount.is_none()).count();
    if missing > 1 {
        return Err(CoreError::InvalidFormat {
            message: format!("transaction at line {} has {} postings without an amount", line, missing),
        });
    }
    let known: Decimal = txn
        .postings
        .iter()
        .filter_map(|p| p.amount.as_ref().map(|a| a.amount))
        .sum();
    let splits = txn
        .postings
        .iter()
        .map(|p| Split {
            account: p.account.name.clone(),
            value: p.amount.as_ref().map(|a| a.amount).unwrap_or(-known),
        })
        .collect();

    let mut meta = txn.meta.clone();
    let id = match meta.remove(META_GUID) {
        Some(v) if !v.as_str().trim().is_empty() => v.as_str().trim().to_string(),
        _ => {
            let id = cashform_utils::generate_guid();
            log::debug!("Transaction at line {} has no guid, assigned {}", line, id);
            id
        }
    };
    let enter_date = match meta.remove(META_ENTERED) {
        Some(v) => parse_entered(v.as_str()).unwrap_or_else(|| {
            log::warn!("Unreadable entered time '{}' at line {}, using the posting date", v.as_str(), line);
            midnight(txn.date)
        }),
        None => midnight(txn.date),
    };

    Ok(Some(Transaction {
        id,
        date: txn.date,
        enter_date,
        description: txn.narration.clone(),
        currency,
        splits,
        flag: txn.flag.clone(),
        payee: txn.payee.clone(),
        tags: txn.tags.clone(),
        links: txn.links.clone(),
        meta,
    }))
}

fn directive_from_transaction(txn: &Transaction) -> ParserTransaction {
    let mut meta = Meta::default();
    meta.insert(META_GUID.to_string(), StringValue::Quote(txn.id.clone()));
    meta.insert(
        META_ENTERED.to_string(),
        StringValue::Quote(txn.enter_date.format(ENTERED_FORMAT).to_string()),
    );
    for (key, value) in txn.meta.iter() {
        meta.insert(key.clone(), value.clone());
    }

    ParserTransaction {
        date: txn.date,
        flag: txn.flag.clone(),
        payee: txn.payee.clone(),
        narration: txn.description.clone(),
        tags: txn.tags.clone(),
        links: txn.links.clone(),
        postings: txn
            .splits
            .iter()
            .map(|s| Posting {
                flag: None,
                account: parser_account(&s.account),
                amount: Some(Amount {
                    amount: s.value,
                    currency: txn.currency.clone(),
                }),
            })
            .collect(),
        meta,
    }
}

fn parse_entered(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), ENTERED_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}
