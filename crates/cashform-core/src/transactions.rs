//! Two-legged transaction entry, listing and deletion

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::book::Book;
use crate::error::{CoreError, CoreResult};
use crate::models::{Split, Transaction};
use crate::summary::extract_id;
use crate::Ledger;

/// A listed transaction seen as a transfer from `source` to `dest`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub date: NaiveDate,
    pub enter_date: NaiveDateTime,
    pub description: String,
    pub source: String,
    pub dest: String,
    /// Transferred magnitude, never negative
    pub amount: Decimal,
}

impl TransactionView {
    /// `None` for anything that is not exactly two splits
    pub fn from_transaction(txn: &Transaction) -> Option<Self> {
        let [first, second] = txn.splits.as_slice() else {
            return None;
        };
        let (source, dest) = if first.value > Decimal::ZERO {
            (second, first)
        } else {
            (first, second)
        };
        Some(Self {
            id: txn.id.clone(),
            date: txn.date,
            enter_date: txn.enter_date,
            description: txn.description.clone(),
            source: source.account.clone(),
            dest: dest.account.clone(),
            amount: dest.value.abs(),
        })
    }
}

/// The last `n` transactions of the book (all of them when `n` is 0), newest entry first.
/// Transactions that do not have exactly two splits are left out.
pub fn last_n_transactions(book: &Book, n: usize) -> Vec<TransactionView> {
    let all = book.transactions();
    let start = if n == 0 { 0 } else { all.len().saturating_sub(n) };

    let mut views: Vec<TransactionView> = all[start..]
        .iter()
        .filter_map(|txn| {
            let view = TransactionView::from_transaction(txn);
            if view.is_none() {
                log::debug!(
                    "Skipping transaction {} from listing: {} splits",
                    txn.id,
                    txn.splits.len()
                );
            }
            view
        })
        .collect();
    views.sort_by(|a, b| b.enter_date.cmp(&a.enter_date));
    views
}

/// Views touching `fullname` as source or destination
pub fn transactions_for_account(views: &[TransactionView], fullname: &str) -> Vec<TransactionView> {
    views
        .iter()
        .filter(|v| v.source == fullname || v.dest == fullname)
        .cloned()
        .collect()
}

/// A transfer of `amount` from `debit` to `credit`
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub description: String,
    pub amount: Decimal,
    /// Source account, money leaves it
    pub debit: String,
    /// Destination account, money arrives there
    pub credit: String,
    pub currency: String,
    pub date: NaiveDate,
    pub enter_date: NaiveDateTime,
}

/// Record a new transfer and save the book. Returns the new transaction id.
pub async fn add_transaction(ledger: &mut Ledger, new: NewTransaction) -> CoreResult<String> {
    if new.amount.is_zero() {
        return Err(CoreError::ValidationError {
            message: "amount must not be zero".to_string(),
        });
    }

    let debit = postable_account(ledger, &new.debit)?;
    let credit = postable_account(ledger, &new.credit)?;
    if debit == credit {
        return Err(CoreError::ValidationError {
            message: format!("source and destination are both {}", debit),
        });
    }

    let id = cashform_utils::generate_guid();
    let txn = Transaction::new(
        id.clone(),
        new.date,
        new.enter_date,
        new.description.trim(),
        new.currency,
        vec![
            Split {
                account: credit,
                value: new.amount,
            },
            Split {
                account: debit,
                value: -new.amount,
            },
        ],
    );

    ledger.book_mut().add_transaction(txn)?;
    ledger.commit().await?;
    log::info!("Added transaction {} for {}", id, new.amount);
    Ok(id)
}

/// Resolve a name case-insensitively to an account that may take splits
fn postable_account(ledger: &Ledger, name: &str) -> CoreResult<String> {
    let account = ledger
        .book()
        .find_account(name)
        .ok_or_else(|| CoreError::AccountNotFound {
            name: name.trim().to_string(),
        })?;
    if account.placeholder {
        return Err(CoreError::ValidationError {
            message: format!("{} is a placeholder account", account.fullname),
        });
    }
    Ok(account.fullname.clone())
}

/// Delete the transaction a summary token points at and save the book
pub async fn delete_transaction(ledger: &mut Ledger, token: &str) -> CoreResult<Transaction> {
    let id = extract_id(token)?;
    let removed = ledger.book_mut().remove_transaction(id)?;
    ledger.commit().await?;
    log::info!("Deleted transaction {} ({})", removed.id, removed.description);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageRef};
    use crate::summary::summarize;
    use std::sync::Arc;

    const BOOK: &str = r#"2020-01-01 open Assets
2020-01-01 open Assets:Checking
2020-01-01 open Expenses
  placeholder: "TRUE"
2020-01-01 open Expenses:Food
2020-01-01 open Expenses:Rent

2024-01-01 * "Groceries"
  guid: "t1"
  entered: "2024-01-01 09:00:00"
  Expenses:Food  20.00 USD
  Assets:Checking  -20.00 USD

2024-01-03 * "Rent"
  guid: "t2"
  entered: "2024-01-03 09:00:00"
  Assets:Checking  -900.00 USD
  Expenses:Rent  900.00 USD

2024-01-02 * "Split dinner"
  guid: "t3"
  entered: "2024-01-02 09:00:00"
  Expenses:Food  30.00 USD
  Expenses:Rent  10.00 USD
  Assets:Checking  -40.00 USD

2024-01-04 * "Snacks"
  guid: "t4"
  entered: "2024-01-04 09:00:00"
  Expenses:Food  5.00 USD
  Assets:Checking  -5.00 USD

2024-01-05 * "Lunch"
  guid: "t5"
  entered: "2024-01-05 09:00:00"
  Expenses:Food  12.50 USD
  Assets:Checking  -12.50 USD
"#;

    async fn ledger(storage: &Arc<MemoryStorage>) -> Ledger {
        let storage: StorageRef = storage.clone();
        Ledger::open(storage).await.unwrap()
    }

    fn new_transaction(debit: &str, credit: &str, amount: Decimal) -> NewTransaction {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        NewTransaction {
            description: "Coffee".to_string(),
            amount,
            debit: debit.to_string(),
            credit: credit.to_string(),
            currency: "USD".to_string(),
            date,
            enter_date: date.and_hms_opt(8, 15, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_listing_skips_multi_split_and_sorts_newest_first() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let ledger = ledger(&storage).await;
        let views = last_n_transactions(ledger.book(), 0);
        let ids: Vec<&str> = views.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["t5", "t4", "t2", "t1"]);

        let rent = &views[2];
        assert_eq!(rent.source, "Assets:Checking");
        assert_eq!(rent.dest, "Expenses:Rent");
        assert_eq!(rent.amount, Decimal::new(90000, 2));
    }

    #[tokio::test]
    async fn test_listing_limit_takes_last_in_book_order() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let ledger = ledger(&storage).await;
        let ids: Vec<String> = last_n_transactions(ledger.book(), 3).into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec!["t5", "t4"]);
    }

    #[tokio::test]
    async fn test_add_transaction_writes_balanced_splits() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = ledger(&storage).await;
        let id = add_transaction(
            &mut ledger,
            new_transaction("assets:checking", "Expenses:Food", Decimal::new(420, 2)),
        )
        .await
        .unwrap();
        assert_eq!(id.len(), 32);
        assert_eq!(storage.save_count(), 1);

        let reopened = self::ledger(&storage).await;
        let txn = reopened.book().transaction(&id).unwrap();
        assert_eq!(txn.splits[0].account, "Expenses:Food");
        assert_eq!(txn.splits[0].value, Decimal::new(420, 2));
        assert_eq!(txn.splits[1].account, "Assets:Checking");
        assert_eq!(txn.splits[1].value, Decimal::new(-420, 2));

        let view = TransactionView::from_transaction(txn).unwrap();
        assert_eq!(view.source, "Assets:Checking");
        assert_eq!(view.dest, "Expenses:Food");
    }

    #[tokio::test]
    async fn test_add_transaction_rejects_bad_input() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = ledger(&storage).await;

        let err = add_transaction(&mut ledger, new_transaction("Assets:Savings", "Expenses:Food", Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound { ref name } if name == "Assets:Savings"));

        let err = add_transaction(&mut ledger, new_transaction("Assets:Checking", "Expenses", Decimal::ONE))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));

        let err = add_transaction(&mut ledger, new_transaction("Assets:Checking", "Expenses:Food", Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));

        assert_eq!(storage.save_count(), 0);
        assert_eq!(ledger.book().transactions().len(), 5);
    }

    #[tokio::test]
    async fn test_delete_by_summary_token() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = ledger(&storage).await;
        let views = last_n_transactions(ledger.book(), 0);
        let token = summarize(&views[0], "$");

        let removed = delete_transaction(&mut ledger, &token).await.unwrap();
        assert_eq!(removed.id, "t5");
        assert!(ledger.book().transaction("t5").is_none());
        assert_eq!(storage.save_count(), 1);

        let err = delete_transaction(&mut ledger, &token).await.unwrap_err();
        assert!(matches!(err, CoreError::TransactionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_transactions_for_account() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let ledger = ledger(&storage).await;
        let views = last_n_transactions(ledger.book(), 0);
        assert_eq!(transactions_for_account(&views, "Expenses:Rent").len(), 1);
        assert_eq!(transactions_for_account(&views, "Assets:Checking").len(), 4);
        assert!(transactions_for_account(&views, "Assets").is_empty());
    }
}
