//! Account deletion that hands the account's splits to an ancestor first

use rust_decimal::Decimal;
use serde::Serialize;

use crate::accounts::delete_account;
use crate::book::{PassthroughPostingRef, SplitRef};
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::hierarchy::find_inheriting_ancestor;
use crate::Ledger;

/// Outcome of a successful deletion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InheritanceReport {
    pub deleted: String,
    pub ancestor: String,
    pub reassigned_splits: usize,
    /// Sum of the reassigned split values, added to the ancestor's own balance
    pub reassigned_total: Decimal,
    /// Postings moved inside multi-currency transactions the book keeps as-is.
    /// They are not part of `reassigned_total`.
    pub reassigned_passthrough: usize,
}

impl InheritanceReport {
    fn moved(&self) -> usize {
        self.reassigned_splits + self.reassigned_passthrough
    }
}

/// Delete `name` (matched case-insensitively) after moving every split that
/// posts to it onto its inheriting ancestor.
///
/// Each reassignment is flushed and saved on its own before the next one, and
/// the account is removed and saved last. A failure part-way leaves the splits
/// already moved in place; nothing is rolled back.
///
/// Postings of pass-through transactions move along with the regular splits.
/// An account still named by a block the book cannot edit is refused before
/// anything moves.
pub async fn delete_account_with_inheritance(ledger: &mut Ledger, name: &str) -> CoreResult<InheritanceReport> {
    let target = ledger
        .book()
        .find_account(name)
        .ok_or_else(|| CoreError::AccountNotFound {
            name: name.to_string(),
        })?
        .fullname
        .clone();
    let ancestor = find_inheriting_ancestor(ledger.book(), &target)?.fullname.clone();

    let children = ledger.book().children(&target).count();
    if children > 0 {
        return Err(CoreError::ReferentialConstraint {
            entity: target,
            reason: format!("it still has {} child account(s), delete those first", children),
        });
    }
    let raw = ledger.book().raw_references(&target);
    if raw > 0 {
        return Err(CoreError::ReferentialConstraint {
            entity: target,
            reason: format!("{} entry(ies) the app does not edit still name it, change those by hand first", raw),
        });
    }

    let mut transaction_ids: Vec<String> = Vec::new();
    for split in ledger.book().splits_for_account(&target) {
        if !transaction_ids.contains(&split.transaction_id) {
            transaction_ids.push(split.transaction_id);
        }
    }
    log::info!(
        "Deleting {}: {} transaction(s) move to {}",
        target,
        transaction_ids.len(),
        ancestor
    );

    let mut report = InheritanceReport {
        deleted: target.clone(),
        ancestor: ancestor.clone(),
        reassigned_splits: 0,
        reassigned_total: Decimal::ZERO,
        reassigned_passthrough: 0,
    };

    for transaction_id in transaction_ids {
        let indices: Vec<usize> = ledger
            .book()
            .transaction(&transaction_id)
            .ok_or_else(|| CoreError::TransactionNotFound {
                id: transaction_id.clone(),
            })?
            .splits
            .iter()
            .enumerate()
            .filter(|(_, s)| s.account == target)
            .map(|(i, _)| i)
            .collect();

        for index in indices {
            let split = SplitRef {
                transaction_id: transaction_id.clone(),
                index,
            };
            match reassign_and_persist(ledger, &split, &ancestor).await {
                Ok(value) => {
                    report.reassigned_splits += 1;
                    report.reassigned_total += value;
                }
                Err(err) => {
                    warn_partial(&report, &err);
                    return Err(err);
                }
            }
        }
    }

    for posting in ledger.book().passthrough_postings(&target) {
        match reassign_passthrough_and_persist(ledger, &posting, &ancestor).await {
            Ok(()) => report.reassigned_passthrough += 1,
            Err(err) => {
                warn_partial(&report, &err);
                return Err(err);
            }
        }
    }

    if let Err(err) = delete_account(ledger, &target).await {
        warn_partial(&report, &err);
        return Err(err);
    }

    log::info!(
        "Deleted {}: {} split(s) totalling {} now post to {}",
        report.deleted,
        report.reassigned_splits,
        report.reassigned_total,
        report.ancestor
    );
    Ok(report)
}

async fn reassign_and_persist(ledger: &mut Ledger, split: &SplitRef, ancestor: &str) -> CoreResult<Decimal> {
    let value = ledger.book_mut().reassign_split(split, ancestor)?;
    ledger.commit().await?;
    Ok(value)
}

async fn reassign_passthrough_and_persist(
    ledger: &mut Ledger,
    posting: &PassthroughPostingRef,
    ancestor: &str,
) -> CoreResult<()> {
    ledger.book_mut().reassign_passthrough_posting(posting, ancestor)?;
    ledger.commit().await
}

fn warn_partial(report: &InheritanceReport, err: &CoreError) {
    if report.moved() == 0 {
        return;
    }
    let context = ErrorContext::new("delete_account_with_inheritance")
        .with_data("account", serde_json::json!(report.deleted))
        .with_data("ancestor", serde_json::json!(report.ancestor))
        .with_data("moved", serde_json::json!(report.moved()));
    DefaultErrorLogger.log_warning(
        &format!(
            "{} split(s) already moved from {} to {} stay there after: {}",
            report.moved(), report.deleted, report.ancestor, err
        ),
        &context,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, StorageRef};
    use std::sync::Arc;

    const BOOK: &str = r#"2020-01-01 open Assets
2020-01-01 open Assets:Checking
2020-01-01 open Assets:Checking:Budget
  placeholder: "TRUE"
2020-01-01 open Assets:Checking:Budget:Subscriptions
  placeholder: "TRUE"
2020-01-01 open Assets:Checking:Budget:Subscriptions:2600
2020-01-01 open Expenses
  placeholder: "TRUE"
2020-01-01 open Expenses:Streaming
2020-01-01 open Equity
2020-01-01 open Equity:Opening

2024-01-01 * "Seed"
  guid: "t1"
  Assets:Checking:Budget:Subscriptions:2600  100.00 USD
  Equity:Opening  -100.00 USD

2024-01-02 * "Seed checking"
  guid: "t2"
  Assets:Checking  50.00 USD
  Equity:Opening  -50.00 USD

2024-02-01 * "Netflix"
  guid: "t3"
  Expenses:Streaming  15.49 USD
  Assets:Checking:Budget:Subscriptions:2600  -15.49 USD
"#;

    const TARGET: &str = "Assets:Checking:Budget:Subscriptions:2600";

    async fn open(storage: &Arc<MemoryStorage>) -> Ledger {
        let storage: StorageRef = storage.clone();
        Ledger::open(storage).await.unwrap()
    }

    #[tokio::test]
    async fn test_moves_splits_to_most_general_ancestor() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = open(&storage).await;
        let before_assets = ledger.book().balance("Assets", false);
        let before_target = ledger.book().balance(TARGET, false);
        let before_checking = ledger.book().balance("Assets:Checking", false);

        let report = delete_account_with_inheritance(&mut ledger, TARGET).await.unwrap();
        assert_eq!(report.ancestor, "Assets");
        assert_eq!(report.reassigned_splits, 2);
        assert_eq!(report.reassigned_total, before_target);
        // two reassignments plus the removal
        assert_eq!(storage.save_count(), 3);

        let reopened = open(&storage).await;
        let book = reopened.book();
        assert!(book.account(TARGET).is_none());
        assert!(book.splits_for_account(TARGET).is_empty());
        assert_eq!(book.balance("Assets", false), before_assets + before_target);
        assert_eq!(book.balance("Assets:Checking", false), before_checking);
        assert_eq!(book.balance("Assets", true), Decimal::new(13451, 2));
    }

    #[tokio::test]
    async fn test_account_without_splits() {
        let text = format!("{}2020-01-01 open Assets:Unused\n", BOOK);
        let storage = Arc::new(MemoryStorage::new(text));
        let mut ledger = open(&storage).await;
        let report = delete_account_with_inheritance(&mut ledger, "Assets:Unused").await.unwrap();
        assert_eq!(report.reassigned_splits, 0);
        assert!(report.reassigned_total.is_zero());
        assert_eq!(storage.save_count(), 1);
        assert!(ledger.book().account("Assets:Unused").is_none());
    }

    #[tokio::test]
    async fn test_name_is_matched_case_insensitively() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = open(&storage).await;
        let report = delete_account_with_inheritance(&mut ledger, "equity:opening").await.unwrap();
        assert_eq!(report.deleted, "Equity:Opening");
        assert_eq!(report.ancestor, "Equity");
        assert_eq!(report.reassigned_splits, 2);
        assert_eq!(ledger.book().balance("Equity", false), Decimal::new(-15000, 2));
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = open(&storage).await;
        let err = delete_account_with_inheritance(&mut ledger, "Assets:Savings").await.unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound { .. }));
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test]
    async fn test_no_ancestor_leaves_book_untouched() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = open(&storage).await;
        let err = delete_account_with_inheritance(&mut ledger, "Expenses:Streaming").await.unwrap_err();
        assert!(matches!(err, CoreError::NoInheritingAncestor { .. }));
        assert_eq!(storage.save_count(), 0);
        assert!(ledger.book().account("Expenses:Streaming").is_some());
    }

    #[tokio::test]
    async fn test_account_with_children_is_refused_up_front() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = open(&storage).await;
        let err = delete_account_with_inheritance(&mut ledger, "Assets:Checking").await.unwrap_err();
        assert!(matches!(err, CoreError::ReferentialConstraint { .. }));
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_moved_splits() {
        let storage = Arc::new(MemoryStorage::failing_after(BOOK, 1));
        let mut ledger = open(&storage).await;
        let err = delete_account_with_inheritance(&mut ledger, TARGET).await.unwrap_err();
        assert!(matches!(err, CoreError::IoError { .. }));
        ledger.close();

        let reopened = open(&storage).await;
        let book = reopened.book();
        assert!(book.account(TARGET).is_some());
        assert_eq!(book.splits_for_account(TARGET).len(), 1);
        assert_eq!(book.balance("Assets", false), Decimal::new(10000, 2));
    }

    #[tokio::test]
    async fn test_priced_posting_blocks_deletion() {
        let text = r#"2020-01-01 open Assets
2020-01-01 open Assets:Travel
2020-01-01 open Equity
2020-01-01 open Equity:Opening

2024-03-01 * "Hotel"
  Assets:Travel  10.00 EUR @ 1.10 USD
  Equity:Opening  -11.00 USD
"#;
        let storage = Arc::new(MemoryStorage::new(text));
        let mut ledger = open(&storage).await;
        let err = delete_account_with_inheritance(&mut ledger, "Assets:Travel").await.unwrap_err();
        assert!(matches!(err, CoreError::ReferentialConstraint { .. }));
        assert_eq!(storage.save_count(), 0);
        assert!(ledger.book().account("Assets:Travel").is_some());
        assert!(storage.contents().await.contains("Assets:Travel  10.00 EUR @ 1.10 USD"));
    }

    #[tokio::test]
    async fn test_multi_currency_postings_move_to_ancestor() {
        let text = r#"2020-01-01 open Assets
2020-01-01 open Assets:Cash
2020-01-01 open Assets:Cash:Euro

2024-03-01 * "Exchange"
  Assets:Cash  -11.00 USD
  Assets:Cash:Euro  10.00 EUR
"#;
        let storage = Arc::new(MemoryStorage::new(text));
        let mut ledger = open(&storage).await;
        let report = delete_account_with_inheritance(&mut ledger, "Assets:Cash:Euro").await.unwrap();
        assert_eq!(report.ancestor, "Assets");
        assert_eq!(report.reassigned_splits, 0);
        assert_eq!(report.reassigned_passthrough, 1);
        assert_eq!(storage.save_count(), 2);

        let reopened = open(&storage).await;
        assert!(reopened.book().account("Assets:Cash:Euro").is_none());
        assert!(reopened.book().passthrough_postings("Assets:Cash:Euro").is_empty());
        assert_eq!(reopened.book().passthrough_postings("Assets").len(), 1);
        assert!(!storage.contents().await.contains("Assets:Cash:Euro"));
    }
}
