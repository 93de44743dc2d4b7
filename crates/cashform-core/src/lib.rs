//! Core ledger processing and business logic
//!
//! Every request opens its own [`Ledger`] from a [`BookStorage`], mutates the
//! in-memory [`Book`], and persists with [`Ledger::flush`] + [`Ledger::save`].
//! Handles are never shared between requests and no lock is taken: two
//! requests mutating the same file concurrently can race, and the last save
//! wins.

pub mod error;
pub mod models;
pub mod book;
pub mod storage;
pub mod hierarchy;
pub mod inheritance;
pub mod summary;
pub mod transactions;
pub mod accounts;
pub mod sync;

pub use accounts::{account_balances, add_account, delete_account, list_accounts, AccountBalance};
pub use book::{Book, PassthroughPostingRef, SplitRef};
pub use error::{CoreError, CoreResult, DefaultErrorLogger, ErrorCode, ErrorContext, ErrorLogger, ErrorSeverity};
pub use hierarchy::find_inheriting_ancestor;
pub use inheritance::{delete_account_with_inheritance, InheritanceReport};
pub use models::{short_name, Account, Split, Transaction};
pub use storage::{BeancountStorage, BookStorage, MemoryStorage, StorageRef};
pub use summary::{extract_id, summarize, SummaryField, FIELD_DELIMITER};
pub use sync::{SyncRef, SyncTarget};
pub use transactions::{
    add_transaction, delete_transaction, last_n_transactions, transactions_for_account, NewTransaction,
    TransactionView,
};

/// Open handle on a book for the duration of one request
pub struct Ledger {
    storage: StorageRef,
    book: Book,
    unsaved: bool,
}

impl Ledger {
    /// Load the book from storage
    pub async fn open(storage: StorageRef) -> CoreResult<Self> {
        log::debug!("Opening ledger at {}", storage.describe());
        let book = storage.load().await?;
        Ok(Self {
            storage,
            book,
            unsaved: false,
        })
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Mutable access. The handle counts as modified until the next save.
    pub fn book_mut(&mut self) -> &mut Book {
        self.unsaved = true;
        &mut self.book
    }

    /// Check the pending changes are consistent before they are written
    pub fn flush(&self) -> CoreResult<()> {
        self.book.check_integrity()
    }

    /// Write the book back to storage
    pub async fn save(&mut self) -> CoreResult<()> {
        self.storage.save(&self.book).await?;
        self.unsaved = false;
        Ok(())
    }

    /// Flush then save
    pub async fn commit(&mut self) -> CoreResult<()> {
        self.flush()?;
        self.save().await
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Release the handle. Unsaved changes are dropped.
    pub fn close(self) {
        if self.unsaved {
            log::warn!(
                "Closing ledger at {} with unsaved changes, they are discarded",
                self.storage.describe()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ledger_commit_persists() {
        let storage = Arc::new(MemoryStorage::new("2020-01-01 open Assets\n2020-01-01 open Assets:Old\n"));
        let mut ledger = Ledger::open(storage.clone()).await.unwrap();
        ledger.book_mut().remove_account("Assets:Old").unwrap();
        assert!(ledger.has_unsaved_changes());
        ledger.commit().await.unwrap();
        assert!(!ledger.has_unsaved_changes());
        ledger.close();

        let reopened = Ledger::open(storage.clone()).await.unwrap();
        assert!(reopened.book().account("Assets:Old").is_none());
        assert_eq!(storage.save_count(), 1);
    }

    #[tokio::test]
    async fn test_ledger_close_discards() {
        let storage = Arc::new(MemoryStorage::new("2020-01-01 open Assets\n2020-01-01 open Assets:Old\n"));
        let mut ledger = Ledger::open(storage.clone()).await.unwrap();
        ledger.book_mut().remove_account("Assets:Old").unwrap();
        ledger.close();

        let reopened = Ledger::open(storage).await.unwrap();
        assert!(reopened.book().account("Assets:Old").is_some());
    }
}
