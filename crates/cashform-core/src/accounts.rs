//! Account listing, creation, deletion and balances

use rust_decimal::Decimal;
use serde::Serialize;

use crate::book::Book;
use crate::error::{CoreError, CoreResult};
use crate::models::{Account, ACCOUNT_SEPARATOR};
use crate::Ledger;

/// Account with its balance including descendants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountBalance {
    pub fullname: String,
    /// Natural sign: credit-normal accounts (liabilities, equity, income) are negated
    pub balance: Decimal,
    pub placeholder: bool,
}

/// Every account fullname, sorted
pub fn list_accounts(book: &Book) -> Vec<String> {
    let mut names: Vec<String> = book.accounts().iter().map(|a| a.fullname.clone()).collect();
    names.sort();
    names
}

pub fn account_balances(book: &Book) -> Vec<AccountBalance> {
    let mut balances: Vec<AccountBalance> = book
        .accounts()
        .iter()
        .map(|account| {
            let raw = book.balance(&account.fullname, true);
            AccountBalance {
                fullname: account.fullname.clone(),
                balance: if account.account_type.is_credit_normal() { -raw } else { raw },
                placeholder: account.placeholder,
            }
        })
        .collect();
    balances.sort_by(|a, b| a.fullname.cmp(&b.fullname));
    balances
}

fn validate_segment(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::ValidationError {
            message: "account name is empty".to_string(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || c == ACCOUNT_SEPARATOR || c == '"') {
        return Err(CoreError::ValidationError {
            message: format!(
                "account name {:?} must be a single segment without spaces, quotes or '{}'",
                name, ACCOUNT_SEPARATOR
            ),
        });
    }
    Ok(())
}

/// Create `parent:name`, inheriting the parent's type and currencies, and save.
/// Returns the new fullname.
pub async fn add_account(ledger: &mut Ledger, name: &str, parent: &str) -> CoreResult<String> {
    let name = name.trim();
    validate_segment(name)?;

    let parent = ledger
        .book()
        .account(parent.trim())
        .ok_or_else(|| CoreError::AccountNotFound {
            name: parent.trim().to_string(),
        })?
        .clone();

    let folded = name.to_lowercase();
    if let Some(existing) = ledger
        .book()
        .children(&parent.fullname)
        .find(|child| child.name().to_lowercase() == folded)
    {
        return Err(CoreError::DuplicateEntry {
            entry: existing.fullname.clone(),
        });
    }

    let account = Account {
        fullname: format!("{}{}{}", parent.fullname, ACCOUNT_SEPARATOR, name),
        account_type: parent.account_type,
        placeholder: false,
        currencies: parent.currencies.clone(),
        open_date: chrono::Utc::now().date_naive(),
        meta: Default::default(),
    };
    let fullname = account.fullname.clone();

    ledger.book_mut().add_account(account)?;
    ledger.commit().await?;
    log::info!("Added account {}", fullname);
    Ok(fullname)
}

/// Remove an account outright and save. The account must have no splits or children.
pub async fn delete_account(ledger: &mut Ledger, fullname: &str) -> CoreResult<Account> {
    let removed = ledger.book_mut().remove_account(fullname)?;
    ledger.commit().await?;
    log::info!("Deleted account {}", removed.fullname);
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use cashform_parser::AccountType;
    use std::sync::Arc;

    const BOOK: &str = r#"2020-01-01 open Assets
  placeholder: "TRUE"
2020-01-01 open Assets:Checking USD
2020-01-01 open Liabilities
2020-01-01 open Liabilities:Card USD
2020-01-01 open Expenses
2020-01-01 open Expenses:Food

2024-01-01 * "Paycheck deposit"
  guid: "t1"
  Assets:Checking  1000.00 USD
  Liabilities:Card  -1000.00 USD

2024-01-02 * "Groceries"
  guid: "t2"
  Expenses:Food  45.10 USD
  Liabilities:Card  -45.10 USD
"#;

    #[tokio::test]
    async fn test_balances_use_natural_sign() {
        let ledger = Ledger::open(Arc::new(MemoryStorage::new(BOOK))).await.unwrap();
        let balances = account_balances(ledger.book());
        let names: Vec<&str> = balances.iter().map(|b| b.fullname.as_str()).collect();
        assert_eq!(names, list_accounts(ledger.book()));

        let find = |name: &str| balances.iter().find(|b| b.fullname == name).unwrap();
        assert_eq!(find("Assets").balance, Decimal::new(100000, 2));
        assert!(find("Assets").placeholder);
        assert_eq!(find("Liabilities").balance, Decimal::new(104510, 2));
        assert_eq!(find("Liabilities:Card").balance, Decimal::new(104510, 2));
        assert_eq!(find("Expenses:Food").balance, Decimal::new(4510, 2));
    }

    #[tokio::test]
    async fn test_add_account_inherits_from_parent() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = Ledger::open(storage.clone()).await.unwrap();
        let fullname = add_account(&mut ledger, " Savings ", "Assets:Checking").await.unwrap();
        assert_eq!(fullname, "Assets:Checking:Savings");
        assert_eq!(storage.save_count(), 1);

        let reopened = Ledger::open(storage).await.unwrap();
        let account = reopened.book().account(&fullname).unwrap();
        assert_eq!(account.account_type, AccountType::Assets);
        assert_eq!(account.currencies, vec!["USD".to_string()]);
        assert!(!account.placeholder);
    }

    #[tokio::test]
    async fn test_add_account_rejections() {
        let storage = Arc::new(MemoryStorage::new(BOOK));
        let mut ledger = Ledger::open(storage.clone()).await.unwrap();

        let err = add_account(&mut ledger, "food", "Expenses").await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEntry { ref entry } if entry == "Expenses:Food"));

        for bad in ["", "Two Words", "Nested:Name", "Quo\"te"] {
            let err = add_account(&mut ledger, bad, "Expenses").await.unwrap_err();
            assert!(matches!(err, CoreError::ValidationError { .. }), "{:?}", bad);
        }

        let err = add_account(&mut ledger, "Dining", "expenses").await.unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound { .. }));
        assert_eq!(storage.save_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_account() {
        let text = format!("{}2020-01-01 open Expenses:Unused\n", BOOK);
        let storage = Arc::new(MemoryStorage::new(text));
        let mut ledger = Ledger::open(storage.clone()).await.unwrap();

        let removed = delete_account(&mut ledger, "Expenses:Unused").await.unwrap();
        assert_eq!(removed.fullname, "Expenses:Unused");

        let err = delete_account(&mut ledger, "Expenses:Food").await.unwrap_err();
        assert!(matches!(err, CoreError::ReferentialConstraint { .. }));
        assert_eq!(storage.save_count(), 1);
    }
}
