//! Resolves which ancestor absorbs a deleted account's splits

use crate::book::Book;
use crate::error::{CoreError, CoreResult};
use crate::models::{Account, ACCOUNT_SEPARATOR};

/// Find the account that inherits the splits of `fullname` when it is deleted.
///
/// Prefixes are tested from the root-most segment downwards and the first
/// non-placeholder one wins. This picks the most general ancestor, not the
/// closest: deleting `Assets:Checking:Budget:Subscriptions` with `Assets` and
/// `Assets:Checking` both real accounts resolves to `Assets`. Only proper
/// prefixes are candidates, so a root account has no ancestor.
///
/// A prefix with no account behind it means the hierarchy is broken and is
/// reported as [`CoreError::AccountNotFound`].
pub fn find_inheriting_ancestor<'a>(book: &'a Book, fullname: &str) -> CoreResult<&'a Account> {
    let segments: Vec<&str> = fullname.split(ACCOUNT_SEPARATOR).collect();
    let separator = ACCOUNT_SEPARATOR.to_string();

    for depth in 1..segments.len() {
        let prefix = segments[..depth].join(separator.as_str());
        let Some(candidate) = book.account(&prefix) else {
            log::error!("Ancestor {} of {} does not exist, hierarchy is malformed", prefix, fullname);
            return Err(CoreError::AccountNotFound { name: prefix });
        };
        if !candidate.placeholder {
            log::debug!("{} inherits the splits of {}", candidate.fullname, fullname);
            return Ok(candidate);
        }
    }

    Err(CoreError::NoInheritingAncestor {
        account: fullname.to_string(),
    })
}
