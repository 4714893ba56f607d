//! Import reentrancy guard
//!
//! At most one batch import runs per user. The permit is released when it
//! is dropped, so a failed or panicking import never leaves the user locked.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Tracks users with an import in flight
#[derive(Clone, Default)]
pub struct ImportGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl ImportGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the import slot for `user_id`
    ///
    /// Returns `None` while another import for the same user holds it.
    pub fn try_acquire(&self, user_id: &str) -> Option<ImportPermit> {
        let mut active = lock(&self.active);
        if !active.insert(user_id.to_string()) {
            debug!(user_id = %user_id, "Import already in progress");
            return None;
        }
        Some(ImportPermit {
            active: Arc::clone(&self.active),
            user_id: user_id.to_string(),
        })
    }
}

/// Held for the duration of one import
pub struct ImportPermit {
    active: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl Drop for ImportPermit {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.user_id);
    }
}

// The set stays consistent even if a holder panicked mid-insert
fn lock(active: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_for_same_user_is_refused() {
        let guard = ImportGuard::new();
        let permit = guard.try_acquire("alice");
        assert!(permit.is_some());
        assert!(guard.try_acquire("alice").is_none());
    }

    #[test]
    fn test_users_do_not_block_each_other() {
        let guard = ImportGuard::new();
        let _a = guard.try_acquire("alice").unwrap();
        assert!(guard.try_acquire("bob").is_some());
    }

    #[test]
    fn test_drop_releases_slot() {
        let guard = ImportGuard::new();
        {
            let _permit = guard.try_acquire("alice").unwrap();
            assert!(guard.try_acquire("alice").is_none());
        }
        assert!(guard.try_acquire("alice").is_some());
    }

    #[test]
    fn test_released_after_panic() {
        let guard = ImportGuard::new();
        let cloned = guard.clone();
        let result = std::panic::catch_unwind(move || {
            let _permit = cloned.try_acquire("alice").unwrap();
            panic!("import blew up");
        });
        assert!(result.is_err());
        assert!(guard.try_acquire("alice").is_some());
    }
}
