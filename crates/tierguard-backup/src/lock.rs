//! Per-directory serialization of shared state files
//!
//! The manifest, audit log and config metadata are single files shared by
//! every operation on a config directory. Each read-modify-write cycle holds
//! the lock for its scope. Scopes are always acquired in the order
//! `Operation`, `Metadata`, `Manifest`, `AuditLog`, and a task never
//! acquires a scope it already holds.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use once_cell::sync::Lazy;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Which shared resource of a directory a lock protects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockScope {
    /// A whole orchestrator operation (apply, rollback, safe boot, ...)
    Operation,
    /// `launcher_config_metadata.json`
    Metadata,
    /// `backup-manifest.json`
    Manifest,
    /// `audit-log.json`
    AuditLog,
}

type LockKey = (PathBuf, LockScope);

static REGISTRY: Lazy<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>> =
    Lazy::new(|| StdMutex::new(HashMap::new()));

/// Process-wide lock registry keyed by directory and scope
///
/// Entries nobody holds or waits on are dropped on the next acquire.
pub struct DirectoryLocks;

impl DirectoryLocks {
    /// Waits for exclusive access to `scope` of `dir`
    ///
    /// The directory is canonicalized when it exists so different spellings
    /// of one path share a lock.
    pub async fn acquire(dir: &Path, scope: LockScope) -> DirectoryGuard {
        let key = (canonical(dir).await, scope);

        let mutex = {
            let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
            // Holders and waiters keep their own clone of the mutex
            registry.retain(|_, mutex| Arc::strong_count(mutex) > 1);
            registry.entry(key.clone()).or_default().clone()
        };

        let guard = mutex.lock_owned().await;
        trace!(dir = %key.0.display(), scope = ?scope, "Directory lock acquired");

        DirectoryGuard {
            _guard: guard,
            scope,
        }
    }
}

/// Held lock; released on drop
pub struct DirectoryGuard {
    _guard: OwnedMutexGuard<()>,
    scope: LockScope,
}

impl DirectoryGuard {
    /// Scope this guard holds
    pub fn scope(&self) -> LockScope {
        self.scope
    }
}

async fn canonical(dir: &Path) -> PathBuf {
    if let Ok(path) = tokio::fs::canonicalize(dir).await {
        return path;
    }
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(dir))
        .unwrap_or_else(|_| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_scope_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let path = dir.path().to_path_buf();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = DirectoryLocks::acquire(&path, LockScope::Manifest).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_scopes_do_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let _manifest = DirectoryLocks::acquire(dir.path(), LockScope::Manifest).await;

        let audit = tokio::time::timeout(
            Duration::from_secs(1),
            DirectoryLocks::acquire(dir.path(), LockScope::AuditLog),
        )
        .await;

        assert!(audit.is_ok());
    }

    #[tokio::test]
    async fn test_path_spellings_share_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sub");
        tokio::fs::create_dir(&nested).await.unwrap();
        let dotted = nested.join("..").join("sub");

        let _held = DirectoryLocks::acquire(&nested, LockScope::Operation).await;
        let second = tokio::time::timeout(
            Duration::from_millis(50),
            DirectoryLocks::acquire(&dotted, LockScope::Operation),
        )
        .await;

        assert!(second.is_err());
    }

    fn is_registered(key: &LockKey) -> bool {
        REGISTRY
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    #[tokio::test]
    async fn test_released_locks_leave_the_registry() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let key = (canonical(first.path()).await, LockScope::AuditLog);

        let guard = DirectoryLocks::acquire(first.path(), LockScope::AuditLog).await;
        let _other = DirectoryLocks::acquire(second.path(), LockScope::AuditLog).await;
        assert!(is_registered(&key));

        drop(guard);
        let _again = DirectoryLocks::acquire(second.path(), LockScope::Manifest).await;
        assert!(!is_registered(&key));
    }
}
