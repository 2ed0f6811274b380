use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::authz::errors::AuthzError;
use crate::authz::loader::load_policies;
use crate::authz::PolicyTable;

/// Where a store reloads its policies from.
#[derive(Debug, Clone)]
struct PolicySource {
    path: PathBuf,
    strict: bool,
}

/// Holder of the current `PolicyTable`.
///
/// Readers take an `Arc` snapshot and evaluate against it without holding any
/// lock. Publishing a table replaces the whole `Arc` in one step, so an
/// in-flight evaluation sees either the old table or the new one.
#[derive(Debug)]
pub struct PolicyStore {
    current: RwLock<Arc<PolicyTable>>,
    source: Option<PolicySource>,
}

impl PolicyStore {
    /// Wrap an already-built table. Such a store cannot `reload`.
    pub fn new(table: PolicyTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
            source: None,
        }
    }

    /// Load policies from `path` and remember it for later reloads.
    pub fn open(path: &Path, strict: bool) -> Result<Self, AuthzError> {
        let table = load_policies(path, strict)?;
        Ok(Self {
            current: RwLock::new(Arc::new(table)),
            source: Some(PolicySource {
                path: path.to_path_buf(),
                strict,
            }),
        })
    }

    pub fn snapshot(&self) -> Arc<PolicyTable> {
        // The guarded value is only ever replaced whole, so a poisoned lock
        // still holds a complete table.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish `table` and return the one it replaced.
    pub fn replace(&self, table: PolicyTable) -> Arc<PolicyTable> {
        self.swap(Arc::new(table))
    }

    /// Rebuild the table from the original source and swap it in.
    /// On failure the current table stays in place.
    pub fn reload(&self) -> Result<Arc<PolicyTable>, AuthzError> {
        let source = self.source.as_ref().ok_or(AuthzError::ReloadUnavailable)?;
        let table = match load_policies(&source.path, source.strict) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(
                    path = %source.path.display(),
                    error = %e,
                    "Policy reload failed; keeping current policies"
                );
                return Err(e);
            }
        };
        // Report the table this call published, even if another swap follows
        let published = Arc::new(table);
        self.swap(Arc::clone(&published));
        tracing::info!(path = %source.path.display(), "Reloaded authorization policies");
        Ok(published)
    }

    fn swap(&self, next: Arc<PolicyTable>) -> Arc<PolicyTable> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}
