//! Persistence used by the watcher: the ledger of transaction ids already taken
//! on by an earlier invocation.
use async_trait::async_trait;

use crate::ids::TxId;

/// Append-only set of seen transaction ids.
///
/// `has_seen` followed by `record` is not atomic. Two invocations racing on
/// the same id may both proceed; the worst case is a duplicate delivery.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Whether `id` was recorded before.
    async fn has_seen(&self, id: &TxId) -> anyhow::Result<bool>;

    /// Record `id`. Call only after `has_seen` returned false.
    async fn record(&self, id: &TxId) -> anyhow::Result<()>;
}

// submodules / concrete ledgers live here
pub mod file_ledger;
pub use file_ledger::FileLedger;
