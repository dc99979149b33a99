//! Best-effort side channels: double-spend and lost-RPC alerts, and the feed
//! announcing freshly created delivery pipes.
//!
//! Nothing here returns an error. A missing pipe (workdir never initialised)
//! is logged and skipped; a failing worker logs on its own.
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use crate::channel::{Category, Registry};
use crate::delivery::{self, DeliveryHandle, Settled};
use crate::ids::TxId;

/// Sender for the long-lived alert and feed pipes.
pub struct Alerts {
    registry: Registry,
    pending: Mutex<Vec<DeliveryHandle>>,
    double_spends: Mutex<HashSet<String>>,
}

impl Alerts {
    /// Alerts under `registry`'s workdir.
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            pending: Mutex::new(Vec::new()),
            double_spends: Mutex::new(HashSet::new()),
        }
    }

    /// Report a double spend of `txid` to `key`. Repeats for the same key are
    /// dropped; returns whether an alert went out.
    pub fn double_spend(&self, txid: &TxId, key: &str) -> bool {
        let first = lock(&self.double_spends).insert(key.to_owned());
        if !first {
            return false;
        }
        tracing::warn!(%txid, key, "double spend seen");
        self.send(Category::DoubleSpendAlert, format!("{txid} {key}"))
    }

    /// Report that the wallet could not be queried about `txid`.
    pub fn rpc_connection_lost(&self, txid: &TxId) -> bool {
        self.send(Category::RpcConnectionAlert, txid.to_string())
    }

    /// Announce that a delivery pipe keyed by `key` exists for `txid`.
    pub fn announce(&self, txid: &TxId, key: &str) -> bool {
        self.send(Category::TxidFeed, format!("{txid} {key}"))
    }

    /// Deliveries not yet settled.
    pub fn outstanding(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Wait up to `linger` for alerts and announcements still in flight.
    pub async fn settle(&self, linger: Duration) -> Settled {
        let handles = std::mem::take(&mut *lock(&self.pending));
        if handles.is_empty() {
            return Settled::default();
        }
        delivery::settle(handles, linger).await
    }

    fn send(&self, category: Category, payload: String) -> bool {
        let channel = self.registry.singleton(category);
        if !channel.path().exists() {
            tracing::warn!(path = %channel.path().display(), "pipe missing (run mnp --init), dropping message");
            return false;
        }
        let handle = delivery::deliver_async(&channel, payload);
        lock(&self.pending).push(handle);
        true
    }
}

// A poisoned lock only means a panicking thread held it; the data is still usable.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
