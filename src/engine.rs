//! Watch state machine for one transaction:
//! 1) consult the ledger,
//! 2) poll the wallet until the requested milestone is reached,
//! 3) deliver the amount on the transfer's pipe.
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::alerts::Alerts;
use crate::channel::{Channel, Ensured, Registry};
use crate::delivery::{deliver_async, deliver_sync};
use crate::error::ValidationError;
use crate::ids::TxId;
use crate::store::Ledger;
use crate::wallet::{MonitoredTransaction, WalletRpc};

/// Poll interval when `MNP_POLL_INTERVAL` is not set.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Milestone a caller wants to be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum NotifyLevel {
    /// Do not watch at all.
    None,
    /// As soon as the wallet sees the transaction.
    Txpool,
    /// Once it has the requested number of confirmations.
    #[default]
    Confirmed,
    /// Once its outputs are spendable.
    Unlocked,
}

impl NotifyLevel {
    /// Whether the latest reply satisfies this level.
    pub fn is_satisfied(self, threshold: u64, transfers: &[MonitoredTransaction]) -> bool {
        match self {
            Self::None => true,
            Self::Txpool => !transfers.is_empty(),
            Self::Confirmed => {
                !transfers.is_empty() && transfers.iter().all(|t| t.confirmations >= threshold)
            }
            Self::Unlocked => !transfers.is_empty() && transfers.iter().all(|t| !t.locked),
        }
    }
}

impl FromStr for NotifyLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(Self::None),
            "txpool" | "1" => Ok(Self::Txpool),
            "confirmed" | "2" => Ok(Self::Confirmed),
            "unlocked" | "3" => Ok(Self::Unlocked),
            _ => Err(ValidationError::NotifyLevel(s.to_owned())),
        }
    }
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Txpool => "txpool",
            Self::Confirmed => "confirmed",
            Self::Unlocked => "unlocked",
        })
    }
}

/// Knobs for one watch.
#[derive(Debug, Clone)]
pub struct WatchSettings {
    /// Milestone to wait for.
    pub level: NotifyLevel,
    /// Confirmations needed for [`NotifyLevel::Confirmed`].
    pub confirmations: u64,
    /// Wallet account the transfer belongs to.
    pub account: u32,
    /// Sleep between polls.
    pub poll_interval: Duration,
    /// Skip the ledger entirely (re-invocation after a failed run).
    pub skip_ledger: bool,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            level: NotifyLevel::Confirmed,
            confirmations: 1,
            account: 0,
            poll_interval: DEFAULT_POLL_INTERVAL,
            skip_ledger: false,
        }
    }
}

/// How a watch ended, short of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The ledger already had the id; nothing was done.
    Duplicate,
    /// Level `none`: nothing to watch.
    NotRequested,
    /// Amounts written.
    Delivered {
        /// Wallet fetches it took.
        polls: u32,
        /// Pipes written, one per delivery key.
        channels: Vec<PathBuf>,
    },
    /// Shutdown requested before delivery completed.
    Cancelled {
        /// Wallet fetches made so far.
        polls: u32,
    },
}

/// Core watcher. `W` = wallet, `L` = ledger.
pub struct Watcher<W, L> {
    wallet: W,
    ledger: L,
    registry: Registry,
    alerts: Alerts,
    settings: WatchSettings,
}

impl<W, L> Watcher<W, L>
where
    W: WalletRpc,
    L: Ledger,
{
    /// Create a watcher delivering under `registry`'s workdir.
    pub fn new(wallet: W, ledger: L, registry: Registry, settings: WatchSettings) -> Self {
        Self {
            wallet,
            ledger,
            alerts: Alerts::new(registry.clone()),
            registry,
            settings,
        }
    }

    /// Side channels used by this watcher; settle them before exiting.
    pub fn alerts(&self) -> &Alerts {
        &self.alerts
    }

    /// Watch `txid` until its milestone is reached and the amount is delivered.
    ///
    /// # Errors
    /// Returns an error if the ledger cannot be read or written, the wallet
    /// cannot be queried (after firing the RPC-connection alert), or a pipe
    /// cannot be created or written.
    pub async fn run(&self, txid: &TxId, cancel: &CancellationToken) -> anyhow::Result<WatchOutcome> {
        if !self.settings.skip_ledger {
            if self.ledger.has_seen(txid).await.context("ledger lookup")? {
                tracing::info!(%txid, "already processed, skipping");
                return Ok(WatchOutcome::Duplicate);
            }
            self.ledger.record(txid).await.context("ledger append")?;
        }

        let level = self.settings.level;
        if level == NotifyLevel::None {
            tracing::info!(%txid, "notification level is none");
            return Ok(WatchOutcome::NotRequested);
        }

        let mut polls = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Ok(WatchOutcome::Cancelled { polls });
            }

            let transfers = match self.wallet.transfers_by_txid(self.settings.account, txid).await {
                Ok(t) => t,
                Err(e) => {
                    self.alerts.rpc_connection_lost(txid);
                    return Err(e).with_context(|| format!("get_transfer_by_txid({txid})"));
                }
            };
            polls += 1;

            for t in transfers.iter().filter(|t| t.double_spend_seen) {
                self.alerts.double_spend(txid, t.delivery_key());
            }

            if level.is_satisfied(self.settings.confirmations, &transfers) {
                tracing::info!(%txid, %level, polls, "milestone reached");
                return self.deliver(txid, &transfers, polls, cancel).await;
            }

            tracing::debug!(
                %txid,
                %level,
                polls,
                confirmations = transfers.first().map(|t| t.confirmations),
                "not yet, sleeping"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled { polls }),
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    async fn deliver(
        &self,
        txid: &TxId,
        transfers: &[MonitoredTransaction],
        polls: u32,
        cancel: &CancellationToken,
    ) -> anyhow::Result<WatchOutcome> {
        let grouped = group_by_key(transfers);

        if let [(first, amount)] = grouped.as_slice() {
            let channel = self.prepare(txid, first)?;
            tokio::select! {
                _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled { polls }),
                r = deliver_sync(&channel, amount.to_string()) => r?,
            }
            return Ok(WatchOutcome::Delivered {
                polls,
                channels: vec![channel.path().to_owned()],
            });
        }

        let mut handles = Vec::with_capacity(grouped.len());
        for (transfer, amount) in &grouped {
            let channel = self.prepare(txid, transfer)?;
            handles.push(deliver_async(&channel, amount.to_string()));
        }
        let mut channels = Vec::with_capacity(handles.len());
        for handle in handles {
            channels.push(handle.path().to_owned());
            tokio::select! {
                _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled { polls }),
                r = handle.wait() => r?,
            }
        }
        Ok(WatchOutcome::Delivered { polls, channels })
    }

    fn prepare(&self, txid: &TxId, transfer: &MonitoredTransaction) -> anyhow::Result<Channel> {
        let channel = self.registry.for_transfer(transfer);
        match self.registry.ensure(&channel)? {
            Ensured::Created => {}
            Ensured::AlreadyExists => {
                tracing::info!(path = %channel.path().display(), "pipe already present, reusing")
            }
        }
        self.alerts.announce(txid, transfer.delivery_key());
        Ok(channel)
    }
}

/// One entry per delivery key, amounts summed, first-seen order kept.
///
/// Two writers on one single-use pipe would leave the second blocked on a
/// pipe that no longer exists.
fn group_by_key(transfers: &[MonitoredTransaction]) -> Vec<(&MonitoredTransaction, u64)> {
    let mut out: Vec<(&MonitoredTransaction, u64)> = Vec::with_capacity(transfers.len());
    for t in transfers {
        match out.iter_mut().find(|(seen, _)| seen.delivery_key() == t.delivery_key()) {
            Some((_, sum)) => *sum = sum.saturating_add(t.amount),
            None => out.push((t, t.amount)),
        }
    }
    out
}
