#![deny(unsafe_code)]
#![deny(missing_docs)]
//! mnp: Monero named pipes. Watch a wallet for an incoming transaction and
//! hand the result to exactly one reader through a FIFO.
//!
//! ## What you implement
//! - [`WalletRpc`]: answer wallet JSON-RPC requests ([`HttpWallet`] talks to
//!   `monero-wallet-rpc`; tests plug in a scripted fake).
//! - [`Ledger`]: remember which transaction ids were already taken on
//!   ([`FileLedger`] keeps them in `{workdir}/.mnp.txid`).
//!
//! ## What the watcher does
//! - Skips ids the ledger has seen.
//! - Polls the wallet until the transfer reaches the requested milestone
//!   (pool, confirmations, unlock).
//! - Creates `transfer/{address}` or `payment/{payment_id}` as a named pipe,
//!   writes the amount once a reader attaches, then removes the pipe.
//! - Raises double-spend and lost-connection alerts on long-lived pipes
//!   without ever blocking on them.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use mnp::prelude::*;
//!
//! async fn run(wallet: HttpWallet, txid: TxId) -> anyhow::Result<()> {
//!     let registry = Registry::new("/var/lib/mnp", 0o750, 0o640);
//!     let ledger = FileLedger::in_workdir(registry.workdir());
//!     let watcher = Watcher::new(wallet, ledger, registry, WatchSettings::default());
//!
//!     let cancel = CancellationToken::new();
//!     let outcome = watcher.run(&txid, &cancel).await?;
//!     println!("{outcome:?}");
//!     watcher.alerts().settle(std::time::Duration::from_secs(5)).await;
//!     Ok(())
//! }
//! ```
/// Double-spend and lost-RPC alerts, and the txid announcement feed.
pub mod alerts;

/// Named pipe paths and their create/remove lifecycle.
pub mod channel;

/// Options shared by the command-line tools.
#[cfg(feature = "cli")]
pub mod cli;

/// `~/.mnp.toml`, command-line overrides and the poll interval variable.
pub mod config;

/// One-shot writes to named pipes on detached worker threads.
pub mod delivery;

/// Watcher that polls the wallet until a transfer reaches its milestone.
pub mod engine;

/// Error types.
pub mod error;

/// Transaction ids, payment ids and amounts.
pub mod ids;

/// Tracing subscribers for the tools and the daemon.
pub mod logging;

/// Symbolic permission strings (`rwxr-x---`).
pub mod mode;

/// Subaddresses, integrated addresses and payment URIs.
pub mod payment;

/// Spend and transaction proof checks.
pub mod proof;

/// Balance and chain height files, rewritten when they change.
pub mod publish;

/// Signal handling that cancels a shared token.
#[cfg(feature = "runtime")]
pub mod shutdown;

/// Wallet RPC: the collaborator trait, requests, replies and the HTTP client.
pub mod wallet;

/// Creating and removing the working directory.
pub mod workdir;

/// Ledger of processed transaction ids (trait and file implementation).
pub mod store;

// Public re-exports
pub use alerts::Alerts;
pub use channel::{Category, Channel, Ensured, Registry};
pub use delivery::{deliver_async, deliver_sync, DeliveryHandle};
pub use engine::{NotifyLevel, WatchOutcome, WatchSettings, Watcher};
pub use error::{ChannelError, ConfigError, RpcError, ValidationError};
pub use ids::{PaymentId, TxId};
pub use publish::{DiffPublisher, PublishedValue};
pub use store::{FileLedger, Ledger};
#[cfg(feature = "http")]
pub use wallet::http::{Endpoint, HttpWallet};
pub use wallet::{MonitoredTransaction, RpcRequest, WalletRpc};

/// Convenience prelude for end users.
pub mod prelude {
    pub use crate::{
        Alerts, Category, Channel, DiffPublisher, Ensured, FileLedger, Ledger, NotifyLevel, PaymentId,
        Registry, TxId, WalletRpc, WatchOutcome, WatchSettings, Watcher,
    };
    #[cfg(feature = "http")]
    pub use crate::{Endpoint, HttpWallet};
    pub use tokio_util::sync::CancellationToken;
}
