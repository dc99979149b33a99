//! Diff-publish loop run by `mnpd`: poll balance and height, rewrite their
//! files only when the value changed.
use std::fs::{self, Permissions};
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::channel::{Category, Registry};
use crate::wallet::WalletRpc;

/// A plain file holding the last published value.
#[derive(Debug)]
pub struct PublishedValue {
    path: PathBuf,
    mode: u32,
    last: Option<String>,
}

impl PublishedValue {
    /// Nothing published yet; the first [`update`](Self::update) always writes.
    pub fn new(path: impl Into<PathBuf>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            last: None,
        }
    }

    /// File being published to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value written last, if any.
    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Write `value` unless it equals the last one. Returns whether it wrote.
    pub fn update(&mut self, value: &str) -> io::Result<bool> {
        if self.last.as_deref() == Some(value) {
            return Ok(false);
        }
        fs::write(&self.path, format!("{value}\n"))?;
        fs::set_permissions(&self.path, Permissions::from_mode(self.mode))?;
        self.last = Some(value.to_owned());
        Ok(true)
    }
}

/// What one cycle wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// The balance file was rewritten.
    pub balance_written: bool,
    /// The height file was rewritten.
    pub height_written: bool,
}

/// Publishes balance and height of one wallet account.
pub struct DiffPublisher<W> {
    wallet: W,
    account: u32,
    balance: PublishedValue,
    height: PublishedValue,
}

impl<W: WalletRpc> DiffPublisher<W> {
    /// Publisher writing `balance` and `bc_height` under `registry`'s workdir.
    pub fn new(wallet: W, registry: &Registry, account: u32) -> Self {
        let mode = registry.pipe_mode();
        Self {
            wallet,
            account,
            balance: PublishedValue::new(registry.singleton(Category::Balance).path(), mode),
            height: PublishedValue::new(registry.singleton(Category::Height).path(), mode),
        }
    }

    /// Published balance state.
    pub fn balance(&self) -> &PublishedValue {
        &self.balance
    }

    /// Published height state.
    pub fn height(&self) -> &PublishedValue {
        &self.height
    }

    /// Fetch both values once and republish what changed.
    pub async fn publish_once(&mut self) -> anyhow::Result<CycleReport> {
        let balance = self.wallet.balance(self.account).await.context("get_balance")?;
        let height = self.wallet.height().await.context("get_height")?;

        let balance_written = self
            .balance
            .update(&balance.to_string())
            .with_context(|| format!("write {}", self.balance.path().display()))?;
        let height_written = self
            .height
            .update(&height.to_string())
            .with_context(|| format!("write {}", self.height.path().display()))?;

        if balance_written {
            tracing::info!(balance, "balance changed");
        }
        if height_written {
            tracing::debug!(height, "height changed");
        }
        Ok(CycleReport {
            balance_written,
            height_written,
        })
    }

    /// Cycle every `interval` until `cancel` fires. Returns the number of
    /// completed cycles.
    ///
    /// # Errors
    /// A failed wallet call or file write ends the loop.
    pub async fn run(&mut self, interval: Duration, cancel: &CancellationToken) -> anyhow::Result<u64> {
        let mut cycles = 0u64;
        while !cancel.is_cancelled() {
            self.publish_once().await?;
            cycles += 1;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::info!(cycles, "publisher stopped");
        Ok(cycles)
    }
}
