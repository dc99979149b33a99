//! Line-per-id ledger file in the workdir.
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tokio::task;

use crate::ids::TxId;
use crate::store::Ledger;

/// File name of the ledger inside the workdir.
pub const LEDGER_FILE: &str = ".mnp.txid";

/// Plain text file, one transaction id per line:
///
/// ```text
/// 0f3c...e1
/// 77ab...90
/// ```
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    /// Ledger at `path` (created lazily on first use).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger at its usual place in `workdir`.
    pub fn in_workdir(workdir: &Path) -> Self {
        Self::new(workdir.join(LEDGER_FILE))
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> std::io::Result<File> {
        OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
    }

    fn scan(path: &Path, id: &str) -> anyhow::Result<bool> {
        let file = match Self::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ledger unavailable, treating id as unseen");
                return Ok(false);
            }
        };
        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("read ledger {}", path.display()))?;
            if line.trim_end().eq_ignore_ascii_case(id) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // Same rule as `scan`: an unopenable ledger is skipped, a broken one is fatal.
    fn append(path: &Path, id: &str) -> anyhow::Result<()> {
        let mut file = match Self::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, id, "ledger unavailable, id not recorded");
                return Ok(());
            }
        };
        writeln!(file, "{id}").with_context(|| format!("append to ledger {}", path.display()))?;
        file.flush()?;
        Ok(())
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn has_seen(&self, id: &TxId) -> anyhow::Result<bool> {
        let path = self.path.clone();
        let id = id.as_str().to_owned();
        task::spawn_blocking(move || Self::scan(&path, &id)).await?
    }

    async fn record(&self, id: &TxId) -> anyhow::Result<()> {
        let path = self.path.clone();
        let id = id.as_str().to_owned();
        task::spawn_blocking(move || Self::append(&path, &id)).await?
    }
}
