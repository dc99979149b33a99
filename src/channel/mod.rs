//! Channel registry: where each named pipe lives, and its create/destroy
//! lifecycle.
//!
//! Paths are pure functions of category and key, so separate processes that
//! address the same logical notification agree on the path without talking to
//! each other. A channel's presence on disk is its whole state.
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use crate::error::ChannelError;
use crate::wallet::MonitoredTransaction;

pub mod fifo;

/// Directory of per-address transfer channels.
pub const TRANSFER_DIR: &str = "transfer";
/// Directory of per-payment-id channels.
pub const PAYMENT_DIR: &str = "payment";
/// Published balance file.
pub const BALANCE_FILE: &str = "balance";
/// Published chain height file.
pub const HEIGHT_FILE: &str = "bc_height";
/// Double-spend alert pipe.
pub const DOUBLE_SPEND_ALERT: &str = "double_spend_alert";
/// RPC connection alert pipe.
pub const RPC_CONNECTION_ALERT: &str = "rpc_connection_alert";
/// Announcement feed of `{txid} {key}` lines.
pub const TXID_FEED: &str = "txid";

/// What a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Amount for a transfer to an address.
    Transfer,
    /// Amount for a transfer carrying a payment id.
    Payment,
    /// Current balance (plain file, daemon).
    Balance,
    /// Current chain height (plain file, daemon).
    Height,
    /// Double-spend alerts.
    DoubleSpendAlert,
    /// Lost wallet connection alerts.
    RpcConnectionAlert,
    /// Announcements of freshly ensured transfer/payment channels.
    TxidFeed,
}

impl Category {
    /// Transfer and payment channels are consumed by a single write.
    pub fn is_single_use(self) -> bool {
        matches!(self, Self::Transfer | Self::Payment)
    }

    /// Path relative to the workdir. Keyed categories need a key.
    fn relative(self, key: Option<&str>) -> PathBuf {
        match (self, key) {
            (Self::Transfer, Some(k)) => Path::new(TRANSFER_DIR).join(k),
            (Self::Payment, Some(k)) => Path::new(PAYMENT_DIR).join(k),
            (Self::Transfer, None) => PathBuf::from(TRANSFER_DIR),
            (Self::Payment, None) => PathBuf::from(PAYMENT_DIR),
            (Self::Balance, _) => PathBuf::from(BALANCE_FILE),
            (Self::Height, _) => PathBuf::from(HEIGHT_FILE),
            (Self::DoubleSpendAlert, _) => PathBuf::from(DOUBLE_SPEND_ALERT),
            (Self::RpcConnectionAlert, _) => PathBuf::from(RPC_CONNECTION_ALERT),
            (Self::TxidFeed, _) => PathBuf::from(TXID_FEED),
        }
    }
}

/// A resolved channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    category: Category,
    path: PathBuf,
}

impl Channel {
    /// What it carries.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Where it lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the pipe, which is expected to be there. See
    /// [`Registry::discard`] for the idempotent form.
    pub fn destroy(&self) -> Result<(), ChannelError> {
        fs::remove_file(&self.path).map_err(|source| ChannelError::Destroy {
            path: self.path.clone(),
            source,
        })
    }
}

/// Result of [`Registry::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    /// The pipe was made by this call.
    Created,
    /// A pipe was already there (a replay, or another process got there first).
    AlreadyExists,
}

/// Names, creates and removes channels under one workdir.
#[derive(Debug, Clone)]
pub struct Registry {
    workdir: PathBuf,
    dir_mode: u32,
    pipe_mode: u32,
}

impl Registry {
    /// Registry rooted at `workdir`; directories get `dir_mode`, pipes and
    /// published files get `pipe_mode`.
    pub fn new(workdir: impl Into<PathBuf>, dir_mode: u32, pipe_mode: u32) -> Self {
        Self {
            workdir: workdir.into(),
            dir_mode,
            pipe_mode,
        }
    }

    /// Root of all channels.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Mode for pipes and published files.
    pub fn pipe_mode(&self) -> u32 {
        self.pipe_mode
    }

    /// Mode for directories.
    pub fn dir_mode(&self) -> u32 {
        self.dir_mode
    }

    /// One of the unkeyed, long-lived channels.
    pub fn singleton(&self, category: Category) -> Channel {
        debug_assert!(!category.is_single_use());
        Channel {
            category,
            path: self.workdir.join(category.relative(None)),
        }
    }

    /// Channel a transfer is delivered on: by payment id when it has one,
    /// by address otherwise.
    pub fn for_transfer(&self, transfer: &MonitoredTransaction) -> Channel {
        match transfer.payment_id() {
            Some(pid) => self.keyed(Category::Payment, pid),
            None => self.keyed(Category::Transfer, &transfer.address),
        }
    }

    /// Keyed channel of `category`.
    pub fn keyed(&self, category: Category, key: &str) -> Channel {
        Channel {
            category,
            path: self.workdir.join(category.relative(Some(key))),
        }
    }

    /// Make sure a FIFO exists for `channel`.
    pub fn ensure(&self, channel: &Channel) -> Result<Ensured, ChannelError> {
        let path = channel.path();
        match fs::symlink_metadata(path) {
            Ok(meta) if fifo::is_fifo(&meta) => {
                tracing::debug!(path = %path.display(), "named pipe already exists");
                return Ok(Ensured::AlreadyExists);
            }
            Ok(_) => return Err(ChannelError::NotAFifo { path: path.to_owned() }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(ChannelError::Create {
                    path: path.to_owned(),
                    source,
                })
            }
        }

        check_key(channel)?;
        if let Some(parent) = path.parent() {
            self.ensure_dir(parent).map_err(|source| ChannelError::Create {
                path: path.to_owned(),
                source,
            })?;
        }

        match fifo::mkfifo(path, self.pipe_mode) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "named pipe is up");
                Ok(Ensured::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Ensured::AlreadyExists),
            Err(source) => Err(ChannelError::Create {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// Remove `channel` if present. Returns whether something was removed.
    pub fn discard(&self, channel: &Channel) -> Result<bool, ChannelError> {
        match channel.destroy() {
            Ok(()) => Ok(true),
            Err(ChannelError::Destroy { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Create `dir` (and missing parents) with exactly the directory mode.
    /// Directories that already exist are left alone.
    pub fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        let missing: Vec<&Path> = dir.ancestors().take_while(|d| !d.is_dir()).collect();
        for d in missing.into_iter().rev() {
            match DirBuilder::new().mode(self.dir_mode).create(d) {
                Ok(()) => fs::set_permissions(d, fs::Permissions::from_mode(self.dir_mode))?,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && d.is_dir() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

// Keys come from wallet replies; they must stay a single path component.
fn check_key(channel: &Channel) -> Result<(), ChannelError> {
    if !channel.category.is_single_use() {
        return Ok(());
    }
    let key = channel.path.file_name().and_then(|k| k.to_str()).unwrap_or("");
    let parent_ok = channel
        .path
        .parent()
        .and_then(Path::file_name)
        .is_some_and(|d| d == TRANSFER_DIR || d == PAYMENT_DIR);
    if key.is_empty() || key == "." || key == ".." || !parent_ok {
        return Err(ChannelError::Create {
            path: channel.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "unusable channel key"),
        });
    }
    Ok(())
}
