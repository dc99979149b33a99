//! Error taxonomy shared by the watcher, the daemon and the payment helper.
//!
//! Each enum matches one failure class: a wallet call that failed, input that
//! did not validate, a FIFO that could not be handled, a configuration that
//! could not be resolved. Binaries wrap these in `anyhow` with context.
use std::path::PathBuf;

/// Failure talking to the wallet collaborator.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("could not reach wallet at {endpoint}: {reason}")]
    Transport {
        /// `host:port` the call was aimed at.
        endpoint: String,
        /// Underlying transport error, rendered.
        reason: String,
    },

    /// The wallet answered with a JSON-RPC `error` object.
    #[error("wallet rejected {method}: {message} (code {code})")]
    Remote {
        /// Method that was called.
        method: &'static str,
        /// Error code reported by the wallet.
        code: i64,
        /// Error message reported by the wallet.
        message: String,
    },

    /// The reply did not carry the fields this crate reads.
    #[error("malformed reply to {method}: {detail}")]
    Malformed {
        /// Method that was called.
        method: &'static str,
        /// What was missing or mistyped.
        detail: String,
    },
}

impl RpcError {
    pub(crate) fn malformed(method: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            method,
            detail: detail.into(),
        }
    }
}

/// Input rejected before any wallet call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Not a 64-character hex transaction identifier.
    #[error("invalid txid {0:?}: expected 64 hex characters")]
    TxId(String),

    /// Not a 16-character hex payment identifier.
    #[error("invalid payment id {0:?}: expected 16 hex characters")]
    PaymentId(String),

    /// Amount is not a non-negative integer of atomic units.
    #[error("invalid amount {0:?}: expected atomic units (digits only)")]
    Amount(String),

    /// Unknown notification level.
    #[error("invalid notification level {0:?}: expected none, txpool, confirmed or unlocked (0-3)")]
    NotifyLevel(String),

    /// An option required by the selected action is missing.
    #[error("--{option} is required {context}")]
    MissingOption {
        /// Long option name.
        option: &'static str,
        /// When it is required.
        context: &'static str,
    },
}

/// Failure creating, opening, writing or removing a named pipe.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// `mkfifo` (or creating the category directory) failed.
    #[error("could not create named pipe {path}: {source}")]
    Create {
        /// Channel path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Something that is not a FIFO occupies the channel path.
    #[error("{path} exists and is not a named pipe")]
    NotAFifo {
        /// Channel path.
        path: PathBuf,
    },

    /// Opening the channel for writing failed.
    #[error("could not open named pipe {path}: {source}")]
    Open {
        /// Channel path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the payload failed.
    #[error("could not write to named pipe {path}: {source}")]
    Write {
        /// Channel path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// Removing the channel failed, or it was already gone after a write.
    #[error("could not remove named pipe {path}: {source}")]
    Destroy {
        /// Channel path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The delivery worker went away without reporting a result.
    #[error("delivery worker for {path} vanished")]
    WorkerLost {
        /// Channel path.
        path: PathBuf,
    },
}

impl ChannelError {
    /// Path of the channel the error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Create { path, .. }
            | Self::NotAFifo { path }
            | Self::Open { path, .. }
            | Self::Write { path, .. }
            | Self::Destroy { path, .. }
            | Self::WorkerLost { path } => path,
        }
    }
}

/// Configuration that cannot be loaded or resolved.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("can't load {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("can't parse {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: toml::de::Error,
    },

    /// No home directory to look for the default config file in.
    #[error("no home directory; pass --config")]
    NoHome,

    /// A permission string is not of the `rwxrwxrwx` form.
    #[error("invalid permission string for {field}: {value:?} (expected 9 characters like rw-r-----)")]
    Mode {
        /// Config key the string came from.
        field: &'static str,
        /// Offending value.
        value: String,
    },

    /// A required setting is absent from both the file and the command line.
    #[error("{0} is missing")]
    Missing(&'static str),
}
