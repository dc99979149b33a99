//! Configuration: `~/.mnp.toml`, then command-line overrides.
//!
//! ```toml
//! [rpc]
//! user = "monero"
//! password = "secret"
//! host = "127.0.0.1"
//! port = 18082
//!
//! [mnp]
//! account = 0
//!
//! [cfg]
//! workdir = "/var/lib/mnp"
//! mode = "rwxr-x---"
//! pipe = "rw-r-----"
//! ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::channel::Registry;
use crate::engine::DEFAULT_POLL_INTERVAL;
use crate::error::ConfigError;
use crate::mode::parse_symbolic_mode;

/// File name of the per-user config in the home directory.
pub const CONFIG_FILE: &str = ".mnp.toml";

/// Environment variable overriding the poll interval, in seconds.
pub const POLL_INTERVAL_ENV: &str = "MNP_POLL_INTERVAL";

const DEFAULT_DIR_MODE: &str = "rwxr-x---";
const DEFAULT_PIPE_MODE: &str = "rw-r-----";
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LINGER_SECS: u64 = 5;

/// The config file as written on disk. Every key is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[rpc]`
    pub rpc: RpcSection,
    /// `[mnp]`
    pub mnp: MnpSection,
    /// `[cfg]`
    pub cfg: CfgSection,
}

/// Wallet connection.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcSection {
    /// RPC login user.
    pub user: Option<String>,
    /// RPC login password.
    pub password: Option<String>,
    /// Wallet host.
    pub host: Option<String>,
    /// Wallet port.
    pub port: Option<u16>,
    /// Per-request timeout.
    pub timeout_secs: Option<u64>,
}

/// Behaviour.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MnpSection {
    /// Log at info level.
    pub verbose: Option<bool>,
    /// Wallet account index.
    pub account: Option<u32>,
    /// Default confirmation threshold.
    pub confirmations: Option<u64>,
    /// How long to wait for alert readers before exiting.
    pub linger_secs: Option<u64>,
}

/// Filesystem layout.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CfgSection {
    /// Root of pipes and files.
    pub workdir: Option<PathBuf>,
    /// Directory permissions, `rwxr-x---` form.
    pub mode: Option<String>,
    /// Pipe and published file permissions, `rw-r-----` form.
    pub pipe: Option<String>,
}

impl FileConfig {
    /// Parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse `text`; `path` is only used in errors.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Load `explicit` if given (it must exist), else the default file if it
    /// exists, else an empty config.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let path = default_path()?;
        if path.exists() {
            tracing::debug!(path = %path.display(), "loading config");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}

/// `~/.mnp.toml`.
pub fn default_path() -> Result<PathBuf, ConfigError> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FILE))
        .ok_or(ConfigError::NoHome)
}

/// Values from the command line; `None` (or `false`) means not given.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--rpc-user`
    pub rpc_user: Option<String>,
    /// `--rpc-password`
    pub rpc_password: Option<String>,
    /// `--rpc-host`
    pub rpc_host: Option<String>,
    /// `--rpc-port`
    pub rpc_port: Option<u16>,
    /// `--account`
    pub account: Option<u32>,
    /// `--workdir`
    pub workdir: Option<PathBuf>,
    /// `--verbose`
    pub verbose: bool,
}

/// Configuration after merging and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Wallet connection, possibly incomplete until [`Settings::endpoint`].
    pub rpc: RpcSection,
    /// Wallet account index.
    pub account: u32,
    /// Log at info level.
    pub verbose: bool,
    /// Default confirmation threshold.
    pub confirmations: u64,
    /// Alert linger before exit.
    pub linger: Duration,
    /// Root of pipes and files.
    pub workdir: Option<PathBuf>,
    /// Directory mode bits.
    pub dir_mode: u32,
    /// Pipe mode bits.
    pub pipe_mode: u32,
}

impl Settings {
    /// Merge `file` with `cli`; command-line values win. Permission strings
    /// are parsed here.
    pub fn resolve(file: FileConfig, cli: Overrides) -> Result<Self, ConfigError> {
        let FileConfig { mut rpc, mnp, cfg } = file;
        rpc.user = cli.rpc_user.or(rpc.user);
        rpc.password = cli.rpc_password.or(rpc.password);
        rpc.host = cli.rpc_host.or(rpc.host);
        rpc.port = cli.rpc_port.or(rpc.port);

        let dir_mode = mode_field("cfg.mode", cfg.mode.as_deref().unwrap_or(DEFAULT_DIR_MODE))?;
        let pipe_mode = mode_field("cfg.pipe", cfg.pipe.as_deref().unwrap_or(DEFAULT_PIPE_MODE))?;

        Ok(Self {
            rpc,
            account: cli.account.or(mnp.account).unwrap_or(0),
            verbose: cli.verbose || mnp.verbose.unwrap_or(false),
            confirmations: mnp.confirmations.unwrap_or(1),
            linger: Duration::from_secs(mnp.linger_secs.unwrap_or(DEFAULT_LINGER_SECS)),
            workdir: cli.workdir.or(cfg.workdir),
            dir_mode,
            pipe_mode,
        })
    }

    /// The workdir, which every tool except `mnp-payment` needs.
    pub fn workdir(&self) -> Result<&Path, ConfigError> {
        self.workdir.as_deref().ok_or(ConfigError::Missing("cfg.workdir"))
    }

    /// Channel registry rooted at the workdir.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        Ok(Registry::new(self.workdir()?, self.dir_mode, self.pipe_mode))
    }

    /// Complete wallet endpoint.
    #[cfg(feature = "http")]
    pub fn endpoint(&self) -> Result<crate::wallet::http::Endpoint, ConfigError> {
        let rpc = &self.rpc;
        Ok(crate::wallet::http::Endpoint {
            host: rpc.host.clone().ok_or(ConfigError::Missing("rpc.host"))?,
            port: rpc.port.ok_or(ConfigError::Missing("rpc.port"))?,
            user: rpc.user.clone().ok_or(ConfigError::Missing("rpc.user"))?,
            password: rpc.password.clone().ok_or(ConfigError::Missing("rpc.password"))?,
            timeout: Duration::from_secs(rpc.timeout_secs.unwrap_or(DEFAULT_RPC_TIMEOUT_SECS)),
        })
    }
}

fn mode_field(field: &'static str, value: &str) -> Result<u32, ConfigError> {
    parse_symbolic_mode(value).ok_or_else(|| ConfigError::Mode {
        field,
        value: value.to_owned(),
    })
}

/// Poll interval from `MNP_POLL_INTERVAL`, or the default when unset or not
/// a number.
pub fn poll_interval_from_env() -> Duration {
    poll_interval_from(std::env::var(POLL_INTERVAL_ENV).ok().as_deref())
}

fn poll_interval_from(raw: Option<&str>) -> Duration {
    match raw.map(str::trim).map(str::parse::<u64>) {
        Some(Ok(secs)) => Duration::from_secs(secs),
        Some(Err(_)) => {
            tracing::warn!(var = POLL_INTERVAL_ENV, "not a number of seconds, using default");
            DEFAULT_POLL_INTERVAL
        }
        None => DEFAULT_POLL_INTERVAL,
    }
}
