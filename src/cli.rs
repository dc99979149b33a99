//! Command-line pieces shared by `mnp`, `mnpd` and `mnp-payment`.
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;

use crate::config::{FileConfig, Overrides, Settings};
use crate::error::ConfigError;

/// Connection and layout options every tool accepts.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Wallet RPC login user.
    #[arg(long)]
    pub rpc_user: Option<String>,
    /// Wallet RPC login password.
    #[arg(long)]
    pub rpc_password: Option<String>,
    /// Wallet RPC host.
    #[arg(long)]
    pub rpc_host: Option<String>,
    /// Wallet RPC port.
    #[arg(long)]
    pub rpc_port: Option<u16>,
    /// Wallet account index.
    #[arg(short = 'a', long)]
    pub account: Option<u32>,
    /// Directory holding the pipes.
    #[arg(short = 'w', long)]
    pub workdir: Option<PathBuf>,
    /// Log progress to stderr.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Config file (default ~/.mnp.toml).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    /// Load the config file and apply these options on top.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let file = FileConfig::discover(self.config.as_deref())?;
        Settings::resolve(
            file,
            Overrides {
                rpc_user: self.rpc_user.clone(),
                rpc_password: self.rpc_password.clone(),
                rpc_host: self.rpc_host.clone(),
                rpc_port: self.rpc_port,
                account: self.account,
                workdir: self.workdir.clone(),
                verbose: self.verbose,
            },
        )
    }
}

/// Print `err` the way all tools report fatal errors and pick the exit code.
pub fn report(tool: &str, err: &anyhow::Error) -> ExitCode {
    eprintln!("{tool}: {err:#}");
    ExitCode::FAILURE
}
