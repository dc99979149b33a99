//! `mnpd`: keep `balance` and `bc_height` in the workdir up to date.
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use mnp::cli::{self, CommonArgs};
use mnp::{config, logging, shutdown, workdir, DiffPublisher, HttpWallet, WalletRpc};

/// Publish wallet balance and chain height as files, rewritten on change.
#[derive(Debug, Parser)]
#[command(name = "mnpd", version, rename_all = "kebab-case")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "mnpd stopped");
            cli::report("mnpd", &e)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.common.settings()?;
    let registry = settings.registry()?;
    workdir::require(registry.workdir())?;

    let _guard = logging::init_daemon(settings.verbose, registry.workdir())
        .context("open daemon log")?;

    let wallet = HttpWallet::new(settings.endpoint()?)?;
    let (major, minor) = wallet.version().await.context("get_version")?;
    let cancel = shutdown::install().context("install signal handlers")?;
    let interval = config::poll_interval_from_env();

    tracing::info!(
        workdir = %registry.workdir().display(),
        account = settings.account,
        interval_secs = interval.as_secs(),
        rpc_version = %format!("{major}.{minor}"),
        "mnpd starting"
    );
    let mut publisher = DiffPublisher::new(wallet, &registry, settings.account);
    publisher.run(interval, &cancel).await?;
    Ok(())
}
