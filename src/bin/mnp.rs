//! `mnp`: watch one transaction and deliver its amount through a named pipe.
use std::io;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use mnp::cli::{self, CommonArgs};
use mnp::config;
use mnp::engine::{NotifyLevel, WatchOutcome, WatchSettings, Watcher};
use mnp::error::ValidationError;
use mnp::ids::{read_token, TXID_HEX_LEN};
use mnp::proof::{self, Proof};
use mnp::{logging, shutdown, workdir, Alerts, FileLedger, HttpWallet, TxId};

/// Monero named pipes: tell one reader when a transfer reached a milestone.
#[derive(Debug, Parser)]
#[command(name = "mnp", version, rename_all = "kebab-case")]
struct Args {
    /// Transaction id (64 hex characters). Read from stdin when omitted.
    txid: Option<String>,

    #[command(flatten)]
    common: CommonArgs,

    /// When to notify: none, txpool, confirmed, unlocked (or 0-3).
    #[arg(long, value_name = "LEVEL", default_value = "confirmed")]
    notify_at: NotifyLevel,

    /// Confirmations needed with --notify-at confirmed.
    #[arg(short = 'n', long, value_name = "N")]
    confirmation: Option<u64>,

    /// Check a spend proof instead of watching.
    #[arg(long, conflicts_with = "tx_proof")]
    spend_proof: bool,

    /// Check a transaction proof instead of watching.
    #[arg(long)]
    tx_proof: bool,

    /// Proof signature.
    #[arg(long)]
    signature: Option<String>,

    /// Destination address for --tx-proof.
    #[arg(long)]
    address: Option<String>,

    /// Message the proof was signed with.
    #[arg(long)]
    message: Option<String>,

    /// Create the workdir, its directories and long-lived pipes.
    #[arg(long, conflicts_with = "cleanup")]
    init: bool,

    /// Delete the workdir.
    #[arg(long)]
    cleanup: bool,

    /// Watch even if the ledger already lists the id.
    #[arg(long)]
    retry: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => cli::report("mnp", &e),
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let settings = args.common.settings()?;
    logging::init(settings.verbose);
    let registry = settings.registry()?;

    if args.cleanup {
        workdir::cleanup(registry.workdir())?;
        return Ok(ExitCode::SUCCESS);
    }
    if args.init {
        workdir::init(&registry)?;
        return Ok(ExitCode::SUCCESS);
    }

    let raw = match args.txid {
        Some(t) => t,
        None => tokio::task::spawn_blocking(|| read_token(io::stdin().lock(), TXID_HEX_LEN)).await?,
    };
    let txid: TxId = raw.trim().parse()?;

    let wallet = HttpWallet::new(settings.endpoint()?)?;
    let cancel = shutdown::install().context("install signal handlers")?;

    if args.spend_proof || args.tx_proof {
        let signature = args.signature.ok_or(ValidationError::MissingOption {
            option: "signature",
            context: "to check a proof",
        })?;
        let proof = if args.spend_proof {
            Proof::Spend {
                message: args.message,
                signature,
            }
        } else {
            Proof::Tx {
                address: args.address.ok_or(ValidationError::MissingOption {
                    option: "address",
                    context: "with --tx-proof",
                })?,
                message: args.message,
                signature,
            }
        };
        let alerts = Alerts::new(registry);
        let verdict = proof::check(&wallet, &alerts, &txid, proof).await;
        alerts.settle(settings.linger).await;
        let verdict = verdict?;
        println!("{verdict}");
        return Ok(if verdict.is_good() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    workdir::require(registry.workdir())?;
    let watch = WatchSettings {
        level: args.notify_at,
        confirmations: args.confirmation.unwrap_or(settings.confirmations),
        account: settings.account,
        poll_interval: config::poll_interval_from_env(),
        skip_ledger: args.retry,
    };
    let ledger = FileLedger::in_workdir(registry.workdir());
    let watcher = Watcher::new(wallet, ledger, registry, watch);

    let outcome = watcher.run(&txid, &cancel).await;
    let tally = watcher.alerts().settle(settings.linger).await;
    tracing::debug!(?tally, "side channels settled");

    match outcome? {
        WatchOutcome::Duplicate | WatchOutcome::NotRequested => Ok(ExitCode::SUCCESS),
        WatchOutcome::Delivered { polls, channels } => {
            tracing::info!(%txid, polls, ?channels, "delivered");
            Ok(ExitCode::SUCCESS)
        }
        WatchOutcome::Cancelled { polls } => {
            tracing::warn!(%txid, polls, "cancelled before delivery");
            Ok(ExitCode::FAILURE)
        }
    }
}
