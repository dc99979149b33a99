//! `mnp-payment`: hand out receiving addresses and payment URIs.
use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;

use mnp::cli::{self, CommonArgs};
use mnp::error::ValidationError;
use mnp::ids::{parse_amount, read_token, PaymentId, PAYMENT_ID_HEX_LEN};
use mnp::payment::{self, Target};
use mnp::{logging, HttpWallet};

/// Subaddresses, integrated addresses and `monero:` URIs from the wallet.
#[derive(Debug, Parser)]
#[command(name = "mnp-payment", version, rename_all = "kebab-case")]
struct Args {
    /// Payment id (16 hex characters) for an integrated address. Read from
    /// stdin when omitted and no other action is given.
    payment_id: Option<String>,

    #[command(flatten)]
    common: CommonArgs,

    /// List all subaddresses with their indices.
    #[arg(short = 'l', long)]
    list: bool,

    /// Subaddress at INDEX.
    #[arg(short = 's', long = "subaddr", value_name = "INDEX")]
    subaddr: Option<u32>,

    /// Create a new subaddress.
    #[arg(short = 'n', long = "newaddr")]
    newaddr: bool,

    /// Request this many atomic units: print a payment URI instead.
    #[arg(short = 'x', long, value_name = "ATOMIC_UNITS", value_parser = parse_amount)]
    amount: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => cli::report("mnp-payment", &e),
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.common.settings()?;
    logging::init(settings.verbose);

    let target = if args.list {
        Target::List
    } else if let Some(index) = args.subaddr {
        Target::Subaddress(index)
    } else if args.newaddr {
        Target::NewSubaddress
    } else {
        let raw = match args.payment_id {
            Some(p) => p,
            None if io::stdin().is_terminal() => {
                return Err(ValidationError::MissingOption {
                    option: "list, --subaddr, --newaddr or a payment id",
                    context: "to know what to print",
                }
                .into())
            }
            None => tokio::task::spawn_blocking(|| read_token(io::stdin().lock(), PAYMENT_ID_HEX_LEN)).await?,
        };
        let pid: PaymentId = raw.trim().parse()?;
        Target::Integrated(pid)
    };

    let wallet = HttpWallet::new(settings.endpoint()?)?;
    for line in payment::resolve(&wallet, settings.account, &target, args.amount).await? {
        println!("{line}");
    }
    Ok(())
}
