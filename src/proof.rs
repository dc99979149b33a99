//! Spend and transaction proof checks. The wallet does the verification;
//! only its verdict is interpreted here.
use std::fmt;

use anyhow::Context;

use crate::alerts::Alerts;
use crate::ids::TxId;
use crate::wallet::{SpendProofReport, TxProofReport, WalletRpc};

/// A proof to check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proof {
    /// The sender spent the inputs of the transaction.
    Spend {
        /// Message the proof was signed with.
        message: Option<String>,
        /// Proof signature.
        signature: String,
    },
    /// The transaction paid `address`.
    Tx {
        /// Destination address.
        address: String,
        /// Message the proof was signed with.
        message: Option<String>,
        /// Proof signature.
        signature: String,
    },
}

/// Wallet's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Spend proof result.
    Spend(SpendProofReport),
    /// Transaction proof result.
    Tx(TxProofReport),
}

impl Verdict {
    /// Whether the proof verified.
    pub fn is_good(&self) -> bool {
        match self {
            Self::Spend(r) => r.good,
            Self::Tx(r) => r.good,
        }
    }
}

/// `true`/`false` for spend proofs, `{good} {confirmations} {received}` for
/// transaction proofs.
impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spend(r) => write!(f, "{}", r.good),
            Self::Tx(r) => write!(f, "{} {} {}", r.good, r.confirmations, r.received),
        }
    }
}

/// Ask the wallet to verify `proof` for `txid`. A failed call fires the
/// RPC-connection alert before the error is returned.
pub async fn check<W: WalletRpc + ?Sized>(
    wallet: &W,
    alerts: &Alerts,
    txid: &TxId,
    proof: Proof,
) -> anyhow::Result<Verdict> {
    let result = match proof {
        Proof::Spend { message, signature } => wallet
            .check_spend_proof(txid, message, signature)
            .await
            .map(Verdict::Spend),
        Proof::Tx {
            address,
            message,
            signature,
        } => wallet
            .check_tx_proof(txid, address, message, signature)
            .await
            .map(Verdict::Tx),
    };
    match result {
        Ok(verdict) => {
            tracing::info!(%txid, good = verdict.is_good(), "proof checked");
            Ok(verdict)
        }
        Err(e) => {
            alerts.rpc_connection_lost(txid);
            Err(e).with_context(|| format!("proof check for {txid}"))
        }
    }
}
