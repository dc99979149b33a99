//! One variant per wallet method, each carrying only what that method needs.
use serde_json::{json, Value};

use crate::ids::{PaymentId, TxId};

/// A wallet RPC request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcRequest {
    /// Current blockchain height as seen by the wallet.
    GetHeight,
    /// Balance of an account.
    GetBalance {
        /// Account index.
        account: u32,
    },
    /// All transfers belonging to a transaction id.
    GetTransferByTxid {
        /// Account index.
        account: u32,
        /// Transaction to look up.
        txid: TxId,
    },
    /// Addresses of an account; all of them when `index` is `None`.
    GetAddress {
        /// Account index.
        account: u32,
        /// Single subaddress index to fetch.
        index: Option<u32>,
    },
    /// Create a fresh subaddress.
    CreateAddress {
        /// Account index.
        account: u32,
    },
    /// Integrated address from the primary address and a payment id.
    MakeIntegratedAddress {
        /// Payment id to embed.
        payment_id: PaymentId,
    },
    /// `monero:` payment URI.
    MakeUri {
        /// Destination address.
        address: String,
        /// Amount in atomic units.
        amount: u64,
    },
    /// Standard address and payment id of an integrated address.
    SplitIntegratedAddress {
        /// Address to split.
        integrated_address: String,
    },
    /// Verify a spend proof.
    CheckSpendProof {
        /// Proven transaction.
        txid: TxId,
        /// Optional message the proof was signed with.
        message: Option<String>,
        /// Proof signature.
        signature: String,
    },
    /// Verify a transaction proof for a destination address.
    CheckTxProof {
        /// Proven transaction.
        txid: TxId,
        /// Destination address.
        address: String,
        /// Optional message the proof was signed with.
        message: Option<String>,
        /// Proof signature.
        signature: String,
    },
    /// Wallet RPC version.
    GetVersion,
}

impl RpcRequest {
    /// JSON-RPC method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::GetHeight => "get_height",
            Self::GetBalance { .. } => "get_balance",
            Self::GetTransferByTxid { .. } => "get_transfer_by_txid",
            Self::GetAddress { .. } => "get_address",
            Self::CreateAddress { .. } => "create_address",
            Self::MakeIntegratedAddress { .. } => "make_integrated_address",
            Self::MakeUri { .. } => "make_uri",
            Self::SplitIntegratedAddress { .. } => "split_integrated_address",
            Self::CheckSpendProof { .. } => "check_spend_proof",
            Self::CheckTxProof { .. } => "check_tx_proof",
            Self::GetVersion => "get_version",
        }
    }

    /// JSON-RPC `params` object, `None` for methods that take none.
    pub fn params(&self) -> Option<Value> {
        let params = match self {
            Self::GetHeight | Self::GetVersion => return None,
            Self::GetBalance { account } | Self::CreateAddress { account } => {
                json!({ "account_index": account })
            }
            Self::GetTransferByTxid { account, txid } => json!({
                "account_index": account,
                "txid": txid.as_str(),
            }),
            Self::GetAddress { account, index } => match index {
                Some(i) => json!({ "account_index": account, "address_index": [i] }),
                None => json!({ "account_index": account }),
            },
            Self::MakeIntegratedAddress { payment_id } => {
                json!({ "payment_id": payment_id.as_str() })
            }
            Self::MakeUri { address, amount } => json!({
                "address": address,
                "amount": amount,
            }),
            Self::SplitIntegratedAddress { integrated_address } => {
                json!({ "integrated_address": integrated_address })
            }
            Self::CheckSpendProof {
                txid,
                message,
                signature,
            } => with_message(
                json!({ "txid": txid.as_str(), "signature": signature }),
                message,
            ),
            Self::CheckTxProof {
                txid,
                address,
                message,
                signature,
            } => with_message(
                json!({ "txid": txid.as_str(), "address": address, "signature": signature }),
                message,
            ),
        };
        Some(params)
    }

    /// Full JSON-RPC 2.0 frame.
    pub fn frame(&self) -> Value {
        let mut frame = json!({
            "jsonrpc": "2.0",
            "id": "0",
            "method": self.method(),
        });
        if let Some(params) = self.params() {
            frame["params"] = params;
        }
        frame
    }
}

fn with_message(mut params: Value, message: &Option<String>) -> Value {
    if let Some(m) = message {
        params["message"] = Value::String(m.clone());
    }
    params
}
