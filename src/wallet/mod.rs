//! The wallet collaborator: one `call` per request, plus typed helpers on top.
use async_trait::async_trait;
use serde_json::Value;

use crate::error::RpcError;
use crate::ids::{PaymentId, TxId};

pub mod reply;
pub mod request;

#[cfg(feature = "http")]
pub mod digest;
#[cfg(feature = "http")]
pub mod http;

pub use reply::{MonitoredTransaction, SpendProofReport, SplitAddress, Subaddress, TxProofReport};
pub use request::RpcRequest;

/// Anything that can answer wallet RPC requests.
///
/// Implementations return the `result` object of the reply; an `error` object
/// or an unreachable wallet becomes an [`RpcError`].
#[async_trait]
pub trait WalletRpc: Send + Sync {
    /// Perform one request.
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError>;

    /// Transfers belonging to `txid` on `account`.
    async fn transfers_by_txid(
        &self,
        account: u32,
        txid: &TxId,
    ) -> Result<Vec<MonitoredTransaction>, RpcError> {
        let req = RpcRequest::GetTransferByTxid {
            account,
            txid: txid.clone(),
        };
        let result = self.call(&req).await?;
        reply::transfers(req.method(), &result)
    }

    /// Balance of `account` in atomic units.
    async fn balance(&self, account: u32) -> Result<u64, RpcError> {
        let req = RpcRequest::GetBalance { account };
        let result = self.call(&req).await?;
        reply::balance(req.method(), &result)
    }

    /// Blockchain height known to the wallet.
    async fn height(&self) -> Result<u64, RpcError> {
        let req = RpcRequest::GetHeight;
        let result = self.call(&req).await?;
        reply::height(req.method(), &result)
    }

    /// Verify a spend proof.
    async fn check_spend_proof(
        &self,
        txid: &TxId,
        message: Option<String>,
        signature: String,
    ) -> Result<SpendProofReport, RpcError> {
        let req = RpcRequest::CheckSpendProof {
            txid: txid.clone(),
            message,
            signature,
        };
        let result = self.call(&req).await?;
        reply::decode(req.method(), result)
    }

    /// Verify a transaction proof for `address`.
    async fn check_tx_proof(
        &self,
        txid: &TxId,
        address: String,
        message: Option<String>,
        signature: String,
    ) -> Result<TxProofReport, RpcError> {
        let req = RpcRequest::CheckTxProof {
            txid: txid.clone(),
            address,
            message,
            signature,
        };
        let result = self.call(&req).await?;
        reply::decode(req.method(), result)
    }

    /// Subaddresses of `account`; only `index` when given.
    async fn subaddresses(
        &self,
        account: u32,
        index: Option<u32>,
    ) -> Result<Vec<Subaddress>, RpcError> {
        let req = RpcRequest::GetAddress { account, index };
        let result = self.call(&req).await?;
        reply::subaddresses(req.method(), &result)
    }

    /// Create a new subaddress on `account` and return it.
    async fn create_subaddress(&self, account: u32) -> Result<String, RpcError> {
        let req = RpcRequest::CreateAddress { account };
        let result = self.call(&req).await?;
        reply::string_field(req.method(), &result, "address")
    }

    /// Integrated address embedding `payment_id`.
    async fn integrated_address(&self, payment_id: &PaymentId) -> Result<String, RpcError> {
        let req = RpcRequest::MakeIntegratedAddress {
            payment_id: payment_id.clone(),
        };
        let result = self.call(&req).await?;
        reply::string_field(req.method(), &result, "integrated_address")
    }

    /// Split an integrated address into its parts.
    async fn split_integrated_address(&self, address: String) -> Result<SplitAddress, RpcError> {
        let req = RpcRequest::SplitIntegratedAddress {
            integrated_address: address,
        };
        let result = self.call(&req).await?;
        reply::decode(req.method(), result)
    }

    /// `monero:` URI requesting `amount` to `address`.
    async fn payment_uri(&self, address: String, amount: u64) -> Result<String, RpcError> {
        let req = RpcRequest::MakeUri { address, amount };
        let result = self.call(&req).await?;
        reply::string_field(req.method(), &result, "uri")
    }

    /// RPC version as `(major, minor)`.
    async fn version(&self) -> Result<(u32, u32), RpcError> {
        let req = RpcRequest::GetVersion;
        let result = self.call(&req).await?;
        reply::version(req.method(), &result)
    }
}
