//! Typed views over the `result` objects the wallet returns.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RpcError;
use crate::ids::NULL_PAYMENT_ID;

/// One incoming transfer as reported by `get_transfer_by_txid`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MonitoredTransaction {
    /// Transaction id.
    pub txid: String,
    /// Receiving (sub)address.
    pub address: String,
    /// Payment id, the null sentinel when the sender attached none.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Amount in atomic units.
    pub amount: u64,
    /// Blocks on top of the including block; absent while in the pool.
    #[serde(default)]
    pub confirmations: u64,
    /// Whether the output is still locked for spending.
    #[serde(default = "locked_by_default")]
    pub locked: bool,
    /// Whether the wallet saw a competing spend of the same inputs.
    #[serde(default)]
    pub double_spend_seen: bool,
}

fn locked_by_default() -> bool {
    true
}

impl MonitoredTransaction {
    /// Payment id if one is attached and it is not the null sentinel.
    pub fn payment_id(&self) -> Option<&str> {
        self.payment_id
            .as_deref()
            .filter(|p| !p.is_empty() && *p != NULL_PAYMENT_ID)
    }

    /// Name the channel is keyed by: payment id, else the address.
    pub fn delivery_key(&self) -> &str {
        self.payment_id().unwrap_or(&self.address)
    }
}

/// Result of a spend-proof check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SpendProofReport {
    /// Whether the proof verified.
    pub good: bool,
}

/// Result of a transaction-proof check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TxProofReport {
    /// Whether the proof verified.
    pub good: bool,
    /// Confirmations of the proven transaction.
    #[serde(default)]
    pub confirmations: u64,
    /// Amount received by the address, in atomic units.
    #[serde(default)]
    pub received: u64,
    /// Whether the transaction is still in the pool.
    #[serde(default)]
    pub in_pool: bool,
}

/// One entry of `get_address`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subaddress {
    /// Index within the account.
    pub address_index: u32,
    /// Address string.
    pub address: String,
}

/// Parts of an integrated address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SplitAddress {
    /// Standard address.
    pub standard_address: String,
    /// Embedded payment id.
    pub payment_id: String,
}

/// Transfers in a `get_transfer_by_txid` result.
///
/// Prefers the `transfers` list; falls back to the single `transfer` object
/// older wallets return.
pub fn transfers(method: &'static str, result: &Value) -> Result<Vec<MonitoredTransaction>, RpcError> {
    if let Some(list) = result.get("transfers") {
        return decode(method, list.clone());
    }
    match result.get("transfer") {
        Some(one) => Ok(vec![decode(method, one.clone())?]),
        None => Err(RpcError::malformed(method, "no transfers in result")),
    }
}

/// `balance` field as an integer.
pub fn balance(method: &'static str, result: &Value) -> Result<u64, RpcError> {
    u64_field(method, result, "balance")
}

/// `height` field as an integer.
pub fn height(method: &'static str, result: &Value) -> Result<u64, RpcError> {
    u64_field(method, result, "height")
}

/// `addresses` list.
pub fn subaddresses(method: &'static str, result: &Value) -> Result<Vec<Subaddress>, RpcError> {
    let list = result
        .get("addresses")
        .ok_or_else(|| RpcError::malformed(method, "missing addresses"))?;
    decode(method, list.clone())
}

/// A named string field.
pub fn string_field(method: &'static str, result: &Value, field: &str) -> Result<String, RpcError> {
    result
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| RpcError::malformed(method, format!("missing string field {field}")))
}

/// Version split into `(major, minor)`.
pub fn version(method: &'static str, result: &Value) -> Result<(u32, u32), RpcError> {
    let v = u64_field(method, result, "version")?;
    Ok((((v & 0xFFFF_0000) >> 16) as u32, (v & 0x0000_FFFF) as u32))
}

/// Decode the whole result object into `T`.
pub fn decode<T: DeserializeOwned>(method: &'static str, result: Value) -> Result<T, RpcError> {
    serde_json::from_value(result).map_err(|e| RpcError::malformed(method, e.to_string()))
}

fn u64_field(method: &'static str, result: &Value, field: &str) -> Result<u64, RpcError> {
    result
        .get(field)
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::malformed(method, format!("missing integer field {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const M: &str = "get_transfer_by_txid";

    #[test]
    fn delivery_key_prefers_real_payment_id() {
        let t: MonitoredTransaction = decode(
            M,
            json!({"txid": "aa", "address": "4Addr", "payment_id": "1234567890abcdef", "amount": 5}),
        )
        .unwrap();
        assert_eq!(t.delivery_key(), "1234567890abcdef");
    }

    #[test]
    fn delivery_key_falls_back_to_address() {
        for pid in [json!("0000000000000000"), json!(""), Value::Null] {
            let t: MonitoredTransaction = decode(
                M,
                json!({"txid": "aa", "address": "4Addr", "payment_id": pid, "amount": 5}),
            )
            .unwrap();
            assert_eq!(t.delivery_key(), "4Addr");
        }
    }

    #[test]
    fn pool_transfer_defaults() {
        let t: MonitoredTransaction =
            decode(M, json!({"txid": "aa", "address": "4A", "amount": 1})).unwrap();
        assert_eq!(t.confirmations, 0);
        assert!(t.locked);
        assert!(!t.double_spend_seen);
    }

    #[test]
    fn transfers_list_or_single() {
        let list = json!({"transfers": [
            {"txid": "aa", "address": "4A", "amount": 1},
            {"txid": "aa", "address": "8B", "amount": 2},
        ]});
        assert_eq!(transfers(M, &list).unwrap().len(), 2);

        let single = json!({"transfer": {"txid": "aa", "address": "4A", "amount": 1}});
        assert_eq!(transfers(M, &single).unwrap()[0].amount, 1);

        assert!(matches!(
            transfers(M, &json!({})),
            Err(RpcError::Malformed { .. })
        ));
    }

    #[test]
    fn version_is_split_into_major_minor() {
        assert_eq!(version("get_version", &json!({"version": 65562})).unwrap(), (1, 26));
    }

    #[test]
    fn missing_numeric_field_is_malformed() {
        assert!(balance("get_balance", &json!({"unlocked_balance": 3})).is_err());
        assert_eq!(height("get_height", &json!({"height": 3100000})).unwrap(), 3_100_000);
    }
}
