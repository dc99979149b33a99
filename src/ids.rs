//! Validated identifiers: transaction ids, payment ids, amounts.
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crate::error::ValidationError;

/// Length of a transaction id in hex characters.
pub const TXID_HEX_LEN: usize = 64;

/// Length of a (short) payment id in hex characters.
pub const PAYMENT_ID_HEX_LEN: usize = 16;

/// Payment id the wallet reports for transfers that carry none.
pub const NULL_PAYMENT_ID: &str = "0000000000000000";

/// A 32-byte transaction id, kept in lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxId(String);

impl TxId {
    /// Hex form as passed to and received from the wallet.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_hex_of_len(s, TXID_HEX_LEN) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ValidationError::TxId(s.to_owned()))
        }
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An 8-byte payment id, kept in lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentId(String);

impl PaymentId {
    /// Hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the all-zero id the wallet uses when there is none.
    pub fn is_null(&self) -> bool {
        self.0 == NULL_PAYMENT_ID
    }
}

impl FromStr for PaymentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_hex_of_len(s, PAYMENT_ID_HEX_LEN) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(ValidationError::PaymentId(s.to_owned()))
        }
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse an amount in atomic units (digits only, no sign, no decimal point).
pub fn parse_amount(s: &str) -> Result<u64, ValidationError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Amount(s.to_owned()));
    }
    s.parse().map_err(|_| ValidationError::Amount(s.to_owned()))
}

/// Read exactly `len` bytes from `input` (the piped-in form of an id). Short
/// or non-UTF-8 input comes back as whatever was read, for the caller's
/// validation error.
pub fn read_token(mut input: impl Read, len: usize) -> String {
    let mut buf = Vec::with_capacity(len);
    // a read error just means a short token
    let _ = input.by_ref().take(len as u64).read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && hex::decode(s).is_ok()
}
