//! Receiving addresses and payment URIs (`mnp-payment`).
use anyhow::{bail, Context};

use crate::ids::PaymentId;
use crate::wallet::WalletRpc;

/// What address to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every subaddress of the account.
    List,
    /// Subaddress at this index.
    Subaddress(u32),
    /// A freshly created subaddress.
    NewSubaddress,
    /// Integrated address embedding this payment id.
    Integrated(PaymentId),
}

/// Resolve `target` on `account`. With `amount`, single addresses are turned
/// into a `monero:` URI requesting that many atomic units. Integrated
/// addresses are split again and must carry the requested payment id.
///
/// Returns the lines to print.
pub async fn resolve<W: WalletRpc + ?Sized>(
    wallet: &W,
    account: u32,
    target: &Target,
    amount: Option<u64>,
) -> anyhow::Result<Vec<String>> {
    let address = match target {
        Target::List => {
            let list = wallet.subaddresses(account, None).await.context("get_address")?;
            return Ok(list
                .into_iter()
                .map(|s| format!("{} {}", s.address_index, s.address))
                .collect());
        }
        Target::Subaddress(index) => wallet
            .subaddresses(account, Some(*index))
            .await
            .context("get_address")?
            .into_iter()
            .find(|s| s.address_index == *index)
            .map(|s| s.address)
            .with_context(|| format!("wallet has no subaddress {index} on account {account}"))?,
        Target::NewSubaddress => wallet.create_subaddress(account).await.context("create_address")?,
        Target::Integrated(pid) => {
            let address = wallet
                .integrated_address(pid)
                .await
                .context("make_integrated_address")?;
            let parts = wallet
                .split_integrated_address(address.clone())
                .await
                .context("split_integrated_address")?;
            if !parts.payment_id.eq_ignore_ascii_case(pid.as_str()) {
                bail!(
                    "wallet embedded payment id {} in {address}, asked for {pid}",
                    parts.payment_id
                );
            }
            tracing::debug!(%pid, standard = %parts.standard_address, "integrated address checked");
            address
        }
    };

    match amount {
        None => Ok(vec![address]),
        Some(amount) => {
            let uri = wallet.payment_uri(address, amount).await.context("make_uri")?;
            Ok(vec![uri])
        }
    }
}
