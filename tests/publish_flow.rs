use async_trait::async_trait;
use mnp::prelude::*;
use mnp::{RpcError, RpcRequest};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// ------- Wallet with a scripted balance series and a fixed height -------
struct BalanceSeries {
    balances: Mutex<VecDeque<u64>>,
    height: u64,
    calls: Arc<Mutex<Vec<&'static str>>>,
}
impl BalanceSeries {
    fn new(balances: &[u64], height: u64) -> Self {
        Self {
            balances: Mutex::new(balances.iter().copied().collect()),
            height,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}
#[async_trait]
impl WalletRpc for BalanceSeries {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(request.method());
        match request {
            RpcRequest::GetBalance { .. } => match self.balances.lock().unwrap().pop_front() {
                Some(b) => Ok(json!({ "balance": b, "unlocked_balance": b })),
                None => Err(RpcError::Transport {
                    endpoint: "127.0.0.1:18082".into(),
                    reason: "wallet went away".into(),
                }),
            },
            RpcRequest::GetHeight => Ok(json!({ "height": self.height })),
            other => panic!("unexpected {}", other.method()),
        }
    }
}

#[tokio::test]
async fn unchanged_balance_is_written_once() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let mut publisher = DiffPublisher::new(BalanceSeries::new(&[10, 10, 10, 20, 20], 3000), &registry, 0);

    let mut balance_writes = 0;
    let mut height_writes = 0;
    for _ in 0..5 {
        let cycle = publisher.publish_once().await?;
        balance_writes += usize::from(cycle.balance_written);
        height_writes += usize::from(cycle.height_written);
    }

    assert_eq!(balance_writes, 2);
    assert_eq!(height_writes, 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("balance"))?, "20\n");
    assert_eq!(std::fs::read_to_string(dir.path().join("bc_height"))?, "3000\n");
    assert_eq!(publisher.balance().last(), Some("20"));
    Ok(())
}

#[tokio::test]
async fn wallet_failure_ends_the_loop() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let wallet = BalanceSeries::new(&[5, 6], 1);
    let calls = wallet.calls.clone();
    let mut publisher = DiffPublisher::new(wallet, &registry, 0);

    let err = publisher
        .run(Duration::from_millis(1), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("get_balance"));
    // two good cycles, then the failing balance call
    assert_eq!(
        calls.lock().unwrap().as_slice(),
        ["get_balance", "get_height", "get_balance", "get_height", "get_balance"]
    );
    assert_eq!(std::fs::read_to_string(dir.path().join("balance"))?, "6\n");
    Ok(())
}

#[tokio::test]
async fn cancelled_publisher_stops_between_cycles() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let mut publisher = DiffPublisher::new(BalanceSeries::new(&[1; 100], 1), &registry, 0);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let cycles = tokio::time::timeout(
        Duration::from_secs(10),
        publisher.run(Duration::from_secs(3600), &cancel),
    )
    .await??;
    assert_eq!(cycles, 1);
    Ok(())
}
