use async_trait::async_trait;
use mnp::delivery::deliver_async;
use mnp::prelude::*;
use mnp::{RpcError, RpcRequest};
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ADDR: &str = "4AdUndXHHZ6cfufTMvppY6JwXNouMBzSkbLYfpAV5Usx";
const ADDR2: &str = "4BxSHvcgTwu25WooY4BVmgdcKwZu5EksVZSZkDcKcnsS";
const TICK: Duration = Duration::from_millis(5);

/// ------- Minimal in-memory Ledger -------
#[derive(Clone, Default)]
struct MemLedger {
    seen: Arc<Mutex<HashSet<String>>>,
}
#[async_trait]
impl Ledger for MemLedger {
    async fn has_seen(&self, id: &TxId) -> anyhow::Result<bool> {
        Ok(self.seen.lock().unwrap().contains(id.as_str()))
    }
    async fn record(&self, id: &TxId) -> anyhow::Result<()> {
        self.seen.lock().unwrap().insert(id.as_str().to_owned());
        Ok(())
    }
}

/// ------- Wallet replaying scripted transfer replies; the last one repeats -------
enum Step {
    Reply(Value),
    Down,
}
struct ScriptedWallet {
    steps: Mutex<VecDeque<Step>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}
impl ScriptedWallet {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}
#[async_trait]
impl WalletRpc for ScriptedWallet {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        self.calls.lock().unwrap().push(request.method());
        let mut steps = self.steps.lock().unwrap();
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().map(|s| match s {
                Step::Reply(v) => Step::Reply(v.clone()),
                Step::Down => Step::Down,
            })
        };
        match step {
            Some(Step::Reply(v)) => Ok(v),
            Some(Step::Down) | None => Err(RpcError::Transport {
                endpoint: "127.0.0.1:18082".into(),
                reason: "connection refused".into(),
            }),
        }
    }
}

fn entry(address: &str, payment_id: &str, amount: u64, confirmations: u64) -> Value {
    json!({
        "txid": "00", "address": address, "payment_id": payment_id,
        "amount": amount, "confirmations": confirmations, "locked": true,
        "double_spend_seen": false
    })
}

fn reply(entries: Vec<Value>) -> Step {
    Step::Reply(json!({ "transfers": entries }))
}

fn txid() -> TxId {
    "9f".repeat(32).parse().unwrap()
}

fn settings(level: NotifyLevel, confirmations: u64) -> WatchSettings {
    WatchSettings {
        level,
        confirmations,
        account: 0,
        poll_interval: TICK,
        skip_ledger: false,
    }
}

/// Wait for a FIFO to appear at `path`, then read everything written to it.
fn read_when_ready(path: PathBuf) -> JoinHandle<String> {
    thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !is_fifo(&path) {
            assert!(Instant::now() < deadline, "{} never appeared", path.display());
            thread::sleep(Duration::from_millis(1));
        }
        let mut s = String::new();
        std::fs::File::open(&path).unwrap().read_to_string(&mut s).unwrap();
        s
    })
}

fn is_fifo(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_fifo())
        .unwrap_or(false)
}

#[tokio::test]
async fn confirmed_at_two_delivers_after_two_sleeps() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let wallet = ScriptedWallet::new(vec![
        reply(vec![entry(ADDR, "0000000000000000", 500, 0)]),
        reply(vec![entry(ADDR, "0000000000000000", 500, 1)]),
        reply(vec![entry(ADDR, "0000000000000000", 500, 2)]),
    ]);
    let calls = wallet.calls.clone();
    let watcher = Watcher::new(wallet, MemLedger::default(), registry, settings(NotifyLevel::Confirmed, 2));

    let pipe = dir.path().join("transfer").join(ADDR);
    let reader = read_when_ready(pipe.clone());

    let outcome = watcher.run(&txid(), &CancellationToken::new()).await?;

    assert_eq!(
        outcome,
        WatchOutcome::Delivered {
            polls: 3,
            channels: vec![pipe.clone()],
        }
    );
    assert_eq!(reader.join().unwrap(), "500\n");
    assert!(!pipe.exists(), "single-use pipe must be gone after delivery");
    assert_eq!(calls.lock().unwrap().as_slice(), ["get_transfer_by_txid"; 3]);
    Ok(())
}

#[tokio::test]
async fn never_delivers_below_threshold() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let steps = (0..=4)
        .map(|c| reply(vec![entry(ADDR, "0000000000000000", 7, c)]))
        .collect();
    let watcher = Watcher::new(
        ScriptedWallet::new(steps),
        MemLedger::default(),
        Registry::new(dir.path(), 0o750, 0o640),
        settings(NotifyLevel::Confirmed, 3),
    );
    let reader = read_when_ready(dir.path().join("transfer").join(ADDR));

    match watcher.run(&txid(), &CancellationToken::new()).await? {
        // replies 0, 1, 2 wait; 3 is the first that qualifies
        WatchOutcome::Delivered { polls, .. } => assert_eq!(polls, 4),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(reader.join().unwrap(), "7\n");
    Ok(())
}

#[tokio::test]
async fn second_invocation_with_same_id_is_a_no_op() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let ledger = MemLedger::default();

    let first = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![entry(ADDR, "0000000000000000", 1, 0)])]),
        ledger.clone(),
        registry.clone(),
        settings(NotifyLevel::Txpool, 1),
    );
    let reader = read_when_ready(dir.path().join("transfer").join(ADDR));
    assert!(matches!(
        first.run(&txid(), &CancellationToken::new()).await?,
        WatchOutcome::Delivered { polls: 1, .. }
    ));
    assert_eq!(reader.join().unwrap(), "1\n");

    let wallet = ScriptedWallet::new(vec![reply(vec![entry(ADDR, "0000000000000000", 1, 0)])]);
    let calls = wallet.calls.clone();
    let second = Watcher::new(wallet, ledger.clone(), registry, settings(NotifyLevel::Txpool, 1));

    assert_eq!(
        second.run(&txid(), &CancellationToken::new()).await?,
        WatchOutcome::Duplicate
    );
    assert!(calls.lock().unwrap().is_empty());
    assert!(!dir.path().join("transfer").join(ADDR).exists());
    Ok(())
}

#[tokio::test]
async fn retry_bypasses_the_ledger() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let ledger = MemLedger::default();
    ledger.record(&txid()).await?;

    let mut s = settings(NotifyLevel::Txpool, 1);
    s.skip_ledger = true;
    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![entry(ADDR, "0000000000000000", 3, 0)])]),
        ledger,
        Registry::new(dir.path(), 0o750, 0o640),
        s,
    );
    let reader = read_when_ready(dir.path().join("transfer").join(ADDR));

    assert!(matches!(
        watcher.run(&txid(), &CancellationToken::new()).await?,
        WatchOutcome::Delivered { .. }
    ));
    assert_eq!(reader.join().unwrap(), "3\n");
    Ok(())
}

#[tokio::test]
async fn payment_id_selects_the_payment_pipe() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![entry(ADDR, "1234567890abcdef", 42, 0)])]),
        MemLedger::default(),
        Registry::new(dir.path(), 0o750, 0o640),
        settings(NotifyLevel::Txpool, 1),
    );
    let pipe = dir.path().join("payment").join("1234567890abcdef");
    let reader = read_when_ready(pipe.clone());

    let outcome = watcher.run(&txid(), &CancellationToken::new()).await?;
    assert_eq!(
        outcome,
        WatchOutcome::Delivered {
            polls: 1,
            channels: vec![pipe],
        }
    );
    assert_eq!(reader.join().unwrap(), "42\n");
    Ok(())
}

#[tokio::test]
async fn batch_reply_delivers_every_key() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![
            entry(ADDR, "0000000000000000", 10, 0),
            entry(ADDR2, "0000000000000000", 20, 0),
        ])]),
        MemLedger::default(),
        Registry::new(dir.path(), 0o750, 0o640),
        settings(NotifyLevel::Txpool, 1),
    );
    let r1 = read_when_ready(dir.path().join("transfer").join(ADDR));
    let r2 = read_when_ready(dir.path().join("transfer").join(ADDR2));

    match watcher.run(&txid(), &CancellationToken::new()).await? {
        WatchOutcome::Delivered { channels, .. } => assert_eq!(channels.len(), 2),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(r1.join().unwrap(), "10\n");
    assert_eq!(r2.join().unwrap(), "20\n");
    Ok(())
}

#[tokio::test]
async fn lost_wallet_fires_the_rpc_alert_and_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    mnp::workdir::init(&registry)?;

    let watcher = Watcher::new(
        ScriptedWallet::new(vec![Step::Down]),
        MemLedger::default(),
        registry,
        settings(NotifyLevel::Confirmed, 1),
    );
    let alert = read_when_ready(dir.path().join("rpc_connection_alert"));

    assert!(watcher.run(&txid(), &CancellationToken::new()).await.is_err());
    let tally = watcher.alerts().settle(Duration::from_secs(10)).await;

    assert_eq!(tally.delivered, 1);
    assert_eq!(alert.join().unwrap(), format!("{}\n", txid()));
    Ok(())
}

#[tokio::test]
async fn double_spend_alerts_once_without_stopping_the_watch() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    mnp::workdir::init(&registry)?;

    let mut flagged = entry(ADDR, "0000000000000000", 9, 0);
    flagged["double_spend_seen"] = json!(true);
    let mut flagged_confirmed = flagged.clone();
    flagged_confirmed["confirmations"] = json!(1);

    let watcher = Watcher::new(
        ScriptedWallet::new(vec![
            reply(vec![flagged.clone()]),
            reply(vec![flagged]),
            reply(vec![flagged_confirmed]),
        ]),
        MemLedger::default(),
        registry,
        settings(NotifyLevel::Confirmed, 1),
    );
    let alert = read_when_ready(dir.path().join("double_spend_alert"));
    let feed = read_when_ready(dir.path().join("txid"));
    let pipe = read_when_ready(dir.path().join("transfer").join(ADDR));

    assert!(matches!(
        watcher.run(&txid(), &CancellationToken::new()).await?,
        WatchOutcome::Delivered { polls: 3, .. }
    ));
    let tally = watcher.alerts().settle(Duration::from_secs(10)).await;

    assert_eq!(tally.delivered, 2); // one alert, one announcement
    assert_eq!(alert.join().unwrap(), format!("{} {ADDR}\n", txid()));
    assert_eq!(feed.join().unwrap(), format!("{} {ADDR}\n", txid()));
    assert_eq!(pipe.join().unwrap(), "9\n");
    Ok(())
}

#[tokio::test]
async fn shutdown_interrupts_the_sleep() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut s = settings(NotifyLevel::Unlocked, 1);
    s.poll_interval = Duration::from_secs(3600);
    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![entry(ADDR, "0000000000000000", 1, 5)])]),
        MemLedger::default(),
        Registry::new(dir.path(), 0o750, 0o640),
        s,
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), watcher.run(&txid(), &cancel)).await??;
    assert_eq!(outcome, WatchOutcome::Cancelled { polls: 1 });
    assert!(!dir.path().join("transfer").join(ADDR).exists());
    Ok(())
}

#[tokio::test]
async fn async_delivery_returns_before_any_reader() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    let channel = registry.keyed(Category::Transfer, ADDR);
    assert_eq!(registry.ensure(&channel)?, Ensured::Created);
    assert_eq!(registry.ensure(&channel)?, Ensured::AlreadyExists);

    let started = Instant::now();
    let handle = deliver_async(&channel, "77");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(channel.path().exists(), "nothing consumed yet");

    let reader = read_when_ready(channel.path().to_owned());
    handle.wait().await?;
    assert_eq!(reader.join().unwrap(), "77\n");
    assert!(!channel.path().exists());

    // strict removal now fails, idempotent removal does not
    assert!(channel.destroy().is_err());
    assert!(!registry.discard(&channel)?);
    Ok(())
}

#[tokio::test]
async fn unusable_ledger_file_does_not_stop_delivery() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join(mnp::store::file_ledger::LEDGER_FILE))?;

    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![entry(ADDR, "0000000000000000", 8, 0)])]),
        mnp::FileLedger::in_workdir(dir.path()),
        Registry::new(dir.path(), 0o750, 0o640),
        settings(NotifyLevel::Txpool, 1),
    );
    let pipe = dir.path().join("transfer").join(ADDR);
    let reader = read_when_ready(pipe.clone());

    assert_eq!(
        watcher.run(&txid(), &CancellationToken::new()).await?,
        WatchOutcome::Delivered {
            polls: 1,
            channels: vec![pipe],
        }
    );
    assert_eq!(reader.join().unwrap(), "8\n");
    Ok(())
}

#[tokio::test]
async fn unread_alert_does_not_hold_up_polling() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let registry = Registry::new(dir.path(), 0o750, 0o640);
    mnp::workdir::init(&registry)?;

    // flagged on every poll, never unlocked; nobody reads double_spend_alert
    let mut flagged = entry(ADDR, "0000000000000000", 9, 0);
    flagged["double_spend_seen"] = json!(true);
    let watcher = Watcher::new(
        ScriptedWallet::new(vec![reply(vec![flagged])]),
        MemLedger::default(),
        registry,
        settings(NotifyLevel::Unlocked, 1),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(TICK * 60).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), watcher.run(&txid(), &cancel)).await??;
    match outcome {
        WatchOutcome::Cancelled { polls } => assert!(polls >= 5, "only {polls} polls"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(watcher.alerts().outstanding(), 1);
    let tally = watcher.alerts().settle(Duration::from_millis(20)).await;
    assert_eq!(tally.abandoned, 1);
    Ok(())
}
