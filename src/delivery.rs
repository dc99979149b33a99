//! Delivery agent: write one payload to a named pipe.
//!
//! Opening a FIFO for writing blocks until a reader attaches, possibly forever,
//! so every delivery runs on its own OS thread. The caller gets a
//! [`DeliveryHandle`] back at once and may drop it or await it.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{timeout_at, Instant};

use crate::channel::Channel;
use crate::error::ChannelError;

/// A delivery in flight.
#[derive(Debug)]
pub struct DeliveryHandle {
    path: PathBuf,
    done: oneshot::Receiver<Result<(), ChannelError>>,
}

impl DeliveryHandle {
    /// Channel being written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for the worker to finish.
    pub async fn wait(self) -> Result<(), ChannelError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::WorkerLost { path: self.path }),
        }
    }
}

/// Hand `payload` to a detached worker that writes it to `channel`.
///
/// Returns immediately. The worker opens the pipe (blocking until a reader
/// shows up), writes `payload\n`, closes it, and removes the pipe when the
/// channel is single-use.
pub fn deliver_async(channel: &Channel, payload: impl Into<String>) -> DeliveryHandle {
    let path = channel.path().to_owned();
    let line = format!("{}\n", payload.into());
    let (tx, rx) = oneshot::channel();

    let target = channel.clone();
    let spawned = thread::Builder::new()
        .name("mnp-delivery".into())
        .spawn(move || {
            let result = write_once(&target, &line);
            match &result {
                Ok(()) => tracing::debug!(path = %target.path().display(), "delivered"),
                Err(e) => tracing::error!(path = %target.path().display(), error = %e, "delivery failed"),
            }
            // nobody listening is fine
            let _ = tx.send(result);
        });
    if let Err(e) = spawned {
        tracing::error!(path = %path.display(), error = %e, "could not start delivery worker");
    }

    DeliveryHandle { path, done: rx }
}

/// Write `payload` to `channel` and wait until the reader took it.
pub async fn deliver_sync(channel: &Channel, payload: impl Into<String>) -> Result<(), ChannelError> {
    deliver_async(channel, payload).wait().await
}

fn write_once(channel: &Channel, line: &str) -> Result<(), ChannelError> {
    let path = channel.path();
    let mut pipe = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|source| ChannelError::Open {
            path: path.to_owned(),
            source,
        })?;
    pipe.write_all(line.as_bytes())
        .and_then(|()| pipe.flush())
        .map_err(|source| ChannelError::Write {
            path: path.to_owned(),
            source,
        })?;
    drop(pipe);

    if channel.category().is_single_use() {
        channel.destroy()?;
    }
    Ok(())
}

/// Tally of [`settle`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Settled {
    /// Workers that wrote their payload.
    pub delivered: usize,
    /// Workers that failed.
    pub failed: usize,
    /// Workers still waiting for a reader when the linger ran out.
    pub abandoned: usize,
}

/// Wait up to `linger` for outstanding deliveries before the process exits.
///
/// Workers still blocked afterwards are abandoned; they die with the process.
pub async fn settle(handles: Vec<DeliveryHandle>, linger: Duration) -> Settled {
    let deadline = Instant::now() + linger;
    let mut tally = Settled::default();
    for handle in handles {
        let path = handle.path.clone();
        match timeout_at(deadline, handle.wait()).await {
            Ok(Ok(())) => tally.delivered += 1,
            Ok(Err(_)) => tally.failed += 1,
            Err(_) => {
                tracing::info!(path = %path.display(), "no reader attached, giving up");
                tally.abandoned += 1;
            }
        }
    }
    tally
}
