//! Termination signals turned into a cancellation token.
use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Cancel the returned token on the first SIGHUP, SIGINT, SIGQUIT or SIGTERM.
///
/// Must be called from inside a runtime. The handler task only cancels; the
/// loops holding the token decide what to do.
pub fn install() -> io::Result<CancellationToken> {
    let mut hup = signal(SignalKind::hangup())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut term = signal(SignalKind::terminate())?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        let name = tokio::select! {
            _ = hup.recv() => "SIGHUP",
            _ = int.recv() => "SIGINT",
            _ = quit.recv() => "SIGQUIT",
            _ = term.recv() => "SIGTERM",
        };
        tracing::info!(signal = name, "shutting down");
        trigger.cancel();
    });
    Ok(token)
}
