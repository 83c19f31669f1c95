//! Operating-system signal watching for the application shell.
//!
//! The watcher lives on a scoped thread driving a single-threaded tokio
//! runtime. Registered signals are forwarded through a channel of capacity
//! one; the first one delivered invokes the handler, later ones are dropped.

use std::fmt;
use std::panic;
use std::sync::mpsc as std_mpsc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Signals an application can subscribe to.
///
/// Only [`Signal::Interrupt`] is delivered on platforms without Unix signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT`, Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGHUP`.
    Hangup,
    /// `SIGQUIT`.
    Quit,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
            Self::Quit => "SIGQUIT",
            Self::User1 => "SIGUSR1",
            Self::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;

        match self {
            Self::Interrupt => SignalKind::interrupt(),
            Self::Terminate => SignalKind::terminate(),
            Self::Hangup => SignalKind::hangup(),
            Self::Quit => SignalKind::quit(),
            Self::User1 => SignalKind::user_defined1(),
            Self::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs `body` while `signals` are watched. `handler` is called at most once,
/// on the watcher thread. The watcher is stopped and joined before this
/// returns.
pub(crate) fn watch<R, H, B>(signals: &[Signal], handler: H, body: B) -> R
where
    H: Fn(Signal) + Send + Sync,
    B: FnOnce() -> R,
{
    if signals.is_empty() {
        return body();
    }

    thread::scope(|scope| {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<()>();
        let handler = &handler;

        let watcher = scope.spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!(error = %err, "signal watcher could not start");
                    let _ = ready_tx.send(());
                    return;
                }
            };

            runtime.block_on(async move {
                let (tx, mut rx) = mpsc::channel::<Signal>(1);
                for &signal in signals {
                    listen(signal, tx.clone());
                }
                drop(tx);
                let _ = ready_tx.send(());

                tokio::select! {
                    _ = shutdown_rx => {}
                    Some(signal) = rx.recv() => {
                        debug!(signal = %signal, "signal received");
                        handler(signal);
                    }
                }
            });
        });

        let _ = ready_rx.recv();
        let result = body();

        let _ = shutdown_tx.send(());
        if let Err(payload) = watcher.join() {
            panic::resume_unwind(payload);
        }
        result
    })
}

/// Spawns a task forwarding every delivery of `signal` into `tx`.
#[cfg(unix)]
fn listen(signal: Signal, tx: mpsc::Sender<Signal>) {
    let mut stream = match tokio::signal::unix::signal(signal.kind()) {
        Ok(stream) => stream,
        Err(err) => {
            warn!(signal = %signal, error = %err, "signal could not be registered");
            return;
        }
    };
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            let _ = tx.try_send(signal);
        }
    });
}

#[cfg(not(unix))]
fn listen(signal: Signal, tx: mpsc::Sender<Signal>) {
    if signal != Signal::Interrupt {
        warn!(signal = %signal, "signal is not supported on this platform");
        return;
    }
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.try_send(signal);
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn test_body_result_is_returned() {
        let called = AtomicBool::new(false);
        let result = watch(
            &[Signal::User2],
            |_| called.store(true, Ordering::SeqCst),
            || 42,
        );
        assert_eq!(result, 42);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_without_signals_runs_body_directly() {
        assert_eq!(watch(&[], |_| unreachable!(), || "done"), "done");
    }

    #[test]
    fn test_display() {
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
        assert_eq!(Signal::User1.as_str(), "SIGUSR1");
    }
}
