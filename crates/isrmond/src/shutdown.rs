//! Termination flag and process signal handling.
//!
//! Every recognised signal does exactly one thing: set the flag. The observer
//! loop notices the flag at its next iteration boundary and performs the
//! actual shutdown. Signals arrive through tokio signal streams, so the code
//! reacting to them runs as an ordinary task rather than in signal context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tracing::{debug, info};

#[cfg(unix)]
use crate::error::{IsrError, Result};
#[cfg(unix)]
use nix::sys::signal::Signal;
#[cfg(unix)]
use tokio::task::JoinHandle;

/// Signals that request a graceful shutdown.
#[cfg(unix)]
pub const TERMINATION_SIGNALS: [Signal; 9] = [
    Signal::SIGTERM,
    Signal::SIGHUP,
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTRAP,
    Signal::SIGABRT,
    Signal::SIGALRM,
    Signal::SIGUSR1,
    Signal::SIGUSR2,
];

/// Process-wide shutdown request.
///
/// False at start, set once, never reset.
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown. Returns true only for the first request.
    pub fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_one();
        }
        first
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Completes after a request, or immediately if one was already made.
    ///
    /// Meant for a single waiter: a request made while nobody waits is kept
    /// as one pending wake-up.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

/// Installs a listener for every signal in [`TERMINATION_SIGNALS`].
///
/// Must be called from within a tokio runtime. The returned tasks live for
/// the rest of the process; repeated signals keep setting the same flag.
#[cfg(unix)]
pub fn install_signal_handlers(flag: Arc<ShutdownFlag>) -> Result<Vec<JoinHandle<()>>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut handles = Vec::with_capacity(TERMINATION_SIGNALS.len());
    for sig in TERMINATION_SIGNALS {
        let signo = sig as i32;
        let mut stream = signal(SignalKind::from_raw(signo)).map_err(|e| {
            IsrError::Signal(format!("Failed to install {} handler: {}", sig.as_str(), e))
        })?;
        let flag = flag.clone();

        handles.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                info!(signal = signo, name = sig.as_str(), "Received signal {}", signo);
                if !flag.request() {
                    debug!(name = sig.as_str(), "Shutdown already requested");
                }
            }
        }));
    }

    debug!(count = handles.len(), "Signal handlers installed");
    Ok(handles)
}

/// Requests shutdown on Ctrl-C where unix signals are unavailable.
#[cfg(not(unix))]
pub fn install_signal_handlers(
    flag: Arc<ShutdownFlag>,
) -> crate::error::Result<Vec<tokio::task::JoinHandle<()>>> {
    Ok(vec![tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            flag.request();
        }
    })])
}
