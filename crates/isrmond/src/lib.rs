//! GPIO edge-interrupt monitor daemon
//!
//! Arms one edge-triggered interrupt handler per monitored GPIO line. Each
//! handler bumps an atomic per-line counter; an observer loop on the main
//! task reports every counter change on stdout until a termination signal
//! sets the shutdown flag.
//!
//! Data flows one way: hardware edge → platform watcher → dispatch callback
//! → counter set → observer → console.

pub mod config_file;
pub mod counters;
pub mod daemon;
pub mod dispatch;
pub mod error;
pub mod observer;
pub mod shutdown;

pub use config_file::{Backend, IsrmondConfig, DEFAULT_CONFIG_PATH};
pub use counters::CounterSet;
pub use daemon::{build_platform, run_monitor, MonitorSummary};
pub use dispatch::DispatchBinding;
pub use error::*;
pub use observer::{Observer, ObserverState, ObserverStats, Report, WAITING_PROMPT};
pub use shutdown::{install_signal_handlers, ShutdownFlag};
#[cfg(unix)]
pub use shutdown::TERMINATION_SIGNALS;
