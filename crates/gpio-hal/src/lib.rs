//! GPIO line setup and edge-interrupt registration.
//!
//! This crate is the platform half of `isrmond`: it knows how to prepare a
//! GPIO subsystem, arm a line for edge-triggered interrupts and call back into
//! the daemon whenever the armed transition is seen.
//!
//! # Architecture
//!
//! - [`types`]: line identifiers, edge modes and the logical-to-kernel pin map
//! - [`error`]: error type shared by every backend
//! - [`platform`]: the [`GpioPlatform`] trait implemented by each backend
//! - [`sim`]: in-process backend whose edges are injected by the caller
//! - `sysfs`: Linux backend built on `/sys/class/gpio` (Linux only)
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use gpio_hal::{EdgeMode, GpioPlatform, LineId, SimulatedGpio, Transition};
//!
//! let mut gpio = SimulatedGpio::default();
//! gpio.setup().unwrap();
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = hits.clone();
//! gpio.register(LineId::new(0), EdgeMode::Falling, Arc::new(move |_| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! }))
//! .unwrap();
//!
//! gpio.fire(LineId::new(0), Transition::Falling);
//! assert_eq!(hits.load(Ordering::Relaxed), 1);
//! ```

pub mod error;
pub mod platform;
pub mod sim;
#[cfg(target_os = "linux")]
pub mod sysfs;
pub mod types;

pub use error::{HalError, HalResult};
pub use platform::{EdgeCallback, GpioPlatform};
pub use sim::SimulatedGpio;
#[cfg(target_os = "linux")]
pub use sysfs::SysfsGpio;
pub use types::{EdgeMode, GpioNumber, LineId, PinMap, Transition};
