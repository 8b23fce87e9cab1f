//! The backend trait every GPIO platform implements.

use std::sync::Arc;

use crate::error::HalResult;
use crate::types::{EdgeMode, LineId};

/// Interrupt callback installed on a line.
///
/// Backends invoke it from their own threads with no ordering guarantee
/// relative to the caller, so it must be cheap and must never block.
pub type EdgeCallback = Arc<dyn Fn(LineId) + Send + Sync + 'static>;

/// A GPIO subsystem able to deliver edge interrupts.
///
/// `setup` must succeed before any call to `register`. Registration is
/// one-shot: a line carries at most one handler for the lifetime of the
/// backend.
pub trait GpioPlatform: Send {
    /// Short backend name for logging.
    fn name(&self) -> &'static str;

    /// Initializes the GPIO subsystem.
    fn setup(&mut self) -> HalResult<()>;

    /// Arms `line` so that `callback(line)` runs on every transition
    /// accepted by `edge`.
    fn register(&mut self, line: LineId, edge: EdgeMode, callback: EdgeCallback) -> HalResult<()>;

    /// Lines that currently carry a handler, in ascending order.
    fn armed_lines(&self) -> Vec<LineId>;
}

impl<P: GpioPlatform + ?Sized> GpioPlatform for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn setup(&mut self) -> HalResult<()> {
        (**self).setup()
    }

    fn register(&mut self, line: LineId, edge: EdgeMode, callback: EdgeCallback) -> HalResult<()> {
        (**self).register(line, edge, callback)
    }

    fn armed_lines(&self) -> Vec<LineId> {
        (**self).armed_lines()
    }
}
