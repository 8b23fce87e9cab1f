//! Interrupt dispatch binding.
//!
//! Arms each monitored line on the platform with a callback that bumps the
//! line's counter and wakes the observer. The callback runs on whatever
//! thread the platform delivers interrupts on; it only does an atomic add and
//! a non-blocking notify.

use gpio_hal::{EdgeCallback, EdgeMode, GpioPlatform, LineId};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::counters::CounterSet;
use crate::error::{IsrError, Result};

#[derive(Debug)]
pub struct DispatchBinding {
    counters: Arc<CounterSet>,
    edge_notify: Arc<Notify>,
    edge: EdgeMode,
}

impl DispatchBinding {
    /// Creates a binding with one counter per line of a `lines`-wide pin map.
    pub fn new(lines: usize, edge: EdgeMode) -> Self {
        Self {
            counters: Arc::new(CounterSet::new(lines)),
            edge_notify: Arc::new(Notify::new()),
            edge,
        }
    }

    pub fn counters(&self) -> Arc<CounterSet> {
        self.counters.clone()
    }

    /// Notification raised after every counted edge.
    pub fn edge_notify(&self) -> Arc<Notify> {
        self.edge_notify.clone()
    }

    /// The interrupt handler installed on every line.
    pub fn callback(&self) -> EdgeCallback {
        let counters = self.counters.clone();
        let edge_notify = self.edge_notify.clone();
        Arc::new(move |line: LineId| {
            if counters.increment(line) {
                edge_notify.notify_one();
            }
        })
    }

    /// Registers the handler on every line in `lines`, in order.
    ///
    /// Stops at the first failure. Edges that arrive on a line before its
    /// own registration completes are not counted.
    pub fn arm<P: GpioPlatform + ?Sized>(&self, platform: &mut P, lines: &[LineId]) -> Result<usize> {
        for &line in lines {
            platform
                .register(line, self.edge, self.callback())
                .map_err(|source| IsrError::Registration { line, source })?;
            debug!(%line, edge = %self.edge, "Interrupt handler registered");
        }

        info!(
            backend = platform.name(),
            lines = lines.len(),
            edge = %self.edge,
            "Interrupt handlers armed"
        );
        Ok(lines.len())
    }
}
