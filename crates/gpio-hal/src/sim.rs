//! In-process GPIO backend.
//!
//! `SimulatedGpio` behaves like a real platform from the daemon's point of
//! view, but edges are injected by calling [`SimulatedGpio::fire`] from any
//! thread. Handles are cheap clones sharing one state, so a test can keep a
//! handle while the daemon owns another.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HalError, HalResult};
use crate::platform::{EdgeCallback, GpioPlatform};
use crate::types::{EdgeMode, LineId, PinMap, Transition};

struct Handler {
    edge: EdgeMode,
    callback: EdgeCallback,
}

#[derive(Default)]
struct SimState {
    pin_map: PinMap,
    setup_failure: Option<String>,
    initialized: bool,
    handlers: BTreeMap<LineId, Handler>,
    registration_attempts: usize,
    unarmed_edges: u64,
}

/// Simulated GPIO platform.
#[derive(Clone, Default)]
pub struct SimulatedGpio {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedGpio {
    pub fn new(pin_map: PinMap) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                pin_map,
                ..SimState::default()
            })),
        }
    }

    /// A backend whose `setup` always fails with `reason`.
    pub fn failing_setup(reason: impl Into<String>) -> Self {
        let sim = Self::default();
        sim.state.lock().setup_failure = Some(reason.into());
        sim
    }

    /// Delivers one transition on `line`.
    ///
    /// Returns true if a handler accepted it. Transitions on lines without a
    /// handler are dropped and counted in [`Self::unarmed_edges`].
    pub fn fire(&self, line: LineId, transition: Transition) -> bool {
        let callback = {
            let mut state = self.state.lock();
            let armed = state
                .handlers
                .get(&line)
                .map(|handler| (handler.edge, handler.callback.clone()));
            match armed {
                Some((edge, callback)) if edge.matches(transition) => callback,
                Some(_) => return false,
                None => {
                    state.unarmed_edges += 1;
                    return false;
                }
            }
        };

        // Run outside the lock; handlers may call back into the backend.
        callback(line);
        true
    }

    /// Delivers `count` falling edges on `line`, returning how many were accepted.
    pub fn falling_edges(&self, line: LineId, count: usize) -> usize {
        (0..count)
            .filter(|_| self.fire(line, Transition::Falling))
            .count()
    }

    /// Delivers `count` full pulses (falling then rising) on `line`.
    pub fn pulse(&self, line: LineId, count: usize) -> usize {
        let mut accepted = 0;
        for _ in 0..count {
            accepted += usize::from(self.fire(line, Transition::Falling));
            accepted += usize::from(self.fire(line, Transition::Rising));
        }
        accepted
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    /// Number of `register` calls made, successful or not.
    pub fn registration_attempts(&self) -> usize {
        self.state.lock().registration_attempts
    }

    /// Transitions delivered to lines that had no handler yet.
    pub fn unarmed_edges(&self) -> u64 {
        self.state.lock().unarmed_edges
    }
}

impl fmt::Debug for SimulatedGpio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedGpio")
            .field("initialized", &state.initialized)
            .field("armed", &state.handlers.keys().collect::<Vec<_>>())
            .field("unarmed_edges", &state.unarmed_edges)
            .finish()
    }
}

impl GpioPlatform for SimulatedGpio {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn setup(&mut self) -> HalResult<()> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.setup_failure {
            return Err(HalError::SetupFailed(reason.clone()));
        }
        state.initialized = true;
        info!(lines = state.pin_map.len(), "Simulated GPIO initialized");
        Ok(())
    }

    fn register(&mut self, line: LineId, edge: EdgeMode, callback: EdgeCallback) -> HalResult<()> {
        let mut state = self.state.lock();
        state.registration_attempts += 1;

        if !state.initialized {
            return Err(HalError::NotInitialized);
        }
        state.pin_map.gpio(line)?;
        if state.handlers.contains_key(&line) {
            return Err(HalError::LineBusy(line));
        }

        state.handlers.insert(line, Handler { edge, callback });
        debug!(%line, %edge, "Simulated line armed");
        Ok(())
    }

    fn armed_lines(&self) -> Vec<LineId> {
        self.state.lock().handlers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback() -> (Arc<AtomicUsize>, EdgeCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let callback: EdgeCallback = Arc::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        (hits, callback)
    }

    #[test]
    fn test_register_requires_setup() {
        let mut sim = SimulatedGpio::default();
        let (_, cb) = counting_callback();
        assert!(matches!(
            sim.register(LineId::new(0), EdgeMode::Falling, cb),
            Err(HalError::NotInitialized)
        ));
        assert_eq!(sim.registration_attempts(), 1);
    }

    #[test]
    fn test_setup_failure() {
        let mut sim = SimulatedGpio::failing_setup("no such device");
        let err = sim.setup().unwrap_err();
        assert_eq!(err.to_string(), "GPIO setup failed: no such device");
        assert!(!sim.is_initialized());
    }

    #[test]
    fn test_falling_mode_ignores_rising() {
        let mut sim = SimulatedGpio::default();
        sim.setup().unwrap();
        let (hits, cb) = counting_callback();
        sim.register(LineId::new(3), EdgeMode::Falling, cb).unwrap();

        assert_eq!(sim.pulse(LineId::new(3), 4), 4);
        assert_eq!(hits.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_both_mode_counts_every_transition() {
        let mut sim = SimulatedGpio::default();
        sim.setup().unwrap();
        let (hits, cb) = counting_callback();
        sim.register(LineId::new(1), EdgeMode::Both, cb).unwrap();

        assert_eq!(sim.pulse(LineId::new(1), 3), 6);
        assert_eq!(hits.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut sim = SimulatedGpio::default();
        sim.setup().unwrap();
        let (_, cb) = counting_callback();
        sim.register(LineId::new(2), EdgeMode::Falling, cb.clone()).unwrap();
        assert!(matches!(
            sim.register(LineId::new(2), EdgeMode::Falling, cb),
            Err(HalError::LineBusy(line)) if line == LineId::new(2)
        ));
    }

    #[test]
    fn test_line_outside_map_rejected() {
        let mut sim = SimulatedGpio::default();
        sim.setup().unwrap();
        let (_, cb) = counting_callback();
        assert!(matches!(
            sim.register(LineId::new(8), EdgeMode::Falling, cb),
            Err(HalError::InvalidLine { lines: 8, .. })
        ));
        assert!(sim.armed_lines().is_empty());
    }

    #[test]
    fn test_unarmed_edges_are_dropped() {
        let mut sim = SimulatedGpio::default();
        sim.setup().unwrap();
        assert_eq!(sim.falling_edges(LineId::new(5), 2), 0);
        assert_eq!(sim.unarmed_edges(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let mut sim = SimulatedGpio::default();
        let handle = sim.clone();
        sim.setup().unwrap();
        let (hits, cb) = counting_callback();
        sim.register(LineId::new(0), EdgeMode::Falling, cb).unwrap();

        assert!(handle.is_initialized());
        assert_eq!(handle.armed_lines(), vec![LineId::new(0)]);
        handle.falling_edges(LineId::new(0), 2);
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }
}
