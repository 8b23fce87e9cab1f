//! Linux GPIO backend on top of the sysfs interface.
//!
//! Arming a line exports it under `/sys/class/gpio`, sets `direction` to `in`
//! and `edge` to the requested mode, then starts a watcher thread that
//! `poll(2)`s the line's `value` file. The kernel flags `POLLPRI` on that file
//! for every armed transition; the watcher rewinds and reads the value to
//! re-arm the notification before invoking the callback.
//!
//! Watchers wake at least every poll timeout to check the stop flag, and are
//! joined when the backend is dropped. Exported lines are left exported.

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{HalError, HalResult};
use crate::platform::{EdgeCallback, GpioPlatform};
use crate::types::{EdgeMode, GpioNumber, LineId, PinMap};

/// Default sysfs GPIO class directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Upper bound on how long a watcher goes without checking the stop flag.
const WATCH_TIMEOUT_MS: u16 = 100;

#[derive(Debug)]
struct Watcher {
    gpio: GpioNumber,
    edge: EdgeMode,
    handle: Option<JoinHandle<()>>,
}

/// sysfs-backed GPIO platform.
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    pin_map: PinMap,
    initialized: bool,
    stop: Arc<AtomicBool>,
    watchers: BTreeMap<LineId, Watcher>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>, pin_map: PinMap) -> Self {
        Self {
            root: root.into(),
            pin_map,
            initialized: false,
            stop: Arc::new(AtomicBool::new(false)),
            watchers: BTreeMap::new(),
        }
    }

    /// Directory of an exported GPIO.
    pub fn gpio_dir(&self, gpio: GpioNumber) -> PathBuf {
        self.root.join(format!("gpio{gpio}"))
    }

    fn export(&self, gpio: GpioNumber) -> HalResult<PathBuf> {
        let dir = self.gpio_dir(gpio);
        if !dir.exists() {
            let export = self.root.join("export");
            fs::write(&export, gpio.to_string()).map_err(|e| HalError::io(&export, e))?;
            debug!(%gpio, "Exported GPIO");
        }
        Ok(dir)
    }

    /// Signals every watcher to exit and waits for them.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        for (line, watcher) in self.watchers.iter_mut() {
            if let Some(handle) = watcher.handle.take() {
                if handle.join().is_err() {
                    warn!(%line, gpio = %watcher.gpio, "GPIO watcher panicked");
                } else {
                    debug!(%line, gpio = %watcher.gpio, edge = %watcher.edge, "GPIO watcher stopped");
                }
            }
        }
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT, PinMap::default())
    }
}

impl GpioPlatform for SysfsGpio {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn setup(&mut self) -> HalResult<()> {
        let export = self.root.join("export");
        fs::metadata(&export).map_err(|e| {
            HalError::SetupFailed(format!("cannot access {}: {}", export.display(), e))
        })?;

        self.initialized = true;
        info!(root = %self.root.display(), lines = self.pin_map.len(), "sysfs GPIO initialized");
        Ok(())
    }

    fn register(&mut self, line: LineId, edge: EdgeMode, callback: EdgeCallback) -> HalResult<()> {
        if !self.initialized {
            return Err(HalError::NotInitialized);
        }
        let gpio = self.pin_map.gpio(line)?;
        if self.watchers.contains_key(&line) {
            return Err(HalError::LineBusy(line));
        }

        let dir = self.export(gpio)?;
        write_attr(&dir.join("direction"), "in")?;
        write_attr(&dir.join("edge"), edge.as_str())?;

        let value_path = dir.join("value");
        let mut value = File::open(&value_path).map_err(|e| HalError::io(&value_path, e))?;
        // Clear any interrupt that is already pending.
        let mut scratch = [0u8; 8];
        value
            .read(&mut scratch)
            .map_err(|e| HalError::io(&value_path, e))?;

        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name(format!("gpio{gpio}-isr"))
            .spawn(move || watch_line(value, line, callback, stop))
            .map_err(|e| HalError::io(&value_path, e))?;

        self.watchers.insert(
            line,
            Watcher {
                gpio,
                edge,
                handle: Some(handle),
            },
        );
        info!(%line, %gpio, %edge, "GPIO line armed");
        Ok(())
    }

    fn armed_lines(&self) -> Vec<LineId> {
        self.watchers.keys().copied().collect()
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn write_attr(path: &Path, value: &str) -> HalResult<()> {
    fs::write(path, value).map_err(|e| HalError::io(path, e))
}

/// What one `poll(2)` round on a value file amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    /// `POLLPRI` raised: an armed transition happened.
    Fired,
    /// Ready without `POLLPRI`, as plain files and error states are.
    Spurious,
    /// Timed out or interrupted; poll again straight away.
    Idle,
}

fn classify_poll(result: nix::Result<i32>, revents: Option<PollFlags>) -> nix::Result<PollOutcome> {
    match result {
        Ok(0) | Err(Errno::EINTR) => Ok(PollOutcome::Idle),
        Ok(_) if revents.is_some_and(|events| events.contains(PollFlags::POLLPRI)) => {
            Ok(PollOutcome::Fired)
        }
        Ok(_) => Ok(PollOutcome::Spurious),
        Err(e) => Err(e),
    }
}

fn watch_line(mut value: File, line: LineId, callback: EdgeCallback, stop: Arc<AtomicBool>) {
    let mut buf = [0u8; 8];

    while !stop.load(Ordering::Acquire) {
        let outcome = {
            let mut fds = [PollFd::new(
                value.as_fd(),
                PollFlags::POLLPRI | PollFlags::POLLERR,
            )];
            let result = poll(&mut fds, PollTimeout::from(WATCH_TIMEOUT_MS));
            classify_poll(result, fds[0].revents())
        };

        match outcome {
            Ok(PollOutcome::Fired) => {}
            Ok(PollOutcome::Idle) => continue,
            Ok(PollOutcome::Spurious) => {
                thread::sleep(Duration::from_millis(u64::from(WATCH_TIMEOUT_MS)));
                continue;
            }
            Err(e) => {
                warn!(%line, error = %e, "poll on GPIO value failed, watcher exiting");
                return;
            }
        }

        if let Err(e) = value
            .seek(SeekFrom::Start(0))
            .and_then(|_| value.read(&mut buf))
        {
            warn!(%line, error = %e, "Failed to re-arm GPIO value, watcher exiting");
            return;
        }
        callback(line);
    }
}
