//! Monitor orchestration: platform setup, handler registration, observer run.

use gpio_hal::{GpioPlatform, LineId, SimulatedGpio};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

use crate::config_file::{Backend, IsrmondConfig};
use crate::dispatch::DispatchBinding;
use crate::error::{IsrError, Result};
use crate::observer::{Observer, ObserverStats};
use crate::shutdown::ShutdownFlag;

/// Outcome of a monitor run that ended by shutdown request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSummary {
    /// Final count for every armed line, in line order
    pub final_counts: Vec<(LineId, u64)>,
    pub stats: ObserverStats,
}

impl MonitorSummary {
    pub fn count(&self, line: LineId) -> Option<u64> {
        self.final_counts
            .iter()
            .find(|(l, _)| *l == line)
            .map(|(_, count)| *count)
    }
}

/// Builds the backend selected by the configuration.
pub fn build_platform(config: &IsrmondConfig) -> Result<Box<dyn GpioPlatform>> {
    match config.platform.backend {
        Backend::Simulated => Ok(Box::new(SimulatedGpio::new(
            config.platform.pin_map.clone(),
        ))),
        #[cfg(target_os = "linux")]
        Backend::Sysfs => Ok(Box::new(gpio_hal::SysfsGpio::new(
            config.platform.sysfs_root.clone(),
            config.platform.pin_map.clone(),
        ))),
        #[cfg(not(target_os = "linux"))]
        Backend::Sysfs => Err(IsrError::Configuration(
            "the sysfs backend is only available on Linux".to_string(),
        )),
    }
}

/// Sets up `platform`, arms every configured line and runs the observer
/// until `shutdown` is requested.
///
/// Setup failure is returned before any registration is attempted.
pub async fn run_monitor<P, W>(
    platform: &mut P,
    config: &IsrmondConfig,
    shutdown: Arc<ShutdownFlag>,
    out: W,
) -> Result<MonitorSummary>
where
    P: GpioPlatform + ?Sized,
    W: Write,
{
    platform.setup().map_err(IsrError::Setup)?;
    info!(backend = platform.name(), "GPIO platform ready");

    let lines = config.line_ids();
    let binding = DispatchBinding::new(config.platform.pin_map.len(), config.lines.edge);
    binding.arm(platform, &lines)?;

    let counters = binding.counters();
    let mut observer = Observer::new(
        counters.clone(),
        binding.edge_notify(),
        out,
        config.poll_interval(),
    );
    let stats = observer.run(&shutdown).await?;

    let final_counts: Vec<(LineId, u64)> = lines
        .iter()
        .map(|&line| (line, counters.get(line).unwrap_or(0)))
        .collect();
    for (line, count) in &final_counts {
        info!(%line, count, "Final edge count");
    }

    Ok(MonitorSummary {
        final_counts,
        stats,
    })
}
