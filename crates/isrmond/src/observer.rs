//! Observer loop: detects and reports counter changes.
//!
//! The observer keeps a private snapshot of the counter set. Each pass
//! compares live values against the snapshot, prints one line per changed
//! counter and copies the new value into the snapshot. Between passes it
//! sleeps until an edge wake-up, a shutdown request or the poll interval,
//! whichever comes first.
//!
//! ```text
//!            change seen               reports written
//!  Waiting ─────────────▶ Reporting ─────────────────▶ Waiting
//!     │
//!     └── shutdown flag set (checked every iteration) ──▶ Terminated
//! ```

use gpio_hal::LineId;
use std::fmt;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::counters::CounterSet;
use crate::error::Result;
use crate::shutdown::ShutdownFlag;

/// Prompt printed every time the observer starts waiting for edges.
pub const WAITING_PROMPT: &str = "Waiting ... ";

/// One detected counter change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub line: LineId,
    pub count: u64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " Int on pin {}: Counter: {:5}", self.line, self.count)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    /// No change since the last snapshot
    Waiting,
    /// At least one counter changed and is being reported
    Reporting,
    /// Shutdown observed; absorbing
    Terminated,
}

/// Totals gathered over one run of the observer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverStats {
    /// Report lines written
    pub reports: u64,
    /// `Waiting ... ` prompts written
    pub prompts: u64,
    /// Idle periods cut short by an edge notification that led to a report
    pub edge_wakeups: u64,
}

pub struct Observer<W: Write> {
    counters: Arc<CounterSet>,
    snapshot: Vec<u64>,
    edge_notify: Arc<Notify>,
    out: W,
    poll_interval: Duration,
    state: ObserverState,
    stats: ObserverStats,
}

impl<W: Write> Observer<W> {
    pub fn new(
        counters: Arc<CounterSet>,
        edge_notify: Arc<Notify>,
        out: W,
        poll_interval: Duration,
    ) -> Self {
        let snapshot = vec![0; counters.len()];
        Self {
            counters,
            snapshot,
            edge_notify,
            out,
            poll_interval,
            state: ObserverState::Waiting,
            stats: ObserverStats::default(),
        }
    }

    pub fn state(&self) -> ObserverState {
        self.state
    }

    pub fn stats(&self) -> ObserverStats {
        self.stats
    }

    /// Last reported value per line.
    pub fn snapshot(&self) -> &[u64] {
        &self.snapshot
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Compares live counters with the snapshot and takes in every change.
    ///
    /// Unchanged lines produce no report.
    pub fn poll_once(&mut self) -> Vec<Report> {
        let mut reports = Vec::new();
        let lines = (0..=u8::MAX).map(LineId::new);
        for (line, (seen, live)) in lines.zip(self.snapshot.iter_mut().zip(self.counters.values())) {
            if *seen != live {
                *seen = live;
                reports.push(Report { line, count: live });
            }
        }
        reports
    }

    /// Runs until `shutdown` is requested.
    ///
    /// The flag is checked at the top of every iteration, so shutdown takes
    /// at most one poll interval. Nothing is printed once it is set.
    pub async fn run(&mut self, shutdown: &ShutdownFlag) -> Result<ObserverStats> {
        info!(
            lines = self.snapshot.len(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Observer started"
        );

        'waiting: while !shutdown.is_requested() {
            self.state = ObserverState::Waiting;
            write!(self.out, "{WAITING_PROMPT}")?;
            self.out.flush()?;
            self.stats.prompts += 1;
            let mut woken_by_edge = false;

            loop {
                if shutdown.is_requested() {
                    break 'waiting;
                }

                let reports = self.poll_once();
                if !reports.is_empty() {
                    self.state = ObserverState::Reporting;
                    if woken_by_edge {
                        self.stats.edge_wakeups += 1;
                    }
                    for report in &reports {
                        writeln!(self.out, "{report}")?;
                        debug!(line = %report.line, count = report.count, "Edge count changed");
                    }
                    self.out.flush()?;
                    self.stats.reports += reports.len() as u64;
                    continue 'waiting;
                }

                woken_by_edge = self.idle(shutdown).await;
            }
        }

        self.state = ObserverState::Terminated;
        info!(
            reports = self.stats.reports,
            edge_wakeups = self.stats.edge_wakeups,
            "Observer stopped"
        );
        Ok(self.stats)
    }

    /// Returns true when an edge notification ended the wait.
    ///
    /// A permit left by edges that an earlier pass already reported also
    /// counts as an edge here, so callers only trust it when the next pass
    /// finds a change.
    async fn idle(&self, shutdown: &ShutdownFlag) -> bool {
        tokio::select! {
            _ = self.edge_notify.notified() => true,
            _ = shutdown.notified() => false,
            _ = tokio::time::sleep(self.poll_interval) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn observer(lines: usize) -> (Arc<CounterSet>, Observer<Vec<u8>>) {
        let counters = Arc::new(CounterSet::new(lines));
        let observer = Observer::new(
            counters.clone(),
            Arc::new(Notify::new()),
            Vec::new(),
            Duration::from_millis(5),
        );
        (counters, observer)
    }

    #[test]
    fn test_report_format() {
        let report = Report {
            line: LineId::new(2),
            count: 3,
        };
        assert_eq!(report.to_string(), " Int on pin 2: Counter:     3");
    }

    #[test]
    fn test_no_reports_without_change() {
        let (_, mut obs) = observer(8);
        assert!(obs.poll_once().is_empty());
        assert_eq!(obs.state(), ObserverState::Waiting);
    }

    #[test]
    fn test_reports_only_changed_lines() {
        let (counters, mut obs) = observer(8);
        counters.increment(LineId::new(1));
        counters.increment(LineId::new(6));
        counters.increment(LineId::new(6));

        let reports = obs.poll_once();
        assert_eq!(
            reports,
            vec![
                Report { line: LineId::new(1), count: 1 },
                Report { line: LineId::new(6), count: 2 },
            ]
        );
        assert_eq!(obs.snapshot(), &[0, 1, 0, 0, 0, 0, 2, 0]);
        assert!(obs.poll_once().is_empty());
    }

    #[test]
    fn test_counts_are_cumulative() {
        let (counters, mut obs) = observer(4);
        counters.increment(LineId::new(0));
        assert_eq!(obs.poll_once()[0].count, 1);
        counters.increment(LineId::new(0));
        counters.increment(LineId::new(0));
        assert_eq!(obs.poll_once()[0].count, 3);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_already_requested() {
        let (_, mut obs) = observer(8);
        let shutdown = ShutdownFlag::new();
        shutdown.request();

        let stats = obs.run(&shutdown).await.unwrap();
        assert_eq!(stats, ObserverStats::default());
        assert_eq!(obs.state(), ObserverState::Terminated);
        assert!(obs.into_inner().is_empty());
    }

    #[tokio::test]
    async fn test_run_reports_pending_change_then_waits() {
        let (counters, mut obs) = observer(8);
        for _ in 0..3 {
            counters.increment(LineId::new(2));
        }
        let shutdown = Arc::new(ShutdownFlag::new());
        let setter = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            setter.request();
        });

        let stats = obs.run(&shutdown).await.unwrap();
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.prompts, 2);

        let output = String::from_utf8(obs.into_inner()).unwrap();
        assert_eq!(
            output,
            "Waiting ...  Int on pin 2: Counter:     3\nWaiting ... "
        );
    }

    fn slow_observer(lines: usize) -> (Arc<CounterSet>, Arc<Notify>, Observer<Vec<u8>>) {
        let counters = Arc::new(CounterSet::new(lines));
        let edge_notify = Arc::new(Notify::new());
        let observer = Observer::new(
            counters.clone(),
            edge_notify.clone(),
            Vec::new(),
            Duration::from_secs(5),
        );
        (counters, edge_notify, observer)
    }

    #[tokio::test]
    async fn test_edge_wakeup_counted_when_followed_by_report() {
        let (counters, edge_notify, mut obs) = slow_observer(4);
        let shutdown = Arc::new(ShutdownFlag::new());
        let setter = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            counters.increment(LineId::new(3));
            edge_notify.notify_one();
            tokio::time::sleep(Duration::from_millis(40)).await;
            setter.request();
        });

        let stats = obs.run(&shutdown).await.unwrap();
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.edge_wakeups, 1);
    }

    #[tokio::test]
    async fn test_stale_edge_permit_not_counted() {
        let (counters, edge_notify, mut obs) = slow_observer(4);
        // Reported by the first pass, leaving the permit behind.
        counters.increment(LineId::new(0));
        edge_notify.notify_one();

        let shutdown = Arc::new(ShutdownFlag::new());
        let setter = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            setter.request();
        });

        let stats = obs.run(&shutdown).await.unwrap();
        assert_eq!(stats.reports, 1);
        assert_eq!(stats.edge_wakeups, 0);
    }

    #[test]
    fn test_reports_name_lines_by_position() {
        let (counters, mut obs) = observer(300);
        counters.increment(LineId::new(255));
        assert_eq!(
            obs.poll_once(),
            vec![Report { line: LineId::new(255), count: 1 }]
        );
    }
}
