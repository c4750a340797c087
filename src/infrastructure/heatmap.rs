//! Heavy-hitter reporting.
//!
//! Renders the tracker's top keys as text and, with the `async` feature,
//! periodically emits them from a background tokio task.

use crate::infrastructure::builder::BuildError;
use crate::infrastructure::heavy_hitters::{HeavyHitterEntry, HeavyHitterTracker};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::time::interval;

/// Configuration for periodic heatmap reports.
///
/// The interval is always non-zero.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    interval: Duration,
    max_entries: Option<usize>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_entries: None,
        }
    }
}

impl ReportConfig {
    /// Create a config with the given report interval.
    ///
    /// # Errors
    /// Returns [`BuildError::ZeroReportInterval`] if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, BuildError> {
        if interval.is_zero() {
            return Err(BuildError::ZeroReportInterval);
        }
        Ok(Self {
            interval,
            max_entries: None,
        })
    }

    /// Report at most `max_entries` keys.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// How often a report is emitted.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on keys per report; `None` reports every tracked key.
    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }
}

/// Renders and emits the current heavy hitters.
///
/// # Example
/// ```
/// use fluxgate::{HeatmapReporter, HeavyHitterTracker};
/// use std::sync::Arc;
///
/// let tracker = Arc::new(HeavyHitterTracker::new(16, 0.5).unwrap());
/// tracker.offer(0x1a);
/// tracker.offer(0x1a);
///
/// let reporter = HeatmapReporter::new(tracker);
/// assert_eq!(reporter.render_top_keys(), "1a:2\n");
/// ```
#[derive(Debug, Clone)]
pub struct HeatmapReporter {
    tracker: Arc<HeavyHitterTracker>,
    config: ReportConfig,
}

impl HeatmapReporter {
    /// Create a reporter with the default config.
    pub fn new(tracker: Arc<HeavyHitterTracker>) -> Self {
        Self::with_config(tracker, ReportConfig::default())
    }

    /// Create a reporter with an explicit config.
    pub fn with_config(tracker: Arc<HeavyHitterTracker>, config: ReportConfig) -> Self {
        Self { tracker, config }
    }

    /// Current top keys, truncated to the configured maximum.
    pub fn top_keys(&self) -> Vec<HeavyHitterEntry> {
        let mut entries = self.tracker.top_k();
        if let Some(max) = self.config.max_entries {
            entries.truncate(max);
        }
        entries
    }

    /// One `hex-key:count` line per top key, highest count first.
    pub fn render_top_keys(&self) -> String {
        let mut output = String::new();
        for entry in self.top_keys() {
            let _ = writeln!(output, "{:x}:{}", entry.key, entry.count);
        }
        output
    }

    /// Get the report configuration.
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Start emitting reports periodically.
    ///
    /// Spawns a background task that calls `emit_fn` with the top keys at the
    /// configured interval, skipping empty reports. Abort the returned handle
    /// to stop it.
    #[cfg(feature = "async")]
    pub fn start<F>(self, mut emit_fn: F) -> tokio::task::JoinHandle<()>
    where
        F: FnMut(Vec<HeavyHitterEntry>) + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);

            loop {
                ticker.tick().await;
                let entries = self.top_keys();

                if !entries.is_empty() {
                    emit_fn(entries);
                }
            }
        })
    }

    /// Start logging reports at `INFO`, one event per key.
    #[cfg(feature = "async")]
    pub fn start_logging(self) -> tokio::task::JoinHandle<()> {
        self.start(|entries| {
            for entry in entries {
                tracing::info!(
                    key = %format_args!("{:x}", entry.key),
                    count = entry.count,
                    "heavy hitter"
                );
            }
        })
    }
}
