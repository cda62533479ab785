/// Performance measurement utilities
/// Frames are timed for the `--perf` mode and scopes can be traced
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        tracing::debug!(scope = self.name, elapsed_us = self.elapsed().as_micros() as u64, "perf scope");
    }
}

/// Frame time accumulator
#[derive(Debug, Clone, Default)]
pub struct PerfStats {
    frame_times: Vec<Duration>,
}

impl PerfStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, frame: Duration) {
        self.frame_times.push(frame);
    }

    pub fn frames(&self) -> usize {
        self.frame_times.len()
    }

    pub fn total(&self) -> Duration {
        self.frame_times.iter().sum()
    }

    /// Mean frame time in seconds, 0 when nothing was recorded
    pub fn mean_seconds(&self) -> f64 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.total().as_secs_f64() / self.frame_times.len() as f64
    }

    pub fn min(&self) -> Duration {
        self.frame_times.iter().copied().min().unwrap_or_default()
    }

    pub fn max(&self) -> Duration {
        self.frame_times.iter().copied().max().unwrap_or_default()
    }

    pub fn print_summary(&self) {
        println!("\n========== PERFORMANCE SUMMARY ==========");
        println!("Frames:          {:8}", self.frames());
        println!("Min frame:       {:8.2}ms", self.min().as_secs_f64() * 1e3);
        println!("Mean frame:      {:8.2}ms", self.mean_seconds() * 1e3);
        println!("Max frame:       {:8.2}ms", self.max().as_secs_f64() * 1e3);
        println!("─────────────────────────────────────────");
        println!("Total:           {:8.2}ms", self.total().as_secs_f64() * 1e3);
        println!("=========================================\n");
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_aggregate_frames() {
        let mut stats = PerfStats::new();
        assert_eq!(stats.mean_seconds(), 0.0);
        stats.record(Duration::from_millis(10));
        stats.record(Duration::from_millis(30));
        assert_eq!(stats.frames(), 2);
        assert_eq!(stats.min(), Duration::from_millis(10));
        assert_eq!(stats.max(), Duration::from_millis(30));
        assert!((stats.mean_seconds() - 0.02).abs() < 1e-9);
    }
}
