//! Lightweight wall-clock timing for solves and time loops.
//!
//! Results are reported through `tracing` rather than printed, so an
//! embedding application decides whether they are shown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Elapsed time in seconds, timer keeps running.
    pub fn elapsed(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Stop the timer, log the result at debug level and return it in seconds.
    pub fn stop(self) -> f64 {
        let elapsed = self.elapsed();
        tracing::debug!(label = self.label, elapsed_s = elapsed, "timer stopped");
        elapsed
    }
}

/// Running total over many timed sections, e.g. every Jacobian of one solve.
///
/// Safe to share between threads evaluating residuals concurrently.
#[derive(Default)]
pub struct AccumulatingTimer {
    nanos: AtomicU64,
    sections: AtomicU64,
}

impl AccumulatingTimer {
    pub const fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
            sections: AtomicU64::new(0),
        }
    }

    /// Run `section` and add its wall time to the total.
    pub fn time<R>(&self, section: impl FnOnce() -> R) -> R {
        let start = Instant::now();
        let out = section();
        let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
        self.sections.fetch_add(1, Ordering::Relaxed);
        out
    }

    pub fn total_seconds(&self) -> f64 {
        self.nanos.load(Ordering::Relaxed) as f64 * 1e-9
    }

    /// Number of timed sections.
    pub fn count(&self) -> u64 {
        self.sections.load(Ordering::Relaxed)
    }
}

/// Wall-clock totals of one simulation run.
#[derive(Clone, Debug, Default)]
pub struct RunTimings {
    pub steady_solve_time_s: f64,
    pub transient_total_time_s: f64,
    pub transient_steps: usize,
}

impl RunTimings {
    pub fn seconds_per_step(&self) -> f64 {
        if self.transient_steps > 0 {
            self.transient_total_time_s / self.transient_steps as f64
        } else {
            0.0
        }
    }

    /// Emit the totals as one info event.
    pub fn log_summary(&self) {
        tracing::info!(
            steady_s = self.steady_solve_time_s,
            transient_s = self.transient_total_time_s,
            steps = self.transient_steps,
            per_step_s = self.seconds_per_step(),
            "run timings"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulating_timer_counts_sections() {
        let t = AccumulatingTimer::new();
        assert_eq!(t.total_seconds(), 0.0);
        let v = t.time(|| 2 + 2);
        t.time(|| std::thread::sleep(std::time::Duration::from_millis(2)));
        assert_eq!(v, 4);
        assert_eq!(t.count(), 2);
        assert!(t.total_seconds() >= 0.002);
    }

    #[test]
    fn per_step_handles_zero_steps() {
        let timings = RunTimings::default();
        assert_eq!(timings.seconds_per_step(), 0.0);
        let timings = RunTimings {
            steady_solve_time_s: 1.0,
            transient_total_time_s: 4.0,
            transient_steps: 8,
        };
        assert_eq!(timings.seconds_per_step(), 0.5);
    }
}
