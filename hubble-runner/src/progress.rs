//! Progress reporting for long-running validators.
//!
//! Validators never print; they call into an optional reporter. Ticks are
//! emitted roughly twenty times per run, on the sequential path only.

/// Callbacks invoked by the iterating validators.
pub trait ValidationProgress: Sync {
    /// Called once before the first iteration.
    fn on_start(&self, validator: &str, total: usize);

    /// Called periodically with the number of completed iterations.
    fn on_tick(&self, validator: &str, done: usize, total: usize);

    /// Called once after aggregation, with the overall verdict.
    fn on_finish(&self, validator: &str, passed: bool);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl ValidationProgress for StdoutProgress {
    fn on_start(&self, validator: &str, total: usize) {
        println!("[{validator}] starting {total} iterations");
    }

    fn on_tick(&self, validator: &str, done: usize, total: usize) {
        let pct = if total == 0 { 100.0 } else { 100.0 * done as f64 / total as f64 };
        println!("[{validator}] {done}/{total} ({pct:.0}%)");
    }

    fn on_finish(&self, validator: &str, passed: bool) {
        println!("[{validator}] {}", if passed { "PASS" } else { "FAIL" });
    }
}

/// Interval between ticks for a run of `total` iterations.
pub(crate) fn tick_interval(total: usize) -> usize {
    (total / 20).max(1)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_interval_never_zero() {
        assert_eq!(tick_interval(0), 1);
        assert_eq!(tick_interval(10), 1);
        assert_eq!(tick_interval(10_000), 500);
    }
}
