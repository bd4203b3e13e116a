//! Wall-clock timing of pipeline stages.
//!
//! Off unless `HUBBLE_PROFILE` is `1` or `true`. While on, every
//! [`ProfileScope`] adds its duration to a per-label total on drop, and
//! [`report`] returns the totals so the binary can print them at exit.
//!
//! ```
//! use hubble_runner::profiling::ProfileScope;
//!
//! fn resample_all() {
//!     let _t = ProfileScope::new("bootstrap");
//!     // ...
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

static ENABLED: AtomicBool = AtomicBool::new(false);

static TIMINGS: Mutex<BTreeMap<&'static str, StageTiming>> = Mutex::new(BTreeMap::new());

/// Accumulated time for one label.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTiming {
    pub calls: u64,
    pub total: Duration,
}

/// Read `HUBBLE_PROFILE`. Returns whether profiling is now on.
pub fn init() -> bool {
    let on = std::env::var("HUBBLE_PROFILE")
        .map(|v| matches!(v.trim(), "1") || v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    set_enabled(on);
    on
}

pub fn set_enabled(on: bool) {
    ENABLED.store(on, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Snapshot of the per-label totals, ordered by label.
pub fn report() -> Vec<(&'static str, StageTiming)> {
    match TIMINGS.lock() {
        Ok(map) => map.iter().map(|(k, v)| (*k, *v)).collect(),
        Err(poisoned) => poisoned.into_inner().iter().map(|(k, v)| (*k, *v)).collect(),
    }
}

fn record(label: &'static str, elapsed: Duration) {
    let mut map = match TIMINGS.lock() {
        Ok(map) => map,
        Err(poisoned) => poisoned.into_inner(),
    };
    let entry = map.entry(label).or_default();
    entry.calls += 1;
    entry.total += elapsed;
}

/// Times the region between construction and drop.
pub struct ProfileScope {
    label: &'static str,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        if is_enabled() {
            record(self.label, self.started.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_scopes_accumulate_per_label() {
        set_enabled(true);
        {
            let _a = ProfileScope::new("profiling_test_stage");
        }
        {
            let _b = ProfileScope::new("profiling_test_stage");
        }
        let timing = report()
            .into_iter()
            .find(|(label, _)| *label == "profiling_test_stage")
            .map(|(_, t)| t)
            .unwrap();
        assert_eq!(timing.calls, 2);
    }
}
