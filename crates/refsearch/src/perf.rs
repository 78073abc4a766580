// perf.rs - Phase timing for reference searches
//
// REFSEARCH_PERF=1 logs each phase's duration at info level.
// REFSEARCH_PERF=verbose also warns when a phase runs past its budget.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfMode {
    Off,
    Timing,
    Verbose,
}

impl PerfMode {
    /// Interpret a `REFSEARCH_PERF` value
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "off" => PerfMode::Off,
            "verbose" => PerfMode::Verbose,
            _ => PerfMode::Timing,
        }
    }
}

static MODE: OnceLock<PerfMode> = OnceLock::new();

/// Mode read from `REFSEARCH_PERF` on first use
pub fn mode() -> PerfMode {
    *MODE.get_or_init(|| {
        std::env::var("REFSEARCH_PERF").map_or(PerfMode::Off, |value| PerfMode::parse(&value))
    })
}

/// Times one search phase and logs it when the guard is dropped or finished.
///
/// ```
/// use refsearch::perf::TimingGuard;
///
/// let timing = TimingGuard::with_threshold("find_references:closure", 50);
/// // ... expand the closure ...
/// let elapsed = timing.finish();
/// assert!(elapsed.as_secs() < 60);
/// ```
pub struct TimingGuard {
    phase: &'static str,
    start: Instant,
    budget: Option<Duration>,
    mode: PerfMode,
    logged: bool,
}

impl TimingGuard {
    pub fn new(phase: &'static str) -> Self {
        Self::start(phase, None)
    }

    /// Time `phase`, with a budget that verbose mode warns about
    pub fn with_threshold(phase: &'static str, threshold_ms: u64) -> Self {
        Self::start(phase, Some(Duration::from_millis(threshold_ms)))
    }

    fn start(phase: &'static str, budget: Option<Duration>) -> Self {
        Self {
            phase,
            start: Instant::now(),
            budget,
            mode: mode(),
            logged: false,
        }
    }

    /// Stop the clock, log the phase and return its duration
    pub fn finish(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.log(elapsed);
        self.logged = true;
        elapsed
    }

    fn over_budget(&self, elapsed: Duration) -> bool {
        self.budget.is_some_and(|budget| elapsed > budget)
    }

    fn log(&self, elapsed: Duration) {
        if self.mode == PerfMode::Off {
            return;
        }
        log::info!("[PERF] {} completed in {:?}", self.phase, elapsed);
        if self.mode == PerfMode::Verbose && self.over_budget(elapsed) {
            log::warn!(
                "[PERF] {} over budget: {:?} > {:?}",
                self.phase,
                elapsed,
                self.budget.unwrap_or_default()
            );
        }
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.logged {
            self.log(self.start.elapsed());
        }
    }
}
