use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

// -------------------------------------------------------------------------------------------------

/// A monotonic millisecond clock, used by the engine to rate-limit position changes.
///
/// Injected as a trait so tests and offline renders can drive time manually.
pub trait Clock: Debug + Send {
    /// Monotonic time in milliseconds since some fixed origin.
    fn now_ms(&self) -> f64;
}

// -------------------------------------------------------------------------------------------------

/// Default [`Clock`] implementation, counting from its own construction time.
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

// -------------------------------------------------------------------------------------------------

/// A manually advanced [`Clock`] for tests and offline rendering.
///
/// Clones share the same time source, so a caller can keep one handle to drive time while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(now_ms: f64) -> Self {
        let clock = Self::default();
        clock.set(now_ms);
        clock
    }

    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::Relaxed))
    }
}

// -------------------------------------------------------------------------------------------------
