//! Wall-clock abstraction.
//!
//! Message timestamps come from a [`Clock`] so tests can control ordering
//! without sleeping.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// Source of Unix timestamps in seconds.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current Unix time in seconds.
    fn now_secs(&self) -> u64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)]
    fn now_secs(&self) -> u64 {
        // A clock before 1970 is treated as the epoch
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at the given Unix time.
    pub fn new(secs: u64) -> Self {
        Self { secs: Arc::new(AtomicU64::new(secs)) }
    }

    /// Move time forward.
    pub fn advance(&self, secs: u64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}
