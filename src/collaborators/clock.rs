//! Time source for base-rate decay.

use crate::domain::TimeMs;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> TimeMs;
}

/// Wall clock backed by chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimeMs {
        TimeMs::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: TimeMs) -> Self {
        Self {
            now_ms: Arc::new(AtomicI64::new(start.as_ms())),
        }
    }

    pub fn set(&self, at: TimeMs) {
        self.now_ms.store(at.as_ms(), Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.now_ms.fetch_add(minutes * 60_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimeMs {
        TimeMs::new(self.now_ms.load(Ordering::SeqCst))
    }
}
