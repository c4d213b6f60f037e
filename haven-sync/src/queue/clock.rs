//! Strictly monotonic enqueue clock. Wall-clock milliseconds, bumped by
//! one when two enqueues land in the same tick, so per-entity FIFO order
//! survives bursts and the occasional clock step backward.

use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Debug, Default)]
pub struct LogicalClock {
    last: AtomicI64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp: `max(wall_clock_ms, previous + 1)`
    pub fn now_ms(&self) -> i64 {
        let wall = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
