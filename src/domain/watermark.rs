// Watermark - newest sample timestamp accepted by a poll cycle
use std::sync::atomic::{AtomicI64, Ordering};

/// Value a reset rewinds to, so the next poll asks for the full history.
pub const WATERMARK_MIN: i64 = i64::MIN;

/// Shared across every monitor fed by the same poll cycle.
///
/// Only `reset` can move it backwards.
#[derive(Debug)]
pub struct Watermark(AtomicI64);

impl Default for Watermark {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Watermark {
    pub fn new(initial: i64) -> Self {
        Self(AtomicI64::new(initial))
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    /// Raise the watermark to `timestamp` unless it is already past it.
    /// Returns the resulting value.
    pub fn advance(&self, timestamp: i64) -> i64 {
        self.0.fetch_max(timestamp, Ordering::AcqRel).max(timestamp)
    }

    pub fn reset(&self) {
        self.0.store(WATERMARK_MIN, Ordering::Release);
    }
}
