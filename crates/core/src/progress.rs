//! Progress reporting for long-running video work.
//!
//! Frame decoding reports after every frame; [`ThrottledProgress`] drops
//! updates that move less than a configurable delta so that consumers (the
//! job registry, in practice) are not flooded with writes.

use std::sync::Mutex;

/// Default minimum change, in percentage points, between forwarded updates.
pub const DEFAULT_PROGRESS_DELTA: f64 = 0.5;

/// Receiver of progress percentages in the range `0.0..=100.0`.
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f64);
}

/// A sink that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: f64) {}
}

/// Forwards to an inner sink only when progress advanced by at least `delta`.
pub struct ThrottledProgress<'a> {
    inner: &'a dyn ProgressSink,
    delta: f64,
    last: Mutex<f64>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a dyn ProgressSink) -> Self {
        Self::with_delta(inner, DEFAULT_PROGRESS_DELTA)
    }

    pub fn with_delta(inner: &'a dyn ProgressSink, delta: f64) -> Self {
        Self {
            inner,
            delta,
            last: Mutex::new(0.0),
        }
    }

    /// Last value forwarded to the inner sink.
    pub fn last_reported(&self) -> f64 {
        self.last.lock().map(|v| *v).unwrap_or(0.0)
    }
}

impl ProgressSink for ThrottledProgress<'_> {
    fn report(&self, percent: f64) {
        let rounded = round4(percent);
        let Ok(mut last) = self.last.lock() else {
            return;
        };
        if rounded - *last < self.delta {
            return;
        }
        let value = rounded.min(100.0);
        *last = value;
        self.inner.report(value);
    }
}

/// Round to four decimal places.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<f64>>);

    impl ProgressSink for Recorder {
        fn report(&self, percent: f64) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn small_steps_are_dropped() {
        let recorder = Recorder::default();
        let throttled = ThrottledProgress::new(&recorder);
        throttled.report(0.1);
        throttled.report(0.3);
        throttled.report(0.6);
        throttled.report(0.9);
        throttled.report(1.2);
        assert_eq!(*recorder.0.lock().unwrap(), vec![0.6, 1.2]);
    }

    #[test]
    fn values_above_100_are_clamped() {
        let recorder = Recorder::default();
        let throttled = ThrottledProgress::with_delta(&recorder, 1.0);
        throttled.report(101.5);
        assert_eq!(*recorder.0.lock().unwrap(), vec![100.0]);
        assert_eq!(throttled.last_reported(), 100.0);
    }

    #[test]
    fn rounding_to_four_decimals() {
        assert_eq!(round4(33.333_333), 33.3333);
    }
}
