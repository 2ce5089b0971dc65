//! Minimum-interval gate between outgoing requests
//!
//! One `Throttle` per client instance. The sleep happens while the lock is
//! held, so concurrent callers queue on a single gate instead of each
//! measuring the interval independently.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Serializes request dispatch to at most one per `min_interval`.
pub struct Throttle {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Throttle {
    /// `rate_limit` is in requests per second.
    pub fn new(rate_limit: f64) -> Self {
        Self {
            min_interval: Duration::from_secs_f64(1.0 / rate_limit),
            last_dispatch: Mutex::new(None),
        }
    }

    /// Block until the interval since the previous dispatch has elapsed,
    /// then record this dispatch.
    pub fn wait(&self) {
        let mut last = self.last_dispatch.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                log::debug!("throttling {}ms before next request", wait.as_millis());
                std::thread::sleep(wait);
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_does_not_wait() {
        let throttle = Throttle::new(1.0);
        let start = Instant::now();
        throttle.wait();
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn ten_sequential_calls_are_spaced() {
        let throttle = Throttle::new(5.0); // 200ms interval
        let mut stamps = Vec::new();
        for _ in 0..10 {
            throttle.wait();
            stamps.push(Instant::now());
        }
        for pair in stamps.windows(2) {
            // Stamps are taken just after the gate releases; allow a hair of
            // measurement slop below the 200ms dispatch spacing.
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(198),
                "dispatches {:?} apart",
                pair[1] - pair[0]
            );
        }
    }

    #[test]
    fn concurrent_callers_share_the_gate() {
        use std::sync::Arc;

        let throttle = Arc::new(Throttle::new(10.0)); // 100ms interval
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let throttle = throttle.clone();
            let stamps = stamps.clone();
            handles.push(std::thread::spawn(move || {
                throttle.wait();
                stamps.lock().unwrap().push(Instant::now());
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let mut stamps = stamps.lock().unwrap().clone();
        stamps.sort();
        for pair in stamps.windows(2) {
            // Small scheduling slop: the gate guarantees ordering, the OS
            // adds wakeup latency in both directions.
            assert!(pair[1] - pair[0] >= Duration::from_millis(90));
        }
    }
}
