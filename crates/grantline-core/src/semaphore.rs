//! Counting semaphore bounding concurrent per-identifier fetches.
//!
//! `Mutex` + `Condvar` from std; permits are released by RAII guard drop.

use std::sync::{Condvar, Mutex};

/// Fixed pool of permits; `acquire` blocks until one is free.
pub struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

/// Holds one permit; dropping it wakes one blocked acquirer.
pub struct Permit<'a>(&'a Semaphore);

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Block until a permit is free, then take it.
    pub fn acquire(&self) -> Permit<'_> {
        let mut count = self.permits.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
        Permit(self)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.0.permits.lock().unwrap() += 1;
        self.0.available.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn permits_are_returned_on_drop() {
        let sem = Semaphore::new(2);
        let a = sem.acquire();
        let _b = sem.acquire();
        assert_eq!(*sem.permits.lock().unwrap(), 0);
        drop(a);
        assert_eq!(*sem.permits.lock().unwrap(), 1);
    }

    #[test]
    fn acquire_blocks_until_release() {
        let sem = Arc::new(Semaphore::new(1));
        let held = sem.acquire();

        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            let _p = sem2.acquire();
            "acquired"
        });

        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(held);
        assert_eq!(handle.join().unwrap(), "acquired");
    }

    #[test]
    fn concurrency_never_exceeds_pool() {
        let sem = Arc::new(Semaphore::new(3));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let sem = sem.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(std::thread::spawn(move || {
                let _p = sem.acquire();
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(10));
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
