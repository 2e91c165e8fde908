use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Counting signal: `post` adds one, `wait`/`try_wait` take one
///
/// Posts are never lost: a post made before anyone waits is kept in the
/// count and consumed by the next `wait` or `try_wait`.
#[derive(Debug, Default)]
pub struct SignalCounter {
    count: Mutex<usize>,
    posted: Condvar,
}

impl SignalCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn post(&self) {
        *self.lock() += 1;
        self.posted.notify_one();
    }

    /// Take one signal if one is available, without blocking
    pub fn try_wait(&self) -> bool {
        let mut count = self.lock();
        if *count == 0 {
            return false;
        }
        *count -= 1;
        true
    }

    /// Block until a signal is available, then take it
    pub fn wait(&self) {
        let guard = self.lock();
        let mut count = self
            .posted
            .wait_while(guard, |count| *count == 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count -= 1;
    }

    /// Block up to `timeout` until a signal is available, without taking it
    pub fn wait_available(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (count, _) = self
            .posted
            .wait_timeout_while(guard, timeout, |count| *count == 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count > 0
    }

    pub fn available(&self) -> usize {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_post_then_try_wait() {
        let signal = SignalCounter::new();
        assert!(!signal.try_wait());

        signal.post();
        signal.post();
        assert_eq!(signal.available(), 2);
        assert!(signal.try_wait());
        assert!(signal.try_wait());
        assert!(!signal.try_wait());
    }

    #[test]
    fn test_wait_blocks_until_post() {
        let signal = Arc::new(SignalCounter::new());
        let poster = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.post();
            })
        };

        let start = Instant::now();
        signal.wait();
        assert!(start.elapsed() >= Duration::from_millis(15));
        assert_eq!(signal.available(), 0);
        poster.join().unwrap();
    }

    #[test]
    fn test_wait_available_keeps_the_signal() {
        let signal = SignalCounter::new();
        assert!(!signal.wait_available(Duration::from_millis(5)));

        signal.post();
        assert!(signal.wait_available(Duration::from_millis(5)));
        assert_eq!(signal.available(), 1);
    }
}
