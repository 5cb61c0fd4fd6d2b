//! Log throttling
//!
//! Limits how often the same failure is logged while the bridge keeps
//! retrying at its report cadence.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct Entry {
    last_logged: Instant,
    suppressed: u32,
}

/// Log throttler keyed by message kind
///
/// ```rust
/// use std::time::Duration;
/// use hidtrack::utils::LogThrottler;
///
/// let throttler = LogThrottler::new(Duration::from_secs(5));
/// assert_eq!(throttler.check("send_failed"), Some(0));
/// assert_eq!(throttler.check("send_failed"), None);
/// ```
pub struct LogThrottler {
    entries: Mutex<HashMap<String, Entry>>,
    interval: Duration,
}

impl LogThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            interval,
        }
    }

    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Whether to log `key` now
    ///
    /// Returns the number of occurrences suppressed since the last logged
    /// one, or `None` while throttled.
    pub fn check(&self, key: &str) -> Option<u32> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.last_logged) < self.interval => {
                entry.suppressed += 1;
                None
            }
            Some(entry) => {
                let suppressed = entry.suppressed;
                *entry = Entry {
                    last_logged: now,
                    suppressed: 0,
                };
                Some(suppressed)
            }
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }

    /// Forget `key` once the condition recovers, so the next failure logs
    pub fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::with_secs(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttles_within_interval() {
        let throttler = LogThrottler::new(Duration::from_secs(60));
        assert_eq!(throttler.check("a"), Some(0));
        assert_eq!(throttler.check("a"), None);
        assert_eq!(throttler.check("a"), None);
        assert_eq!(throttler.check("b"), Some(0));
        assert_eq!(throttler.len(), 2);
    }

    #[test]
    fn test_reports_suppressed_count() {
        let throttler = LogThrottler::new(Duration::from_millis(10));
        assert_eq!(throttler.check("a"), Some(0));
        assert_eq!(throttler.check("a"), None);
        assert_eq!(throttler.check("a"), None);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(throttler.check("a"), Some(2));
    }

    #[test]
    fn test_clear() {
        let throttler = LogThrottler::default();
        assert_eq!(throttler.check("a"), Some(0));
        throttler.clear("a");
        assert!(throttler.is_empty());
        assert_eq!(throttler.check("a"), Some(0));
    }
}
