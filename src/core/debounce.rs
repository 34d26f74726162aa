use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Fires once after input has been quiet for `delay`.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    last_touch: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_touch: None,
        }
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_touch = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_touch.is_some()
    }

    /// True exactly once per burst of touches, when the window has elapsed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.last_touch {
            Some(at) if now.saturating_duration_since(at) >= self.delay => {
                self.last_touch = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::default();
        assert!(!debouncer.fire(start));

        debouncer.touch(start);
        assert!(debouncer.is_pending());
        assert!(!debouncer.fire(start + Duration::from_millis(499)));
        assert!(debouncer.fire(start + Duration::from_millis(500)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(start + Duration::from_millis(900)));
    }

    #[test]
    fn test_touch_restarts_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));

        debouncer.touch(start);
        debouncer.touch(start + Duration::from_millis(80));
        assert!(!debouncer.fire(start + Duration::from_millis(150)));
        assert!(debouncer.fire(start + Duration::from_millis(180)));
    }
}
