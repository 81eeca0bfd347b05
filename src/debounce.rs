use std::time::{Duration, Instant};

/// Holds back a value until it has stopped changing for `delay`.
/// Driven by the UI tick loop: `push` on every change, `poll` every tick.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Replace any pending value and restart the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Release the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = matches!(&self.pending, Some((_, deadline)) if now >= *deadline);
        if due {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::Debouncer;
    use std::time::{Duration, Instant};

    #[test]
    fn burst_releases_only_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let mut fired = Vec::new();
        for (i, text) in ["J", "JF", "JFK"].iter().enumerate() {
            let now = start + Duration::from_millis(100 * i as u64);
            debouncer.push(text.to_string(), now);
            if let Some(v) = debouncer.poll(now + Duration::from_millis(50)) {
                fired.push(v);
            }
        }
        assert!(fired.is_empty());
        assert!(debouncer.poll(start + Duration::from_millis(450)).is_none());
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)).as_deref(),
            Some("JFK")
        );
        assert!(!debouncer.is_pending());
        assert!(debouncer.poll(start + Duration::from_secs(5)).is_none());
    }

    #[test]
    fn cancel_drops_pending() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(1, now);
        debouncer.cancel();
        assert!(debouncer.poll(now + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn zero_delay_fires_on_next_poll() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.push("x", now);
        assert_eq!(debouncer.poll(now), Some("x"));
    }
}
