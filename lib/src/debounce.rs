use std::time::{Duration, Instant};

/// Coalesces bursts of requests into one run after a quiet period.
///
/// Time is supplied by the caller, which keeps the form single-threaded and
/// lets tests drive the clock.
///
/// The delay is passed on every request so a changed setting applies to the
/// next one.
#[derive(Debug, Clone, Default)]
pub struct Debouncer {
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer to fire `delay` after `now`, replacing any pending deadline.
    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True exactly once when the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;

    #[test]
    #[timeout(1000)]
    fn bursts_collapse_into_one_run() {
        let start = Instant::now();
        let ms = Duration::from_millis;
        let mut debouncer = Debouncer::new();
        assert!(!debouncer.poll(start));

        debouncer.schedule(start, ms(200));
        debouncer.schedule(start + ms(150), ms(200));
        // the second request pushed the deadline out
        assert!(!debouncer.poll(start + ms(250)));
        assert!(debouncer.poll(start + ms(350)));
        assert!(!debouncer.poll(start + ms(400)));
        assert!(!debouncer.is_pending());

        debouncer.schedule(start, ms(200));
        debouncer.cancel();
        assert!(!debouncer.poll(start + ms(1000)));
    }
}
