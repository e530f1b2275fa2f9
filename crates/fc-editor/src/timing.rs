//! Host-clocked debounce and throttle.
//!
//! Nothing here reads a clock: callers pass `now_ms` from the host
//! (`performance.now()` in the browser, a fake clock in tests).

/// Last-call-wins delay. Every `schedule` pushes the deadline back; the
/// debounce fires once, after the quiet period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debounce {
    pub delay_ms: u64,
    due_at: Option<u64>,
}

impl Debounce {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms, due_at: None }
    }

    pub fn schedule(&mut self, now_ms: u64) {
        self.due_at = Some(now_ms.saturating_add(self.delay_ms));
    }

    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// True exactly once when the deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.due_at {
            Some(due) if now_ms >= due => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.due_at = None;
    }
}

/// At most one acquisition per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    pub window_ms: u64,
    last: Option<u64>,
}

impl Throttle {
    pub fn new(window_ms: u64) -> Self {
        Self { window_ms, last: None }
    }

    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last
            && now_ms.saturating_sub(last) < self.window_ms
        {
            return false;
        }
        self.last = Some(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_last_call_wins() {
        let mut d = Debounce::new(300);
        d.schedule(0);
        d.schedule(200);
        assert!(!d.poll(300), "first deadline was replaced");
        assert!(d.poll(500));
        assert!(!d.poll(900), "fires only once");
    }

    #[test]
    fn debounce_cancel() {
        let mut d = Debounce::new(10);
        d.schedule(0);
        assert!(d.is_pending());
        d.cancel();
        assert!(!d.poll(100));
    }

    #[test]
    fn throttle_window() {
        let mut t = Throttle::new(100);
        assert!(t.try_acquire(1000));
        assert!(!t.try_acquire(1050));
        assert!(!t.try_acquire(1099));
        assert!(t.try_acquire(1100));
    }
}
