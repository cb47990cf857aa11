/// Point of time in milliseconds
pub type Instant = fugit::TimerInstantU64<1000>;
/// Duration in milliseconds
pub type Duration = fugit::MillisDurationU64;

/// Minimum time between two indicator toggles
pub const BLINK_INTERVAL: Duration = Duration::from_ticks(500);

/// Source of the current time
pub trait TimerDriver {
    /// Get current time
    fn now(&self) -> Instant;
}

/// Wall clock time of the host, milliseconds since the unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimerDriver;

impl SystemTimerDriver {
    /// Creates a new driver
    pub fn new() -> Self {
        Self
    }
}

impl TimerDriver for SystemTimerDriver {
    fn now(&self) -> Instant {
        let ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|since_epoch| since_epoch.as_millis() as u64)
            .unwrap_or(0);
        Instant::from_ticks(ms)
    }
}

/// Check if more than `timeout` passed between `start` and `now`.
/// A `now` before `start` never times out
pub fn elapsed(start: Instant, now: Instant, timeout: Duration) -> bool {
    now.checked_duration_since(start)
        .map(|passed| passed > timeout)
        .unwrap_or(false)
}

/// Fixed rate scheduler.
/// Each call to [Ticker::tick] sleeps until the next tick is due.
#[derive(Debug)]
pub struct Ticker {
    period: std::time::Duration,
    next: std::time::Instant,
}

impl Ticker {
    /// Creates a ticker running at `rate` ticks per second
    pub fn new(rate: u32) -> Self {
        let period = std::time::Duration::from_secs(1) / rate.max(1);
        Self {
            period,
            next: std::time::Instant::now(),
        }
    }
    /// Returns the tick period
    pub fn period(&self) -> std::time::Duration {
        self.period
    }
    /// Waits for the next tick
    /// If the caller fell behind, the schedule restarts from now instead of bursting
    pub fn tick(&mut self) {
        let now = std::time::Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::testtime::TestTimer;

    #[test]
    fn test_timer() {
        let timer = TestTimer::new();
        assert_eq!(timer.now(), Instant::from_ticks(0));
        let mut shared = timer.clone();
        shared.set_time(100);
        assert_eq!(timer.now(), Instant::from_ticks(100));
    }

    #[test]
    fn blink_timeout() {
        let start = Instant::from_ticks(1000);
        assert!(!elapsed(start, Instant::from_ticks(1499), BLINK_INTERVAL));
        assert!(!elapsed(start, Instant::from_ticks(1500), BLINK_INTERVAL));
        assert!(elapsed(start, Instant::from_ticks(1501), BLINK_INTERVAL));
        assert!(!elapsed(start, Instant::from_ticks(10), BLINK_INTERVAL));
    }

    #[test]
    fn system_time_moves() {
        let timer = SystemTimerDriver::new();
        let first = timer.now();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(timer.now() > first);
    }

    #[test]
    fn ticker_paces() {
        let mut ticker = Ticker::new(100);
        assert_eq!(ticker.period(), std::time::Duration::from_millis(10));
        let start = std::time::Instant::now();
        for _ in 0..4 {
            ticker.tick();
        }
        // first tick is immediate
        assert!(start.elapsed() >= std::time::Duration::from_millis(30));
    }
}
