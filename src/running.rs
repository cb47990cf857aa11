use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag gating both simulation loops.
/// Only the sender clears it, the receiver observes it after each received frame.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// Creates a flag in the running state
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
    /// Check if the loops should keep going
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
    /// Asks all loops to stop
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flag = RunFlag::new();
        let other = flag.clone();
        assert!(other.is_running());
        flag.stop();
        assert!(!other.is_running());
    }
}
