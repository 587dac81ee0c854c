// Elapsed-time tracking for the current link session.

use crate::clock::Clock;
use std::sync::Arc;
use std::time::Instant;

/// Stopwatch recording how long the link has been up.
///
/// While running, `elapsed()` counts from the last `start()`/`reset()`;
/// once stopped the value freezes until the timer is started or reset
/// again.
pub struct ElapsedTimer {
    clock: Arc<dyn Clock>,
    start: Instant,
    stop: Instant,
    running: bool,
}

impl ElapsedTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            start: now,
            stop: now,
            running: false,
        }
    }

    /// Zero the timer. Neither stops nor starts it.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.start = now;
        self.stop = now;
    }

    pub fn start(&mut self) {
        self.start = self.clock.now();
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.stop = self.clock.now();
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whole seconds since the timer started, frozen while stopped.
    pub fn elapsed(&self) -> u64 {
        let end = if self.running {
            self.clock.now()
        } else {
            self.stop
        };
        end.duration_since(self.start).as_secs()
    }
}
