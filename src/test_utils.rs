// Test doubles shared by unit and integration tests.

use crate::clock::Clock;
use crate::driver::LinkDriver;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Clock advanced by hand, so timing behavior is deterministic.
#[derive(Debug)]
pub struct ManualClock {
    epoch: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.epoch + *self.offset.lock()
    }
}

/// Link driver double: counts calls and reports whatever state the test
/// sets. `hangup` drops the link synchronously, which real hangup
/// commands effectively do; dialing stays asynchronous (`set_up` is the
/// test's stand-in for the link coming up later).
#[derive(Debug, Default)]
pub struct CountingLink {
    up: AtomicBool,
    dials: AtomicUsize,
    hangups: AtomicUsize,
    probes: AtomicUsize,
}

impl CountingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn hangups(&self) -> usize {
        self.hangups.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl LinkDriver for CountingLink {
    fn dial(&self) {
        self.dials.fetch_add(1, Ordering::SeqCst);
    }

    fn hangup(&self) {
        self.hangups.fetch_add(1, Ordering::SeqCst);
        self.up.store(false, Ordering::SeqCst);
    }

    fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.up.load(Ordering::SeqCst)
    }
}
