// Lease registry - decides when the shared link is brought up and down.

use crate::clock::Clock;
use crate::driver::LinkDriver;
use crate::timer::ElapsedTimer;
use crate::ClientId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// One client's claim of interest in the link.
#[derive(Debug, Clone, Copy)]
struct Lease {
    last_seen: Instant,
}

struct Inner {
    leases: HashMap<ClientId, Lease>,
    /// True between requesting a dial and first observing the link up.
    dialing: bool,
    timer: ElapsedTimer,
}

/// Arbitrates the shared link between clients.
///
/// Clients hold leases; the registry dials while at least one lease
/// exists and hangs up when the last one goes. Dialing is asynchronous:
/// the dial command returns immediately and the only completion signal
/// is a later `is_held()` probe reporting the link up.
///
/// Every operation is a single atomic unit over all registry state (the
/// lease map, the dialing flag and the session timer), so request
/// handlers and the sweeper can call in concurrently without double
/// dials or double hangups. Driver commands are prompt by contract and
/// run inside the critical section to keep decide-then-act sequences
/// atomic.
pub struct LeaseRegistry {
    driver: Arc<dyn LinkDriver>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl LeaseRegistry {
    pub fn new(driver: Arc<dyn LinkDriver>, clock: Arc<dyn Clock>) -> Self {
        let timer = ElapsedTimer::new(clock.clone());
        Self {
            driver,
            clock,
            inner: Mutex::new(Inner {
                leases: HashMap::new(),
                dialing: false,
                timer,
            }),
        }
    }

    /// Register or refresh a client's lease, dialing if the link is
    /// down and no dial is already in progress. Never blocks waiting
    /// for the link to come up.
    pub fn add_lease(&self, client_id: ClientId) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        debug!(client = %client_id, "lease added");
        inner.leases.insert(client_id, Lease { last_seen: now });

        if !inner.dialing && !self.probe_locked(&mut inner) {
            inner.dialing = true;
            // New acquire cycle: elapsed time describes this session only.
            inner.timer.reset();
            info!("link down, dialing");
            self.driver.dial();
        }
    }

    /// Mark an existing lease as alive. Unknown clients are ignored;
    /// refreshing never creates a lease.
    pub fn refresh_lease(&self, client_id: &ClientId) {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        if let Some(lease) = inner.leases.get_mut(client_id) {
            lease.last_seen = now;
        }
    }

    /// Drop a client's lease, hanging up if it was the last one while
    /// the link is up or a dial is outstanding. Removing an absent
    /// lease is a no-op, not an error.
    pub fn remove_lease(&self, client_id: &ClientId) {
        let mut inner = self.inner.lock();
        self.remove_locked(&mut inner, client_id);
    }

    /// Evict every lease not refreshed within `timeout`. Eviction goes
    /// through the same path as explicit removal, so dropping the last
    /// stale lease hangs up. Returns the number of leases evicted.
    pub fn sweep_stale(&self, timeout: Duration) -> usize {
        let mut inner = self.inner.lock();
        let now = self.clock.now();
        let stale: Vec<ClientId> = inner
            .leases
            .iter()
            .filter(|(_, lease)| now.duration_since(lease.last_seen) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for client_id in &stale {
            info!(client = %client_id, "evicting silent client");
            self.remove_locked(&mut inner, client_id);
        }
        stale.len()
    }

    /// Number of active leases.
    pub fn count(&self) -> usize {
        self.inner.lock().leases.len()
    }

    /// Probe the link. A probe reporting "up" is the only signal that a
    /// requested dial has completed; it clears the dialing flag and
    /// starts the session timer if it was not already running.
    pub fn is_held(&self) -> bool {
        let mut inner = self.inner.lock();
        self.probe_locked(&mut inner)
    }

    /// Whole seconds the link has been up this session.
    pub fn elapsed(&self) -> u64 {
        self.inner.lock().timer.elapsed()
    }

    /// Unconditionally drop every lease, hang up and stop the session
    /// timer. The hangup command is fire-and-forget; its outcome is not
    /// verified.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        self.disconnect_locked(&mut inner);
    }

    fn remove_locked(&self, inner: &mut Inner, client_id: &ClientId) {
        if inner.leases.remove(client_id).is_some() {
            debug!(client = %client_id, "lease removed");
        }
        if inner.leases.is_empty() && (inner.dialing || self.probe_locked(inner)) {
            self.disconnect_locked(inner);
        }
    }

    fn disconnect_locked(&self, inner: &mut Inner) {
        info!(seconds_online = inner.timer.elapsed(), "hanging up");
        inner.leases.clear();
        inner.dialing = false;
        inner.timer.stop();
        self.driver.hangup();
    }

    fn probe_locked(&self, inner: &mut Inner) -> bool {
        if self.driver.probe() {
            inner.dialing = false;
            if !inner.timer.is_running() {
                inner.timer.start();
            }
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CountingLink, ManualClock};
    use proptest::prelude::*;

    fn registry() -> (LeaseRegistry, Arc<CountingLink>, Arc<ManualClock>) {
        let link = Arc::new(CountingLink::new());
        let clock = Arc::new(ManualClock::new());
        let registry = LeaseRegistry::new(link.clone(), clock.clone());
        (registry, link, clock)
    }

    #[test]
    fn test_first_lease_triggers_one_dial() {
        let (registry, link, _clock) = registry();

        registry.add_lease("a".into());
        assert_eq!(link.dials(), 1);

        // Further demand while dialing coalesces.
        registry.add_lease("b".into());
        registry.add_lease("a".into());
        assert_eq!(link.dials(), 1);
    }

    #[test]
    fn test_add_while_up_does_not_redial() {
        let (registry, link, _clock) = registry();
        link.set_up(true);

        registry.add_lease("a".into());
        assert_eq!(link.dials(), 0);
    }

    #[test]
    fn test_count_is_per_client_and_idempotent() {
        let (registry, _link, _clock) = registry();

        registry.add_lease("a".into());
        registry.add_lease("b".into());
        registry.add_lease("b".into());
        assert_eq!(registry.count(), 2);

        registry.remove_lease(&"a".into());
        assert_eq!(registry.count(), 1);

        // Removing again is a no-op.
        registry.remove_lease(&"a".into());
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_last_lease_removal_hangs_up() {
        let (registry, link, _clock) = registry();

        registry.add_lease("a".into());
        registry.add_lease("b".into());
        link.set_up(true);

        registry.remove_lease(&"a".into());
        assert_eq!(link.hangups(), 0);

        registry.remove_lease(&"b".into());
        assert_eq!(link.hangups(), 1);
    }

    #[test]
    fn test_last_lease_removal_while_dialing_hangs_up() {
        let (registry, link, _clock) = registry();

        // Dial requested but never observed up.
        registry.add_lease("a".into());
        assert_eq!(link.dials(), 1);

        registry.remove_lease(&"a".into());
        assert_eq!(link.hangups(), 1);
    }

    #[test]
    fn test_refresh_does_not_create() {
        let (registry, _link, _clock) = registry();

        registry.refresh_lease(&"ghost".into());
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_refresh_keeps_lease_alive_through_sweep() {
        let (registry, _link, clock) = registry();
        let timeout = Duration::from_secs(30);

        registry.add_lease("a".into());
        registry.add_lease("b".into());

        clock.advance(Duration::from_secs(20));
        registry.refresh_lease(&"a".into());

        clock.advance(Duration::from_secs(15));
        registry.sweep_stale(timeout);

        // "a" was seen 15s ago, "b" 35s ago.
        assert_eq!(registry.count(), 1);
        assert!(!registry.is_held());
    }

    #[test]
    fn test_sweep_evicting_last_lease_hangs_up() {
        let (registry, link, clock) = registry();

        registry.add_lease("a".into());
        link.set_up(true);

        clock.advance(Duration::from_secs(31));
        let evicted = registry.sweep_stale(Duration::from_secs(30));

        assert_eq!(evicted, 1);
        assert_eq!(registry.count(), 0);
        assert_eq!(link.hangups(), 1);
    }

    #[test]
    fn test_sweep_boundary_age_survives() {
        let (registry, _link, clock) = registry();

        registry.add_lease("a".into());
        clock.advance(Duration::from_secs(30));

        // Strictly-greater-than: exactly at the timeout is not stale.
        assert_eq!(registry.sweep_stale(Duration::from_secs(30)), 0);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_probe_observation_clears_dialing_and_starts_timer() {
        let (registry, link, clock) = registry();

        registry.add_lease("a".into());
        assert_eq!(registry.elapsed(), 0);

        // Dial attempt duration is not counted.
        clock.advance(Duration::from_secs(9));
        link.set_up(true);
        assert!(registry.is_held());

        clock.advance(Duration::from_secs(42));
        assert_eq!(registry.elapsed(), 42);

        // A held link does not re-trigger a dial on new demand.
        registry.add_lease("b".into());
        assert_eq!(link.dials(), 1);
    }

    #[test]
    fn test_disconnect_freezes_elapsed() {
        let (registry, link, clock) = registry();

        registry.add_lease("a".into());
        link.set_up(true);
        assert!(registry.is_held());

        clock.advance(Duration::from_secs(10));
        registry.disconnect();

        clock.advance(Duration::from_secs(99));
        assert_eq!(registry.elapsed(), 10);
    }

    #[test]
    fn test_new_dial_cycle_resets_elapsed() {
        let (registry, link, clock) = registry();

        // First session: 50 seconds online.
        registry.add_lease("a".into());
        link.set_up(true);
        assert!(registry.is_held());
        clock.advance(Duration::from_secs(50));
        registry.remove_lease(&"a".into());
        assert_eq!(registry.elapsed(), 50);

        // Second session starts from zero at the moment of the dial.
        clock.advance(Duration::from_secs(5));
        registry.add_lease("a".into());
        assert_eq!(link.dials(), 2);
        assert_eq!(registry.elapsed(), 0);

        link.set_up(true);
        assert!(registry.is_held());
        clock.advance(Duration::from_secs(7));
        assert_eq!(registry.elapsed(), 7);
    }

    proptest! {
        // Survivors of a sweep depend only on lease ages, never on the
        // order leases were added or visited.
        #[test]
        fn prop_sweep_evicts_exactly_the_stale(ages in prop::collection::vec(0u64..120, 1..24)) {
            let (registry, _link, clock) = registry();
            let timeout = Duration::from_secs(60);
            let newest = *ages.iter().min().unwrap();

            // Oldest lease first: client i is `ages[i]` seconds old at
            // sweep time.
            let oldest = *ages.iter().max().unwrap();
            let mut at: Vec<(usize, u64)> = ages.iter().copied().enumerate().collect();
            at.sort_by_key(|&(_, age)| std::cmp::Reverse(age));

            let mut elapsed = 0;
            for (i, age) in at {
                clock.advance(Duration::from_secs(oldest - age - elapsed));
                elapsed = oldest - age;
                registry.add_lease(ClientId::new(format!("client-{i}")));
            }
            clock.advance(Duration::from_secs(oldest - elapsed));

            let evicted = registry.sweep_stale(timeout);
            let expected_evicted = ages.iter().filter(|&&age| age > 60).count();

            prop_assert_eq!(evicted, expected_evicted);
            prop_assert_eq!(registry.count(), ages.len() - expected_evicted);
            // Sanity: the newest lease survives whenever anything does.
            if newest <= 60 {
                prop_assert!(registry.count() > 0);
            }
        }
    }
}
