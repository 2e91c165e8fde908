use std::sync::atomic::{AtomicUsize, Ordering};

use crate::tk_config::Config;
use crate::tk_interface::{Clock, Event, EventSink, PeerId, StopSignal};
use crate::tk_peer::{Peer, PeerSummary};
use crate::tk_rendezvous::Rendezvous;

/// Shared registry of talkers for one run
///
/// Borrowed by every worker thread for the duration of the run; the only
/// pool-level mutable state is the atomic active count.
pub struct Pool<'a, R: Rendezvous> {
    config: &'a Config,
    peers: Vec<Peer<R>>,
    active_count: AtomicUsize,
    clock: &'a dyn Clock,
    sink: &'a dyn EventSink,
    stop: &'a StopSignal,
}

impl<'a, R: Rendezvous> Pool<'a, R> {
    pub fn new(
        config: &'a Config,
        clock: &'a dyn Clock,
        sink: &'a dyn EventSink,
        stop: &'a StopSignal,
    ) -> Self {
        let peers = (0..config.talkers).map(Peer::new).collect();
        Self {
            config,
            peers,
            active_count: AtomicUsize::new(config.talkers),
            clock,
            sink,
            stop,
        }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    pub fn peers(&self) -> &[Peer<R>] {
        &self.peers
    }

    pub fn peer(&self, id: PeerId) -> &Peer<R> {
        &self.peers[id]
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Record one departure, returns how many peers remain
    pub(crate) fn depart(&self) -> usize {
        self.active_count.fetch_sub(1, Ordering::SeqCst) - 1
    }

    /// Stop requested externally or the time budget ran out
    pub fn should_stop(&self) -> bool {
        if self.stop.is_set() {
            return true;
        }
        match self.config.time_budget() {
            Some(budget) => self.clock.elapsed() >= budget,
            None => false,
        }
    }

    pub fn emit(&self, event: Event) {
        self.sink.log(self.clock.elapsed(), event);
    }

    pub fn summaries(&self) -> Vec<PeerSummary> {
        self.peers.iter().map(Peer::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tk_event_sinks::MemoryEventSink;
    use crate::tk_interface::MonotonicClock;
    use crate::tk_semaphore_mode::SemaphoreMode;
    use std::time::Duration;

    struct FixedClock(Duration);

    impl Clock for FixedClock {
        fn elapsed(&self) -> Duration {
            self.0
        }
    }

    #[test]
    fn test_pool_creates_numbered_peers() {
        let config = Config {
            talkers: 5,
            ..Default::default()
        };
        let clock = MonotonicClock::start();
        let sink = MemoryEventSink::new();
        let stop = StopSignal::new();
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &clock, &sink, &stop);

        assert_eq!(pool.peers().len(), 5);
        assert_eq!(pool.active_count(), 5);
        for (i, peer) in pool.peers().iter().enumerate() {
            assert_eq!(peer.id(), i);
        }
    }

    #[test]
    fn test_depart_counts_down() {
        let config = Config {
            talkers: 2,
            ..Default::default()
        };
        let clock = MonotonicClock::start();
        let sink = MemoryEventSink::new();
        let stop = StopSignal::new();
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &clock, &sink, &stop);

        assert_eq!(pool.depart(), 1);
        assert_eq!(pool.depart(), 0);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_should_stop_on_budget_and_signal() {
        let config = Config {
            time_budget_ms: 1000,
            ..Default::default()
        };
        let sink = MemoryEventSink::new();
        let stop = StopSignal::new();

        let early = FixedClock(Duration::from_millis(999));
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &early, &sink, &stop);
        assert!(!pool.should_stop());
        stop.set();
        assert!(pool.should_stop());

        let stop = StopSignal::new();
        let late = FixedClock(Duration::from_millis(1000));
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &late, &sink, &stop);
        assert!(pool.should_stop());
    }

    #[test]
    fn test_unlimited_budget_never_stops() {
        let config = Config {
            time_budget_ms: 0,
            ..Default::default()
        };
        let clock = FixedClock(Duration::from_secs(3600));
        let sink = MemoryEventSink::new();
        let stop = StopSignal::new();
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &clock, &sink, &stop);
        assert!(!pool.should_stop());
    }

    #[test]
    fn test_emit_stamps_elapsed() {
        let config = Config::default();
        let clock = FixedClock(Duration::from_millis(42));
        let sink = MemoryEventSink::new();
        let stop = StopSignal::new();
        let pool: Pool<SemaphoreMode> = Pool::new(&config, &clock, &sink, &stop);

        pool.emit(Event::Joined { peer: 0 });
        assert_eq!(
            sink.records(),
            vec![(Duration::from_millis(42), Event::Joined { peer: 0 })]
        );
    }
}
