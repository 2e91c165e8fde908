// Simulation driver
//
// Builds the pool, spawns one scoped thread per talker and joins them all
// when the last worker returns. The configuration is expected to be
// validated by the caller (see `Config::validate`).

use std::thread;
use std::time::Duration;

use log::info;
use rand::Rng;

use crate::tk_condition_mode::ConditionMode;
use crate::tk_config::{Config, SyncMode};
use crate::tk_interface::{Clock, Event, EventSink, MonotonicClock, PeerId, StopSignal};
use crate::tk_peer::PeerSummary;
use crate::tk_pool::Pool;
use crate::tk_random::worker_rngs;
use crate::tk_rendezvous::Rendezvous;
use crate::tk_semaphore_mode::SemaphoreMode;
use crate::tk_talker::Talker;

// ============================================================================
// Simulation Result
// ============================================================================

/// Final state of a finished run
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub mode: SyncMode,

    /// Random seed used
    pub seed_used: u64,

    /// Wall-clock time from start until every worker was joined
    pub elapsed: Duration,

    /// Peers that never left
    pub active_count: usize,

    pub peers: Vec<PeerSummary>,
}

impl SimulationReport {
    /// Sum of per-peer conversation counts (two per conversation)
    pub fn total_endpoints(&self) -> u64 {
        self.peers.iter().map(|p| u64::from(p.conversations)).sum()
    }

    pub fn completed_conversations(&self) -> u64 {
        self.total_endpoints() / 2
    }

    /// Peers still marked busy or holding an undrained call
    pub fn orphaned_claims(&self) -> Vec<PeerId> {
        self.peers
            .iter()
            .filter(|p| p.busy || p.has_pending)
            .map(|p| p.id)
            .collect()
    }

    pub fn print_summary(&self) {
        println!("=== Simulation Summary ===");
        println!("  Mode: {}", self.mode);
        println!("  Seed: {}", self.seed_used);
        println!("  Elapsed: {} ms", self.elapsed.as_millis());
        println!("  Talkers: {} ({} still active)", self.peers.len(), self.active_count);
        println!("  Conversations: {}", self.completed_conversations());
        for peer in &self.peers {
            println!(
                "    talker {:>2}: {:>4} conversations, {}",
                peer.id,
                peer.conversations,
                if peer.active { "active" } else { "left" }
            );
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Run one simulation with the strategy selected by `mode`
pub fn run_simulation(
    config: &Config,
    mode: SyncMode,
    sink: &dyn EventSink,
    stop: &StopSignal,
) -> SimulationReport {
    match mode {
        SyncMode::Semaphore => run_with::<SemaphoreMode>(config, sink, stop),
        SyncMode::Condition => run_with::<ConditionMode>(config, sink, stop),
    }
}

/// Run one simulation with a statically chosen strategy
pub fn run_with<R: Rendezvous>(
    config: &Config,
    sink: &dyn EventSink,
    stop: &StopSignal,
) -> SimulationReport {
    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let clock = MonotonicClock::start();
    let pool: Pool<R> = Pool::new(config, &clock, sink, stop);

    info!(
        "starting {} talkers, mode {}, seed {}",
        config.talkers,
        R::MODE,
        seed
    );

    thread::scope(|s| {
        for (id, rng) in worker_rngs(seed, config.talkers).into_iter().enumerate() {
            let pool = &pool;
            pool.emit(Event::Joined { peer: id });
            s.spawn(move || Talker::new(pool, id, rng).run());
        }
    });

    let report = SimulationReport {
        mode: R::MODE,
        seed_used: seed,
        elapsed: clock.elapsed(),
        active_count: pool.active_count(),
        peers: pool.summaries(),
    };
    info!(
        "all talkers joined after {} ms, {} conversations",
        report.elapsed.as_millis(),
        report.completed_conversations()
    );
    report
}
