//! # tkRust - Talker Pool
//!
//! A simulation of "talkers": peers in one process that randomly place and
//! answer calls to each other. Each talker runs on its own thread, idles,
//! answers incoming calls, dials random peers, and eventually leaves the pool.
//!
//! The interesting part is the call handshake. A caller has to find an idle
//! peer, claim it under that peer's lock, hand over the call parameters and
//! then agree with the callee on the moment the conversation starts, without
//! double booking anybody and without deadlocking when two talkers dial each
//! other at the same time.
//!
//! ## Core Components
//!
//! - **Peer**: one talker's lock-guarded line state (active, busy, pending call)
//! - **Pool**: all peers plus the shared active count, clock, sink and stop signal
//! - **Talker**: the per-peer worker loop (idle, drain, wait or call, leave)
//! - **Rendezvous**: the handshake strategy, with two implementations:
//!   - `SemaphoreMode`: two counted signals per peer
//!   - `ConditionMode`: condition variable mailbox plus a barrier per call
//!
//! ## Usage
//!
//! ```no_run
//! use tk_rust::{run_simulation, Config, LoggingEventSink, StopSignal, SyncMode};
//!
//! let config = Config {
//!     talkers: 6,
//!     time_budget_ms: 5_000,
//!     ..Default::default()
//! };
//! config.validate().unwrap();
//!
//! let sink = LoggingEventSink::new(true);
//! let report = run_simulation(&config, SyncMode::Condition, &sink, &StopSignal::new());
//! report.print_summary();
//! ```

// Core modules
pub mod tk_interface;
pub mod tk_peer;
pub mod tk_pool;
pub mod tk_rendezvous;
pub mod tk_talker;
pub mod tk_simulation;

// Rendezvous strategies
pub mod tk_condition_mode;
pub mod tk_semaphore_mode;
pub mod tk_signal;

// Collaborators
pub mod tk_config;
pub mod tk_event_sinks;
pub mod tk_random;

// Re-export commonly used types
pub use tk_config::{Config, ConfigError, SimulationFile, SyncMode, MAX_TALKERS};
pub use tk_event_sinks::{FanOutSink, FileEventSink, LoggingEventSink, MemoryEventSink};
pub use tk_interface::{Clock, Event, EventSink, MonotonicClock, NoOpSink, PeerId, StopSignal};
pub use tk_simulation::{run_simulation, SimulationReport};
