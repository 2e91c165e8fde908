use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// index into the pool - talkers are numbered 0..N
pub type PeerId = usize;

// all durations in the simulation are whole milliseconds
pub type Millis = u64;

// ============================================================================
// Event Logging System
// ============================================================================

/// Events emitted by the talkers for logging and analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Worker for the peer has been started
    Joined { peer: PeerId },
    /// Caller deposited a call and now waits for pickup
    Dialing { caller: PeerId, callee: PeerId },
    /// Callee drained a call and is about to acknowledge it
    Answering { callee: PeerId, caller: PeerId },
    /// Target was inactive, busy or already had a call waiting
    LineBusy { target: PeerId, caller: PeerId },
    /// Caller gave up after its attempt budget
    AttemptsExhausted { caller: PeerId, attempts: usize },
    /// Conversation interval started, reported once by each side
    ConversationStarted {
        peer: PeerId,
        other: PeerId,
        duration_ms: Millis,
    },
    /// Conversation interval ended, reported once by each side
    ConversationFinished {
        peer: PeerId,
        other: PeerId,
        duration_ms: Millis,
    },
    /// Peer left the pool for good
    Disconnected { peer: PeerId, remaining: usize },
    /// The last active peer is gone
    LastFinished,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Joined { peer } => write!(f, "talker {} joined", peer),
            Event::Dialing { caller, callee } => write!(f, "talker {} dials {}", caller, callee),
            Event::Answering { callee, caller } => {
                write!(f, "talker {} answers call from {}", callee, caller)
            }
            Event::LineBusy { target, caller } => {
                write!(f, "line {} is busy for {}", target, caller)
            }
            Event::AttemptsExhausted { caller, attempts } => {
                write!(f, "talker {} gave up after {} attempts", caller, attempts)
            }
            Event::ConversationStarted {
                peer,
                other,
                duration_ms,
            } => write!(f, "conversation {} <-> {} ({} ms)", peer, other, duration_ms),
            Event::ConversationFinished {
                peer,
                other,
                duration_ms,
            } => write!(
                f,
                "talker {} finished conversation with {} ({} ms)",
                peer, other, duration_ms
            ),
            Event::Disconnected { peer, remaining } => {
                write!(f, "talker {} disconnected ({} remaining)", peer, remaining)
            }
            Event::LastFinished => write!(f, "last talker finished"),
        }
    }
}

/// Trait for consuming events from the talkers
///
/// Sinks are shared by every worker thread, so `log` takes `&self` and
/// implementations serialise internally where they need to.
pub trait EventSink: Send + Sync {
    fn log(&self, elapsed: Duration, event: Event);
}

/// No-op event sink (zero overhead)
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&self, _elapsed: Duration, _event: Event) {}
}

// ============================================================================
// Clock
// ============================================================================

/// Monotonic time source measured from the start of the simulation
pub trait Clock: Send + Sync {
    fn elapsed(&self) -> Duration;
}

/// Clock backed by `Instant`, started when constructed
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

// ============================================================================
// Cooperative cancellation
// ============================================================================

/// Cooperative stop flag shared between the driver and its owner
///
/// Cloning hands out another reference to the same flag. Workers poll it at
/// loop boundaries and between call attempts; nothing is ever interrupted.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request every worker to wind down
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_shared_between_clones() {
        let stop = StopSignal::new();
        let handle = stop.clone();
        assert!(!handle.is_set());

        stop.set();
        assert!(handle.is_set());
    }

    #[test]
    fn test_event_lines() {
        let event = Event::ConversationStarted {
            peer: 0,
            other: 3,
            duration_ms: 250,
        };
        assert_eq!(event.to_string(), "conversation 0 <-> 3 (250 ms)");

        let event = Event::Disconnected {
            peer: 2,
            remaining: 1,
        };
        assert_eq!(event.to_string(), "talker 2 disconnected (1 remaining)");
    }

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::start();
        let first = clock.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.elapsed() > first);
    }
}
