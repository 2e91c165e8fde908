use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::tk_interface::{Millis, PeerId};
use crate::tk_rendezvous::Rendezvous;

// ============================================================================
// Peer State
// ============================================================================

/// A deposited, not yet drained call
#[derive(Debug)]
pub struct PendingCall<L> {
    pub caller: PeerId,
    pub duration_ms: Millis,
    pub link: L,
}

/// Fields guarded by the peer's own lock
#[derive(Debug)]
pub struct PeerState<L> {
    /// False once the peer left the pool; never reset
    pub(crate) active: bool,
    /// False once the worker stopped taking calls
    pub(crate) accepting: bool,
    /// Committed to exactly one claim or conversation
    pub(crate) busy: bool,
    pub(crate) pending: Option<PendingCall<L>>,
}

impl<L> PeerState<L> {
    fn new() -> Self {
        Self {
            active: true,
            accepting: true,
            busy: false,
            pending: None,
        }
    }

    /// Can a caller deposit a call here right now
    pub fn is_available(&self) -> bool {
        self.active && self.accepting && !self.busy && self.pending.is_none()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Point-in-time view of a peer, taken under its lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSummary {
    pub id: PeerId,
    pub active: bool,
    pub busy: bool,
    pub has_pending: bool,
    pub conversations: u32,
}

// ============================================================================
// Peer
// ============================================================================

/// One talker: identity, lock-guarded line state and strategy handles
///
/// Lock discipline: a worker only ever holds one peer lock at a time and never
/// across a sleep or a rendezvous wait.
pub struct Peer<R: Rendezvous> {
    id: PeerId,
    state: Mutex<PeerState<R::Link>>,
    signals: R::Signals,
    // only the peer's own worker increments this
    conversations: AtomicU32,
}

impl<R: Rendezvous> Peer<R> {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            state: Mutex::new(PeerState::new()),
            signals: R::Signals::default(),
            conversations: AtomicU32::new(0),
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn signals(&self) -> &R::Signals {
        &self.signals
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, PeerState<R::Link>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn conversations(&self) -> u32 {
        self.conversations.load(Ordering::SeqCst)
    }

    /// Mark self busy before dialing out
    ///
    /// Fails when somebody already claimed this line or the line is closed,
    /// which keeps two peers from dialing each other at the same time.
    pub(crate) fn claim_self(&self) -> bool {
        let mut state = self.lock();
        if !state.is_available() {
            return false;
        }
        state.busy = true;
        true
    }

    pub(crate) fn release(&self) {
        self.lock().busy = false;
    }

    /// Caller side claim: deposit a call if the line is free
    ///
    /// On success the target is busy, holds the pending call and has been
    /// signalled; the caller gets back its half of the call link.
    pub(crate) fn try_deposit(&self, caller: PeerId, duration_ms: Millis) -> Option<R::Link> {
        let mut state = self.lock();
        if !state.is_available() {
            return None;
        }
        let (kept, sent) = R::open_link();
        state.busy = true;
        state.pending = Some(PendingCall {
            caller,
            duration_ms,
            link: sent,
        });
        R::deposit(&self.signals);
        Some(kept)
    }

    /// Read and clear the pending call
    pub(crate) fn take_pending(&self) -> Option<PendingCall<R::Link>> {
        self.lock().pending.take()
    }

    /// Finish a conversation: free the line and count it
    pub(crate) fn finish_conversation(&self) -> u32 {
        self.release();
        self.conversations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Stop taking calls; when `leaving`, also leave the pool for good
    ///
    /// Returns true if this call is the one that flipped `active`.
    pub(crate) fn close(&self, leaving: bool) -> bool {
        let mut state = self.lock();
        state.accepting = false;
        if leaving && state.active {
            state.active = false;
            return true;
        }
        false
    }

    pub fn summary(&self) -> PeerSummary {
        let state = self.lock();
        PeerSummary {
            id: self.id,
            active: state.active,
            busy: state.busy,
            has_pending: state.has_pending(),
            conversations: self.conversations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tk_semaphore_mode::SemaphoreMode;

    #[test]
    fn test_new_peer_is_available() {
        let peer: Peer<SemaphoreMode> = Peer::new(3);
        assert_eq!(peer.id(), 3);
        assert!(peer.is_active());
        assert!(peer.lock().is_available());
        assert_eq!(peer.conversations(), 0);
    }

    #[test]
    fn test_deposit_claims_line_once() {
        let peer: Peer<SemaphoreMode> = Peer::new(1);
        assert!(peer.try_deposit(0, 120).is_some());

        // Second caller must see the line busy
        assert!(peer.try_deposit(2, 80).is_none());

        let summary = peer.summary();
        assert!(summary.busy);
        assert!(summary.has_pending);
        assert_eq!(peer.signals().incoming_ready.available(), 1);
    }

    #[test]
    fn test_take_pending_keeps_busy_until_finished() {
        let peer: Peer<SemaphoreMode> = Peer::new(1);
        peer.try_deposit(0, 120).unwrap();

        let call = peer.take_pending().unwrap();
        assert_eq!(call.caller, 0);
        assert_eq!(call.duration_ms, 120);
        assert!(peer.take_pending().is_none());

        // Drained but still talking: nobody else may deposit
        assert!(peer.try_deposit(2, 80).is_none());

        assert_eq!(peer.finish_conversation(), 1);
        assert!(!peer.summary().busy);
        assert!(peer.try_deposit(2, 80).is_some());
    }

    #[test]
    fn test_claim_self_blocks_incoming() {
        let peer: Peer<SemaphoreMode> = Peer::new(0);
        assert!(peer.claim_self());
        assert!(!peer.claim_self());
        assert!(peer.try_deposit(1, 50).is_none());

        peer.release();
        assert!(peer.try_deposit(1, 50).is_some());
        // Line with a waiting call cannot dial out
        assert!(!peer.claim_self());
    }

    #[test]
    fn test_close_is_terminal() {
        let peer: Peer<SemaphoreMode> = Peer::new(0);
        assert!(peer.close(true));
        assert!(!peer.close(true));
        assert!(!peer.is_active());
        assert!(peer.try_deposit(1, 50).is_none());
        assert!(!peer.claim_self());
    }

    #[test]
    fn test_close_without_leaving_stays_active() {
        let peer: Peer<SemaphoreMode> = Peer::new(0);
        assert!(!peer.close(false));
        assert!(peer.is_active());
        assert!(peer.try_deposit(1, 50).is_none());
    }
}
