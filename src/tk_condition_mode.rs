// Wait/notify rendezvous with a per-call barrier
//
// The callee's mailbox is its lock-guarded pending call; `incoming` is
// notified whenever a call is deposited so an idle-waiting callee wakes up.
// Acceptance is a symmetric two-party barrier created for the call: caller
// and callee both wait on it and are released together. The barrier is
// shared by both halves of the link and freed when the last half is dropped.

use std::sync::{Arc, Barrier, Condvar, PoisonError};
use std::time::Duration;

use crate::tk_config::SyncMode;
use crate::tk_peer::Peer;
use crate::tk_rendezvous::Rendezvous;

#[derive(Debug, Default)]
pub struct ConditionSignals {
    /// Notified on deposit; waited on together with the peer's own lock
    pub incoming: Condvar,
}

/// Strategy B: condition variable mailbox plus a barrier per call
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionMode;

impl Rendezvous for ConditionMode {
    type Signals = ConditionSignals;
    type Link = Arc<Barrier>;

    const MODE: SyncMode = SyncMode::Condition;

    fn open_link() -> (Arc<Barrier>, Arc<Barrier>) {
        let barrier = Arc::new(Barrier::new(2));
        (Arc::clone(&barrier), barrier)
    }

    fn deposit(callee: &ConditionSignals) {
        callee.incoming.notify_one();
    }

    // the mailbox itself is checked under the lock by the caller of `drain`
    fn drain(_callee: &ConditionSignals) -> bool {
        true
    }

    fn wait_incoming(callee: &Peer<Self>, timeout: Duration) {
        let state = callee.lock();
        let _ = callee
            .signals()
            .incoming
            .wait_timeout_while(state, timeout, |state| state.pending.is_none())
            .unwrap_or_else(PoisonError::into_inner);
    }

    fn acknowledge(_caller: &ConditionSignals, link: &Arc<Barrier>) {
        link.wait();
    }

    fn await_acknowledgment(_caller: &ConditionSignals, link: Arc<Barrier>) {
        link.wait();
    }
}
