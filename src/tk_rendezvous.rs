// Rendezvous strategy abstraction
//
// The peer/pool/worker logic is written once against this trait; the two
// strategies only decide how a deposited call is announced to the callee and
// how both sides agree that the conversation starts now.

use std::time::Duration;

use crate::tk_config::SyncMode;
use crate::tk_peer::Peer;

/// Synchronization mechanism behind the call handshake
///
/// Call sequence for one conversation:
///
/// 1. caller: `open_link`, stores one half in the callee's pending call and
///    calls `deposit` while still holding the callee's lock
/// 2. callee: `drain` says whether to look at its mailbox, takes the call
/// 3. callee: `acknowledge` (lock released)
/// 4. caller: `await_acknowledgment` returns; both sides start talking
pub trait Rendezvous: Sized + Send + Sync + 'static {
    /// Per-peer handles, owned by the peer and never shared by value
    type Signals: Default + Send + Sync;

    /// Per-call object travelling in the pending call record
    type Link: Send;

    const MODE: SyncMode;

    /// Create the call's link; first half stays with the caller, second goes to the callee
    fn open_link() -> (Self::Link, Self::Link);

    /// Announce a freshly deposited call to the callee
    fn deposit(callee: &Self::Signals);

    /// Non-blocking: should the callee take a call from its mailbox now
    fn drain(callee: &Self::Signals) -> bool;

    /// Idle-wait up to `timeout` for a call to arrive
    fn wait_incoming(callee: &Peer<Self>, timeout: Duration);

    /// Callee side: confirm pickup to the caller
    fn acknowledge(caller: &Self::Signals, link: &Self::Link);

    /// Caller side: block until the callee confirmed pickup
    fn await_acknowledgment(caller: &Self::Signals, link: Self::Link);
}
