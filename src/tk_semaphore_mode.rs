// Signal-counting rendezvous
//
// Each talker owns two counters. `incoming_ready` is posted by a caller after
// it deposited a call; `call_ack` is posted by the callee once it picked the
// call up. The call record itself travels through the callee's lock-guarded
// mailbox, so the link carries nothing.

use std::time::Duration;

use crate::tk_config::SyncMode;
use crate::tk_peer::Peer;
use crate::tk_rendezvous::Rendezvous;
use crate::tk_signal::SignalCounter;

#[derive(Debug, Default)]
pub struct SemaphoreSignals {
    /// One post per deposited call
    pub incoming_ready: SignalCounter,
    /// One post per pickup of a call this peer placed
    pub call_ack: SignalCounter,
}

/// Strategy A: two counted signals per peer
#[derive(Debug, Clone, Copy, Default)]
pub struct SemaphoreMode;

impl Rendezvous for SemaphoreMode {
    type Signals = SemaphoreSignals;
    type Link = ();

    const MODE: SyncMode = SyncMode::Semaphore;

    fn open_link() -> ((), ()) {
        ((), ())
    }

    fn deposit(callee: &SemaphoreSignals) {
        callee.incoming_ready.post();
    }

    fn drain(callee: &SemaphoreSignals) -> bool {
        callee.incoming_ready.try_wait()
    }

    fn wait_incoming(callee: &Peer<Self>, timeout: Duration) {
        callee.signals().incoming_ready.wait_available(timeout);
    }

    fn acknowledge(caller: &SemaphoreSignals, _link: &()) {
        caller.call_ack.post();
    }

    fn await_acknowledgment(caller: &SemaphoreSignals, _link: ()) {
        caller.call_ack.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_drain_follows_deposits() {
        let callee: Peer<SemaphoreMode> = Peer::new(1);
        assert!(!SemaphoreMode::drain(callee.signals()));

        callee.try_deposit(0, 40).unwrap();
        assert!(SemaphoreMode::drain(callee.signals()));
        assert!(!SemaphoreMode::drain(callee.signals()));
    }

    #[test]
    fn test_wait_incoming_times_out_without_call() {
        let callee: Peer<SemaphoreMode> = Peer::new(1);
        let start = Instant::now();
        SemaphoreMode::wait_incoming(&callee, Duration::from_millis(30));
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn test_handshake_across_threads() {
        let caller: Peer<SemaphoreMode> = Peer::new(0);
        let callee: Peer<SemaphoreMode> = Peer::new(1);

        thread::scope(|s| {
            let link = callee.try_deposit(caller.id(), 25).unwrap();

            s.spawn(|| {
                SemaphoreMode::wait_incoming(&callee, Duration::from_secs(1));
                assert!(SemaphoreMode::drain(callee.signals()));
                let call = callee.take_pending().unwrap();
                assert_eq!(call.caller, 0);
                SemaphoreMode::acknowledge(caller.signals(), &call.link);
            });

            SemaphoreMode::await_acknowledgment(caller.signals(), link);
        });

        assert_eq!(caller.signals().call_ack.available(), 0);
        assert!(callee.take_pending().is_none());
    }
}
