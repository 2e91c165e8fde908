// Talker worker loop
//
// One `Talker` runs on its own thread for every peer in the pool:
//
//   Idle -> Draining -> { Waiting | Calling } -> Conversing -> Idle
//
// with a terminal Left state. The leave decision is made once per loop
// iteration, whether or not a conversation happened in it.

use std::thread;
use std::time::Duration;

use log::debug;
use rand::rngs::StdRng;

use crate::tk_interface::{Event, Millis, PeerId};
use crate::tk_peer::Peer;
use crate::tk_pool::Pool;
use crate::tk_random::{chance, coin_flip, random_peer_except, random_range};
use crate::tk_rendezvous::Rendezvous;

/// How long a talker waits for a fresh incoming call before re-checking
pub const INCOMING_WAIT: Duration = Duration::from_millis(100);

pub struct Talker<'p, 'a, R: Rendezvous> {
    pool: &'p Pool<'a, R>,
    peer: &'p Peer<R>,
    rng: StdRng,
}

impl<'p, 'a, R: Rendezvous> Talker<'p, 'a, R> {
    pub fn new(pool: &'p Pool<'a, R>, id: PeerId, rng: StdRng) -> Self {
        Self {
            pool,
            peer: pool.peer(id),
            rng,
        }
    }

    /// Run the worker until the peer leaves or the simulation stops
    pub fn run(mut self) {
        let config = self.pool.config();
        let mut leaving = false;

        while self.peer.is_active() && !self.pool.should_stop() {
            let pause = random_range(&mut self.rng, config.min_idle_ms, config.max_idle_ms);
            sleep_ms(pause);

            // incoming calls take priority over our own
            self.drain_incoming();
            if !self.peer.is_active() || self.pool.should_stop() {
                break;
            }

            if coin_flip(&mut self.rng) {
                R::wait_incoming(self.peer, INCOMING_WAIT);
                self.drain_incoming();
            } else {
                self.place_call();
            }

            if self.should_leave() {
                leaving = true;
                break;
            }
        }

        self.shut_down(leaving);
    }

    fn should_leave(&mut self) -> bool {
        if self.call_limit_reached() {
            return true;
        }
        chance(&mut self.rng, self.pool.config().leave_probability)
    }

    fn call_limit_reached(&self) -> bool {
        self.pool
            .config()
            .call_limit()
            .map_or(false, |limit| self.peer.conversations() >= limit)
    }

    // ========================================================================
    // Callee side
    // ========================================================================

    /// Service every call waiting in this peer's mailbox
    fn drain_incoming(&mut self) {
        while R::drain(self.peer.signals()) {
            let Some(call) = self.peer.take_pending() else {
                break;
            };
            let caller = self.pool.peer(call.caller);

            self.pool.emit(Event::Answering {
                callee: self.peer.id(),
                caller: call.caller,
            });
            R::acknowledge(caller.signals(), &call.link);

            self.converse(call.caller, call.duration_ms);
        }
    }

    // ========================================================================
    // Caller side
    // ========================================================================

    /// Try to reach an idle peer; returns true if a conversation took place
    fn place_call(&mut self) -> bool {
        if self.call_limit_reached() || !self.peer.claim_self() {
            return false;
        }

        let config = self.pool.config();
        let duration = random_range(&mut self.rng, config.min_call_ms, config.max_call_ms);
        let me = self.peer.id();
        let mut attempts = 0;

        while attempts < config.call_attempts() {
            if self.pool.should_stop() {
                break;
            }
            let Some(target) = random_peer_except(&mut self.rng, config.talkers, me) else {
                break;
            };
            attempts += 1;

            let Some(link) = self.pool.peer(target).try_deposit(me, duration) else {
                self.pool.emit(Event::LineBusy { target, caller: me });
                continue;
            };

            self.pool.emit(Event::Dialing {
                caller: me,
                callee: target,
            });
            R::await_acknowledgment(self.peer.signals(), link);

            if !self.peer.is_active() {
                debug!("talker {} went inactive while dialing {}", me, target);
                self.peer.release();
                return false;
            }
            self.converse(target, duration);
            return true;
        }

        self.peer.release();
        self.pool.emit(Event::AttemptsExhausted {
            caller: me,
            attempts,
        });
        false
    }

    // ========================================================================
    // Both sides
    // ========================================================================

    fn converse(&mut self, other: PeerId, duration_ms: Millis) {
        let me = self.peer.id();
        self.pool.emit(Event::ConversationStarted {
            peer: me,
            other,
            duration_ms,
        });
        sleep_ms(duration_ms);

        self.peer.finish_conversation();
        self.pool.emit(Event::ConversationFinished {
            peer: me,
            other,
            duration_ms,
        });
    }

    /// Close the line, leave if asked to, and answer anything deposited before the close
    fn shut_down(&mut self, leaving: bool) {
        let me = self.peer.id();
        let departed = self.peer.close(leaving);

        let remaining = departed.then(|| self.pool.depart());
        if let Some(remaining) = remaining {
            self.pool.emit(Event::Disconnected {
                peer: me,
                remaining,
            });
        }

        // no deposit can arrive after close, so this empties the mailbox for good
        self.drain_incoming();

        if remaining == Some(0) {
            self.pool.emit(Event::LastFinished);
        }
        debug!("talker {} stopped after {} conversations", me, self.peer.conversations());
    }
}

fn sleep_ms(ms: Millis) {
    thread::sleep(Duration::from_millis(ms));
}
