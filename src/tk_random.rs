// Random draws used by the talkers
//
// Every worker owns its own `StdRng`, derived from the run seed, so no
// generator is shared between threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tk_interface::{Millis, PeerId};

/// Uniform value in `[min, max]`; collapses to `min` when the range is empty
pub fn random_range(rng: &mut StdRng, min: Millis, max: Millis) -> Millis {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// True with probability `p`; `0.0` never fires, `1.0` always does
pub fn chance(rng: &mut StdRng, p: f64) -> bool {
    rng.gen::<f64>() < p
}

pub fn coin_flip(rng: &mut StdRng) -> bool {
    rng.gen::<bool>()
}

/// Uniform peer id in `0..peers` other than `me`, `None` when there is nobody else
pub fn random_peer_except(rng: &mut StdRng, peers: usize, me: PeerId) -> Option<PeerId> {
    if peers < 2 {
        return None;
    }
    let pick = rng.gen_range(0..peers - 1);
    Some(if pick >= me { pick + 1 } else { pick })
}

/// One independent generator per talker, all derived from `seed`
pub fn worker_rngs(seed: u64, talkers: usize) -> Vec<StdRng> {
    let mut master = StdRng::seed_from_u64(seed);
    (0..talkers)
        .map(|_| StdRng::seed_from_u64(master.gen()))
        .collect()
}
