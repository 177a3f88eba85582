use rand::Rng;

use crate::{assert_interval, decay::Decay};

use super::Choice;

/// Epsilon greedy exploration policy with time-decaying epsilon threshold
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<D: Decay> {
    epsilon: D,
}

impl<D: Decay> EpsilonGreedy<D> {
    /// Initialize epsilon greedy policy with a decay strategy
    pub fn new(decay: D) -> Self {
        Self { epsilon: decay }
    }

    /// Epsilon at time `t`
    ///
    /// **Panics** if the schedule leaves the interval `[0,1]`
    pub fn epsilon(&self, t: u32) -> f64 {
        let epsilon = self.epsilon.evaluate(t as f64);
        assert_interval!(epsilon, 0.0, 1.0);
        epsilon
    }

    /// Invoke epsilon greedy policy at time `t`, drawing from the caller's random source
    ///
    /// Explores iff a uniform draw from `[0,1)` falls below epsilon, so an epsilon
    /// of 0 never explores and an epsilon of 1 always does.
    pub fn choose<R: Rng + ?Sized>(&self, t: u32, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon(t) {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
