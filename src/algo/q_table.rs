use log::trace;
use rand::Rng;

use crate::{
    assert_interval, assert_interval_open_left,
    env::{Direction, GridEnvironment, Position},
    error::{Error, Result},
};

/// Action values for every cell of a grid
///
/// Each in-bounds `(x, y)` holds one score per [`Direction`], indexed by the
/// direction's action index. Scores start at 0 and only change through
/// [`update`](QTable::update) or explicit seeding with [`set`](QTable::set).
///
/// The table is dense and row-major, sized to the grid it was built for.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    width: i32,
    height: i32,
    values: Vec<[f64; Direction::COUNT]>,
    alpha: f64, // learning rate
    gamma: f64, // discount factor
}

impl QTable {
    /// Allocate a zeroed table for a `width x height` grid
    ///
    /// **Panics** if `alpha` is not in `(0,1]`, `gamma` is not in `[0,1]`, or a
    /// dimension is not positive
    pub fn new(width: i32, height: i32, alpha: f64, gamma: f64) -> Self {
        assert_interval_open_left!(alpha, 0.0, 1.0);
        assert_interval!(gamma, 0.0, 1.0);
        assert!(
            width > 0 && height > 0,
            "Table dimensions must be positive, got {width}x{height}."
        );
        Self {
            width,
            height,
            values: vec![[0.0; Direction::COUNT]; (width * height) as usize],
            alpha,
            gamma,
        }
    }

    /// Allocate a zeroed table matching the dimensions of `grid`
    pub fn for_grid(grid: &GridEnvironment, alpha: f64, gamma: f64) -> Self {
        Self::new(grid.width(), grid.height(), alpha, gamma)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        (0 <= x && x < self.width && 0 <= y && y < self.height)
            .then(|| (y * self.width + x) as usize)
    }

    fn checked_offset(&self, x: i32, y: i32) -> Result<usize> {
        self.offset(x, y).ok_or(Error::OutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        })
    }

    /// Scores of all four actions at `(x, y)`
    pub fn get(&self, x: i32, y: i32) -> Result<[f64; Direction::COUNT]> {
        Ok(self.values[self.checked_offset(x, y)?])
    }

    /// Overwrite a single score, e.g. to seed a policy
    pub fn set(&mut self, x: i32, y: i32, action: Direction, value: f64) -> Result<()> {
        let i = self.checked_offset(x, y)?;
        self.values[i][action.index()] = value;
        Ok(())
    }

    /// Highest scoring action at `(x, y)`, or `None` off the table
    ///
    /// Ties are resolved while scanning: each score equal to the best so far
    /// replaces it with probability 1/2. With `n` tied actions the last one wins
    /// half the time, so the draw is deliberately not uniform.
    pub fn best_action<R: Rng + ?Sized>(&self, x: i32, y: i32, rng: &mut R) -> Option<Direction> {
        let scores = &self.values[self.offset(x, y)?];
        let mut best = 0;
        for i in 1..scores.len() {
            if scores[i] > scores[best] || (scores[i] == scores[best] && rng.gen_bool(0.5)) {
                best = i;
            }
        }
        Direction::from_index(best)
    }

    /// Apply the one-step Q-learning update to `(state, action)` and return the new score
    ///
    /// Q(s,a) ← Q(s,a) + α[r + γ Q(s',a*) - Q(s,a)], where a* is the
    /// [best action](QTable::best_action) in s'.
    ///
    /// If `next_state` is off the table there is no a*, and the score is set to 0
    /// whatever its previous value and the reward.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        state: Position,
        action: Direction,
        reward: f64,
        next_state: Position,
        rng: &mut R,
    ) -> Result<f64> {
        let i = self.checked_offset(state.x, state.y)?;
        let old_value = self.values[i][action.index()];

        let new_value = match self.best_action(next_state.x, next_state.y, rng) {
            Some(best) => {
                let next = self.get(next_state.x, next_state.y)?;
                let next_max = next[best.index()];
                old_value + self.alpha * (reward + self.gamma * next_max - old_value)
            }
            None => 0.0,
        };

        trace!("Q{state}[{action:?}]: {old_value} -> {new_value} (reward {reward})");
        self.values[i][action.index()] = new_value;
        Ok(new_value)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};
    use statrs::distribution::{ChiSquared, ContinuousCDF};

    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn chi_squared(observed: &[u32], probs: &[f64], n: u32) -> f64 {
        observed
            .iter()
            .zip(probs)
            .map(|(&o, &p)| {
                let e = p * n as f64;
                (o as f64 - e).powi(2) / e
            })
            .sum()
    }

    #[test]
    fn starts_zeroed() {
        let table = QTable::new(3, 2, 0.5, 0.9);
        for x in 0..3 {
            for y in 0..2 {
                assert_eq!(table.get(x, y).unwrap(), [0.0; 4]);
            }
        }
    }

    #[test]
    fn get_and_set_reject_out_of_range() {
        let mut table = QTable::new(3, 2, 0.5, 0.9);
        assert!(matches!(table.get(3, 0), Err(Error::OutOfRange { x: 3, y: 0, .. })));
        assert!(matches!(table.get(0, -1), Err(Error::OutOfRange { .. })));
        assert!(table.set(-1, 0, Direction::East, 1.0).is_err());
    }

    #[test]
    fn best_action_picks_unique_max() {
        let mut table = QTable::new(2, 2, 0.5, 0.9);
        table.set(1, 1, Direction::South, 0.3).unwrap();
        table.set(1, 1, Direction::West, -0.2).unwrap();
        let mut rng = rng();
        for _ in 0..50 {
            assert_eq!(table.best_action(1, 1, &mut rng), Some(Direction::South));
        }
    }

    #[test]
    fn best_action_is_none_out_of_bounds() {
        let table = QTable::new(2, 2, 0.5, 0.9);
        let mut rng = rng();
        for (x, y) in [(-1, 0), (0, -1), (2, 0), (0, 2), (5, 5)] {
            assert_eq!(table.best_action(x, y, &mut rng), None, "({x}, {y})");
        }
    }

    #[test]
    fn update_matches_formula() {
        let (alpha, gamma) = (0.8, 0.6);
        let cases = [(0.0, 0.0, 2.0), (0.5, -1.0, 0.0), (-0.3, 10.0, 1.5), (1.2, -1.0, -0.7)];
        let mut rng = rng();
        for (old, reward, next_max) in cases {
            let mut table = QTable::new(2, 1, alpha, gamma);
            let state = Position::new(0, 0);
            let next = Position::new(1, 0);
            table.set(0, 0, Direction::East, old).unwrap();
            for dir in [Direction::North, Direction::East, Direction::South, Direction::West] {
                table.set(1, 0, dir, next_max - 1.0).unwrap();
            }
            table.set(1, 0, Direction::South, next_max).unwrap();

            let value = table.update(state, Direction::East, reward, next, &mut rng).unwrap();
            let expected = old + alpha * (reward + gamma * next_max - old);
            assert_eq!(value, expected, "old {old}, reward {reward}, next max {next_max}");
            assert_eq!(table.get(0, 0).unwrap()[Direction::East.index()], expected);
        }
    }

    #[test]
    fn off_grid_successor_zeroes_entry() {
        let mut table = QTable::new(2, 2, 0.8, 0.6);
        let mut rng = rng();
        for (old, reward) in [(3.5, -1.0), (-2.0, 10.0), (0.7, 0.0)] {
            table.set(0, 0, Direction::West, old).unwrap();
            let value = table
                .update(Position::new(0, 0), Direction::West, reward, Position::new(-1, 0), &mut rng)
                .unwrap();
            assert_eq!(value, 0.0, "old {old}, reward {reward}");
            assert_eq!(table.get(0, 0).unwrap()[Direction::West.index()], 0.0);
        }
    }

    #[test]
    fn update_from_off_grid_state_fails() {
        let mut table = QTable::new(2, 2, 0.8, 0.6);
        let res = table.update(Position::new(2, 0), Direction::East, 0.0, Position::new(1, 0), &mut rng());
        assert!(matches!(res, Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn streaming_tie_break_distribution() {
        const TRIALS: u32 = 8000;
        let table = QTable::new(1, 1, 0.5, 0.5);
        let mut rng = rng();
        let mut counts = [0u32; 4];
        for _ in 0..TRIALS {
            let best = table.best_action(0, 0, &mut rng).unwrap();
            counts[best.index()] += 1;
        }

        let critical = ChiSquared::new(3.0).unwrap().inverse_cdf(0.999);
        let streaming = chi_squared(&counts, &[0.125, 0.125, 0.25, 0.5], TRIALS);
        assert!(
            streaming < critical,
            "Counts {counts:?} fit the streaming model (χ² = {streaming}, critical {critical})"
        );
        let uniform = chi_squared(&counts, &[0.25; 4], TRIALS);
        assert!(
            uniform > critical,
            "Counts {counts:?} are not uniform (χ² = {uniform})"
        );
    }

    #[test]
    fn two_way_tie_is_even() {
        const TRIALS: u32 = 4000;
        let mut table = QTable::new(1, 1, 0.5, 0.5);
        table.set(0, 0, Direction::East, 1.0).unwrap();
        table.set(0, 0, Direction::West, 1.0).unwrap();
        let mut rng = rng();
        let mut counts = [0u32; 4];
        for _ in 0..TRIALS {
            counts[table.best_action(0, 0, &mut rng).unwrap().index()] += 1;
        }
        assert_eq!(counts[0] + counts[2], 0, "Lower scores never win");
        let critical = ChiSquared::new(1.0).unwrap().inverse_cdf(0.999);
        let stat = chi_squared(&[counts[1], counts[3]], &[0.5, 0.5], TRIALS);
        assert!(stat < critical, "Counts {counts:?} split evenly (χ² = {stat})");
    }

    #[test]
    #[should_panic(expected = "Invalid value for `alpha`")]
    fn zero_learning_rate_panics() {
        QTable::new(1, 1, 0.0, 0.5);
    }
}
