use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng};

use crate::{
    assert_interval, assert_interval_open_left,
    decay::{self, Decay},
    env::{AgentId, Direction, GridEnvironment, Position},
    error::{Error, Result},
    exploration::{Choice, EpsilonGreedy},
};

use super::QTable;

/// Reward for stepping onto a free cell
pub const STEP_REWARD: f64 = 0.0;
/// Reward for reaching an exit
pub const EXIT_REWARD: f64 = 10.0;
/// Reward for bumping into a blocked cell
pub const BLOCKED_REWARD: f64 = -1.0;
/// Reward for trying to leave the grid
pub const OUT_OF_BOUNDS_REWARD: f64 = -1.0;

/// Configuration for the [`LearningAgent`]
#[derive(Debug, Clone)]
pub struct LearningAgentConfig<D: Decay> {
    /// Exploration policy, evaluated against the number of resets so far
    ///
    /// **Default**: a [`Constant`](decay::Constant) epsilon of `0.2`
    pub exploration: EpsilonGreedy<D>,
    /// Learning rate, in `(0,1]`
    ///
    /// **Default**: `0.8`
    pub alpha: f64,
    /// Discount factor, in `[0,1]`
    ///
    /// **Default**: `0.6`
    pub gamma: f64,
}

impl Default for LearningAgentConfig<decay::Constant> {
    fn default() -> Self {
        Self {
            exploration: EpsilonGreedy::new(decay::Constant::new(0.2)),
            alpha: 0.8,
            gamma: 0.6,
        }
    }
}

impl LearningAgentConfig<decay::Constant> {
    /// Default configuration with a fixed exploration rate
    pub fn with_epsilon(epsilon: f64) -> Self {
        assert_interval!(epsilon, 0.0, 1.0);
        Self {
            exploration: EpsilonGreedy::new(decay::Constant::new(epsilon)),
            ..Default::default()
        }
    }
}

/// Lifecycle of an agent; `Removed` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    OutOfBounds,
    Blocked,
}

/// What a tick did to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stepped onto a free cell
    Moved,
    /// Penalized and sent back to the start
    Reset(ResetReason),
    /// Reached an exit and left the simulation
    Exited,
}

/// Record of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: Position,
    pub action: Direction,
    pub choice: Choice,
    pub reward: f64,
    /// The cell the action pointed at, which may be off the grid
    pub target: Position,
    pub outcome: Outcome,
}

/// Host callback invoked exactly once when an agent leaves the simulation
pub type UnregisterHandle = Box<dyn FnMut(&GridEnvironment, AgentId) + Send>;

/// A tabular Q-learning agent that walks a [`GridEnvironment`] until it finds an exit
///
/// The agent owns its position, its [`QTable`], and its random source. The grid is
/// shared with other occupants and is passed in on every tick.
///
/// ### Generics
/// - `D` - The [`Decay`] schedule of the exploration rate
/// - `R` - The random source used for exploration and tie-breaking
pub struct LearningAgent<D: Decay = decay::Constant, R: Rng = StdRng> {
    id: AgentId,
    position: Position,
    start: Position,
    q_table: QTable,
    exploration: EpsilonGreedy<D>,
    rng: R,
    status: Status,
    ticks: u64,
    resets: u32,
    total_reward: f64,
    unregister: Option<UnregisterHandle>,
}

impl<D: Decay, R: Rng> LearningAgent<D, R> {
    /// Place a new agent on `grid` at `start` and allocate its Q-table
    ///
    /// Fails if `start` is off the grid or `id` is already indexed.
    ///
    /// **Panics** if `alpha` is not in `(0,1]` or `gamma` is not in `[0,1]`
    pub fn init(
        id: AgentId,
        start: Position,
        config: LearningAgentConfig<D>,
        grid: &mut GridEnvironment,
        rng: R,
    ) -> Result<Self> {
        assert_interval_open_left!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        grid.insert(id, start)?;
        debug!("Agent {id} placed at {start}");
        Ok(Self {
            id,
            position: start,
            start,
            q_table: QTable::for_grid(grid, config.alpha, config.gamma),
            exploration: config.exploration,
            rng,
            status: Status::Active,
            ticks: 0,
            resets: 0,
            total_reward: 0.0,
            unregister: None,
        })
    }

    /// Register the callback that tells the host this agent has left
    pub fn with_unregister<F>(mut self, handle: F) -> Self
    where
        F: FnMut(&GridEnvironment, AgentId) + Send + 'static,
    {
        self.unregister = Some(Box::new(handle));
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Number of ticks taken
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of times the agent was sent back to its start
    pub fn resets(&self) -> u32 {
        self.resets
    }

    /// Sum of all rewards received
    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn q_table_mut(&mut self) -> &mut QTable {
        &mut self.q_table
    }

    /// Advance one simulation step: choose an action, learn from its reward, and
    /// move, reset, or leave
    pub fn tick(&mut self, grid: &mut GridEnvironment) -> Result<Transition> {
        if self.status == Status::Removed {
            return Err(Error::AgentRemoved(self.id));
        }
        let (choice, action) = self.choose_action();
        self.attempt_move(grid, choice, action)
    }

    fn choose_action(&mut self) -> (Choice, Direction) {
        match self.exploration.choose(self.resets, &mut self.rng) {
            Choice::Explore => (Choice::Explore, Direction::random(&mut self.rng)),
            Choice::Exploit => match self.exploit() {
                Ok(action) => (Choice::Exploit, action),
                Err(e) => {
                    warn!("Agent {}: {e}, exploring instead", self.id);
                    (Choice::Explore, Direction::random(&mut self.rng))
                }
            },
        }
    }

    fn exploit(&mut self) -> Result<Direction> {
        let Position { x, y } = self.position;
        self.q_table
            .best_action(x, y, &mut self.rng)
            .ok_or(Error::PolicyUndefined { x, y })
    }

    /// Classify the move in `action`, update the table with its reward, and apply it
    fn attempt_move(
        &mut self,
        grid: &mut GridEnvironment,
        choice: Choice,
        action: Direction,
    ) -> Result<Transition> {
        let state = self.position;
        let target = state.step(action);
        let Position { x, y } = target;

        let (reward, outcome) = if !grid.in_bounds(x, y) {
            (OUT_OF_BOUNDS_REWARD, Outcome::Reset(ResetReason::OutOfBounds))
        } else if grid.is_routable(x, y) {
            (STEP_REWARD, Outcome::Moved)
        } else if grid.is_exit(x, y) {
            (EXIT_REWARD, Outcome::Exited)
        } else {
            (BLOCKED_REWARD, Outcome::Reset(ResetReason::Blocked))
        };

        self.q_table.update(state, action, reward, target, &mut self.rng)?;
        self.ticks += 1;
        self.total_reward += reward;

        match outcome {
            Outcome::Moved => {
                self.position = target;
                grid.move_to(self.id, target)?;
                debug!("Agent {} moved to {target}", self.id);
            }
            Outcome::Exited => {
                self.position = target;
                grid.move_to(self.id, target)?;
                info!("Agent {} reached the exit at {target}", self.id);
                self.remove_from_simulation(grid)?;
            }
            Outcome::Reset(ResetReason::OutOfBounds) => {
                debug!("Agent {} tried to leave the grid at {target}", self.id);
                self.reset_to_start(grid)?;
            }
            Outcome::Reset(ResetReason::Blocked) => {
                debug!("Agent {} bumped into blocked cell {target}", self.id);
                self.reset_to_start(grid)?;
            }
        }

        Ok(Transition {
            state,
            action,
            choice,
            reward,
            target,
            outcome,
        })
    }

    /// Send the agent back to its start position, keeping everything it learned
    pub fn reset_to_start(&mut self, grid: &mut GridEnvironment) -> Result<()> {
        self.position = self.start;
        grid.move_to(self.id, self.start)?;
        self.resets += 1;
        debug!("Agent {} reset to {}", self.id, self.start);
        Ok(())
    }

    fn remove_from_simulation(&mut self, grid: &mut GridEnvironment) -> Result<()> {
        info!("Agent {} is removing itself from the simulation", self.id);
        grid.remove(self.id)?;
        self.status = Status::Removed;
        if let Some(mut unregister) = self.unregister.take() {
            unregister(&*grid, self.id);
        }
        Ok(())
    }
}
