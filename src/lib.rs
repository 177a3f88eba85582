//! Tabular Q-learning for agents searching a grid for its exit
//!
//! A [`LearningAgent`](algo::LearningAgent) is placed on a shared
//! [`GridEnvironment`](env::GridEnvironment) and ticked by a host. Each tick it
//! picks a direction with an epsilon-greedy policy, learns from the reward, and
//! moves, returns to its start, or leaves the simulation at an exit.

/// Q-table and the learning agent
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Grid, positions, and movement
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// Grid loading from raster files
pub mod raster;

/// Simulation host
pub mod sim;

mod util;

pub use error::{Error, Result};
