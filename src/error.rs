use thiserror::Error;

use crate::env::AgentId;

/// Errors raised by the grid, the Q-table, and the agents that use them
///
/// Boundary and obstacle encounters inside a tick are ordinary rewards, not errors.
/// These variants cover direct API misuse and broken host contracts.
#[derive(Debug, Error)]
pub enum Error {
    /// A coordinate lies outside `[0,width) x [0,height)`
    #[error("Coordinate ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfRange {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },

    /// A spatial index operation named an occupant that is not indexed
    #[error("Agent {0} is not indexed in the grid")]
    NotIndexed(AgentId),

    /// An occupant was inserted twice
    #[error("Agent {0} is already indexed in the grid")]
    AlreadyIndexed(AgentId),

    /// The host ticked an agent that already left the simulation
    #[error("Agent {0} was already removed from the simulation")]
    AgentRemoved(AgentId),

    /// Exploitation was requested for a state with no best action
    #[error("No best action is defined for state ({x}, {y})")]
    PolicyUndefined { x: i32, y: i32 },

    /// A decay schedule was constructed with inconsistent parameters
    #[error("Invalid decay schedule: {0}")]
    Decay(&'static str),

    /// A raster asset could not be turned into a grid
    #[error("Invalid raster: {0}")]
    Raster(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
