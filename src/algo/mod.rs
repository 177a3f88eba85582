pub mod agent;
pub mod q_table;

pub use agent::{LearningAgent, LearningAgentConfig, Outcome, ResetReason, Status, Transition};
pub use q_table::QTable;
