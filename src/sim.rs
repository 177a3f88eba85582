//! A sequential host that ticks agents on a shared grid

use std::{
    collections::{hash_map::Entry, HashMap},
    ops::Index,
};

use log::info;
use rand::{rngs::StdRng, Rng};

use crate::{
    algo::{LearningAgent, LearningAgentConfig, Outcome, Transition},
    decay::{self, Decay},
    env::{AgentId, GridEnvironment, Position},
    error::{Error, Result},
};

/// Named metrics accumulated over a run
#[derive(Debug, Clone, Default)]
pub struct Report {
    keys: Vec<&'static str>,
    data: HashMap<&'static str, f64>,
}

impl Report {
    pub fn new(keys: Vec<&'static str>) -> Self {
        let data = keys.iter().map(|&k| (k, 0.0)).collect();
        Self { keys, data }
    }

    pub fn keys(&self) -> &[&'static str] {
        &self.keys
    }

    pub fn entry(&mut self, key: &'static str) -> Entry<'_, &'static str, f64> {
        self.data.entry(key)
    }

    /// Take the current values, leaving every metric at zero
    pub fn take(&mut self) -> HashMap<&'static str, f64> {
        let fresh = self.keys.iter().map(|&k| (k, 0.0)).collect();
        std::mem::replace(&mut self.data, fresh)
    }
}

impl Index<&str> for Report {
    type Output = f64;

    fn index(&self, key: &str) -> &Self::Output {
        &self.data[key]
    }
}

/// Configuration for [`Simulation::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Maximum number of iterations; every active agent ticks once per iteration
    ///
    /// **Default**: `1000`
    pub iterations: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { iterations: 1000 }
    }
}

/// Owns a grid and the agents placed on it, and drives them tick by tick
///
/// Agents are ticked one after another, so the grid never sees concurrent access.
/// Agents that reach an exit are dropped from the registry after their tick.
pub struct Simulation<D: Decay = decay::Constant, R: Rng = StdRng> {
    grid: GridEnvironment,
    agents: Vec<LearningAgent<D, R>>,
    iteration: u64,
    pub report: Report,
}

impl<D: Decay, R: Rng> Simulation<D, R> {
    pub fn new(grid: GridEnvironment) -> Self {
        Self {
            grid,
            agents: Vec::new(),
            iteration: 0,
            report: Report::new(vec!["steps", "reward", "resets", "exits"]),
        }
    }

    pub fn grid(&self) -> &GridEnvironment {
        &self.grid
    }

    /// Mutable access to the grid, for placing agents built outside the simulation
    pub fn grid_mut(&mut self) -> &mut GridEnvironment {
        &mut self.grid
    }

    /// Agents still in the simulation
    pub fn agents(&self) -> &[LearningAgent<D, R>] {
        &self.agents
    }

    /// Iterations executed so far
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Place a new agent on the grid and register it
    pub fn spawn(
        &mut self,
        id: AgentId,
        start: Position,
        config: LearningAgentConfig<D>,
        rng: R,
    ) -> Result<()> {
        let agent = LearningAgent::init(id, start, config, &mut self.grid, rng)?;
        self.agents.push(agent);
        Ok(())
    }

    /// Register an agent already placed on this simulation's grid
    pub fn register(&mut self, agent: LearningAgent<D, R>) -> Result<()> {
        if !agent.is_active() {
            return Err(Error::AgentRemoved(agent.id()));
        }
        if self.grid.position_of(agent.id()) != Some(agent.position()) {
            return Err(Error::NotIndexed(agent.id()));
        }
        self.agents.push(agent);
        Ok(())
    }

    /// Tick every active agent once and deregister those that left
    pub fn step(&mut self) -> Result<Vec<(AgentId, Transition)>> {
        let mut transitions = Vec::with_capacity(self.agents.len());
        for agent in &mut self.agents {
            let t = agent.tick(&mut self.grid)?;
            self.report.entry("steps").and_modify(|x| *x += 1.0);
            self.report.entry("reward").and_modify(|x| *x += t.reward);
            match t.outcome {
                Outcome::Reset(_) => {
                    self.report.entry("resets").and_modify(|x| *x += 1.0);
                }
                Outcome::Exited => {
                    self.report.entry("exits").and_modify(|x| *x += 1.0);
                }
                Outcome::Moved => {}
            }
            transitions.push((agent.id(), t));
        }

        self.agents.retain(|agent| agent.is_active());
        self.iteration += 1;
        Ok(transitions)
    }

    /// Step until the iteration budget is spent or no agents remain
    ///
    /// **Returns** the number of iterations executed by this call
    pub fn run(&mut self, config: &SimulationConfig) -> Result<u64> {
        info!(
            "Simulation started with {} agent(s) on a {}x{} grid",
            self.agents.len(),
            self.grid.width(),
            self.grid.height()
        );
        let first = self.iteration;
        while self.iteration < config.iterations && !self.agents.is_empty() {
            self.step()?;
        }
        let executed = self.iteration - first;
        info!("Successfully executed iterations: {executed}");
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use rand::SeedableRng;

    use super::*;
    use crate::{
        env::{Cell, Direction},
        raster,
    };

    fn corridor() -> GridEnvironment {
        raster::from_reader("0,0,0,2\n".as_bytes()).unwrap()
    }

    #[test]
    fn report_take_resets() {
        let mut report = Report::new(vec!["steps"]);
        report.entry("steps").and_modify(|x| *x += 2.0);
        assert_eq!(report["steps"], 2.0);
        assert_eq!(report.take()["steps"], 2.0);
        assert_eq!(report["steps"], 0.0);
        assert_eq!(report.keys(), &["steps"]);
    }

    #[test]
    fn run_stops_when_all_agents_exit() {
        let mut sim: Simulation = Simulation::new(corridor());
        let config = LearningAgentConfig::with_epsilon(0.0);
        sim.spawn(AgentId(1), Position::new(0, 0), config, StdRng::seed_from_u64(1))
            .unwrap();
        let table = sim.agents[0].q_table_mut();
        for x in 0..3 {
            table.set(x, 0, Direction::East, 1.0).unwrap();
        }

        let executed = sim.run(&SimulationConfig { iterations: 50 }).unwrap();
        assert_eq!(executed, 3);
        assert!(sim.agents().is_empty(), "Exited agent deregistered");
        assert_eq!(sim.grid().occupant_count(), 0);
        assert_eq!(sim.report["exits"], 1.0);
        assert_eq!(sim.report["steps"], 3.0);
        assert_eq!(sim.report["reward"], 10.0);
    }

    #[test]
    fn run_respects_iteration_budget() {
        let grid = GridEnvironment::new(3, 3)
            .with_cells([(Position::new(2, 2), Cell::Blocked)])
            .unwrap();
        let mut sim: Simulation = Simulation::new(grid);
        sim.spawn(AgentId(1), Position::new(0, 0), Default::default(), StdRng::seed_from_u64(5))
            .unwrap();
        sim.spawn(AgentId(2), Position::new(1, 1), Default::default(), StdRng::seed_from_u64(6))
            .unwrap();

        let executed = sim.run(&SimulationConfig { iterations: 25 }).unwrap();
        assert_eq!(executed, 25, "No exit, so the whole budget is used");
        assert_eq!(sim.report["steps"], 50.0);
        assert_eq!(sim.agents().len(), 2);
        for agent in sim.agents() {
            assert_eq!(sim.grid().position_of(agent.id()), Some(agent.position()));
        }
    }

    #[test]
    fn registered_agents_report_removal() {
        let mut sim: Simulation = Simulation::new(corridor());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let agent = LearningAgent::init(
            AgentId(9),
            Position::new(2, 0),
            LearningAgentConfig::with_epsilon(0.0),
            sim.grid_mut(),
            StdRng::seed_from_u64(2),
        )
        .unwrap()
        .with_unregister(move |_, id| {
            assert_eq!(id, AgentId(9));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        sim.register(agent).unwrap();
        sim.agents[0]
            .q_table_mut()
            .set(2, 0, Direction::East, 1.0)
            .unwrap();

        let transitions = sim.step().unwrap();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].1.outcome, Outcome::Exited);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sim.step().unwrap().is_empty(), "Nothing left to tick");
    }

    #[test]
    fn register_rejects_agents_from_another_grid() {
        let mut other = corridor();
        let agent = LearningAgent::init(
            AgentId(3),
            Position::new(0, 0),
            LearningAgentConfig::default(),
            &mut other,
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        let mut sim: Simulation = Simulation::new(corridor());
        assert!(matches!(sim.register(agent), Err(Error::NotIndexed(_))));
    }
}
