use std::{error::Error, fs, path::Path};

use gridq::{
    algo::{LearningAgentConfig, Outcome},
    env::{AgentId, Position},
    raster,
    sim::Simulation,
};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

const ITERATIONS: u64 = 20_000;
const SEED: u64 = 2024;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let path = Path::new("demos/grid_exit");

    let grid = raster::from_path(path.join("grid.csv"))?;
    let mut sim: Simulation = Simulation::new(grid);
    sim.spawn(
        AgentId(0),
        Position::new(0, 0),
        LearningAgentConfig::default(),
        StdRng::seed_from_u64(SEED),
    )?;

    fs::create_dir_all(path.join("out"))?;
    let mut wtr = csv::Writer::from_path(path.join("out/attempts.csv"))?;
    wtr.write_record(["attempt", "steps", "outcome"])?;

    let mut attempt = 0u32;
    let mut steps = 0u64;
    while sim.iteration() < ITERATIONS && !sim.agents().is_empty() {
        for (_, t) in sim.step()? {
            steps += 1;
            let label = match t.outcome {
                Outcome::Moved => continue,
                Outcome::Reset(_) => "reset",
                Outcome::Exited => "exit",
            };
            wtr.write_record([attempt.to_string(), steps.to_string(), label.to_string()])?;
            attempt += 1;
            steps = 0;
        }
    }
    wtr.flush()?;

    info!(
        "Finished after {} iterations ({} attempts, {} steps, reward {})",
        sim.iteration(),
        attempt,
        sim.report["steps"],
        sim.report["reward"]
    );
    println!("Successfully executed iterations: {}", sim.iteration());

    Ok(())
}
