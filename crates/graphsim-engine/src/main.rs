//! The graphsim binary.
//!
//! Wires together configuration, reference data, the chosen backend and the
//! simulation loop, then runs a bounded simulation and reports the result.
//!
//! # Startup Sequence
//!
//! 1. Parse the command line
//! 2. Load configuration from `graphsim-config.yaml` and apply flag overrides
//! 3. Initialize structured logging (tracing)
//! 4. Validate the agent registry and trace sampling policy
//! 5. Load the reference world from the data directory
//! 6. Connect to the backend and bootstrap it
//! 7. Run the simulation loop
//! 8. Log the result and optionally dump the graph

mod cli;
mod error;
mod progress;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use graphsim_agents::{Agent, Driver, LogTraceSink, NoopTraceSink, TraceSink};
use graphsim_core::{
    BackendKind, SamplingPolicy, Simulation, SimulationConfig, SimulationResult,
    log_simulation_end, run_simulation,
};
use graphsim_db::{MemoryDriver, PostgresConfig, PostgresDriver};
use graphsim_world::{World, WorldSources};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::EngineError;
use crate::progress::ProgressCallback;

/// Everything the simulation needs apart from the driver.
struct RunPlan {
    world: World,
    agents: Vec<Agent>,
    seed: u64,
    policy: SamplingPolicy,
    sink: Arc<dyn TraceSink>,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error (and a non-zero exit code) if any initialization step
/// or the simulation itself fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), EngineError> {
    // 1. Parse the command line.
    let cli = Cli::parse();

    // 2. Load configuration.
    let mut config = load_config(&cli.config)?;
    cli.apply(&mut config);

    // 3. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("graphsim starting");
    info!(
        seed = config.simulation.seed,
        iterations = config.simulation.iterations,
        scale_factor = config.simulation.scale_factor,
        backend = ?config.backend.kind,
        "Configuration loaded"
    );

    // 4. Validate agents and sampling.
    config.validate()?;
    let agents = config.agent_registry()?;
    let policy = config.sampling_policy()?;
    let sink: Arc<dyn TraceSink> = if cli.disable_tracing {
        Arc::new(NoopTraceSink)
    } else {
        Arc::new(LogTraceSink)
    };
    info!(
        agents = ?agents.iter().map(Agent::name).collect::<Vec<_>>(),
        ?policy,
        tracing = !cli.disable_tracing,
        "Agent registry validated"
    );

    // 5. Load the reference world.
    let sources = WorldSources::from_dir(&cli.data_dir)?;
    let world = World::initialise(config.simulation.scale_factor, &sources)?;

    let iterations = config.simulation.iterations;
    let plan = RunPlan {
        world,
        agents,
        seed: config.simulation.seed,
        policy,
        sink,
    };

    // 6-8. Connect, run, report.
    let result = match config.backend.kind {
        BackendKind::Memory => {
            let mut simulation = start(MemoryDriver::new(), plan).await?;
            let result = drive(&mut simulation, iterations).await?;
            if let Some(ref path) = cli.dump_graph {
                dump_graph(simulation.driver(), path).await?;
            }
            result
        }
        BackendKind::Postgres => {
            info!("Connecting to PostgreSQL");
            let pg_config = PostgresConfig::new(&config.backend.postgres_url)
                .with_max_connections(config.backend.max_connections);
            let driver = PostgresDriver::connect(pg_config).await?;
            let mut simulation = start(driver, plan).await?;
            if cli.dump_graph.is_some() {
                warn!("--dump-graph is only supported by the memory backend, ignoring");
            }
            drive(&mut simulation, iterations).await?
        }
    };

    log_simulation_end(&result);
    info!(iterations = result.iterations, "graphsim shutdown complete");

    Ok(())
}

/// Load the configuration file, falling back to defaults when it is absent.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::parse("{}")?)
    }
}

/// Bootstrap the backend and build the simulation.
async fn start<D: Driver>(driver: D, plan: RunPlan) -> Result<Simulation<D>, EngineError> {
    let simulation = Simulation::initialise(
        driver,
        plan.world,
        plan.agents,
        plan.seed,
        plan.policy,
        plan.sink,
    )
    .await?;
    info!("Backend bootstrapped, entering iteration loop");
    Ok(simulation)
}

/// Run the configured number of iterations.
async fn drive<D: Driver>(
    simulation: &mut Simulation<D>,
    iterations: u64,
) -> Result<SimulationResult, EngineError> {
    let mut callback = ProgressCallback::new(iterations);
    let result = run_simulation(simulation, iterations, &mut callback).await?;
    info!(actions = callback.actions(), "All iterations complete");
    Ok(result)
}

/// Write the committed in-memory graph as JSON.
async fn dump_graph(driver: &MemoryDriver, path: &Path) -> Result<(), EngineError> {
    let json = driver.snapshot().await.to_json()?;
    tokio::fs::write(path, json)
        .await
        .map_err(|source| EngineError::Dump {
            path: path.to_owned(),
            source,
        })?;
    info!(path = %path.display(), "Graph dump written");
    Ok(())
}
