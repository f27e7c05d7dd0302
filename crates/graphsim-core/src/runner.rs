//! Bounded simulation runner.
//!
//! [`run_simulation`] drives [`Simulation::iterate`] a fixed number of times
//! and always leaves the simulation closed: on success it closes normally,
//! on error it closes best-effort and returns the original error.

use graphsim_agents::Driver;
use tracing::{info, warn};

use crate::simulation::{IterationReport, Simulation, SimulationError};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An iteration or the final close failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

/// Result of the simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    /// Number of iterations completed.
    pub iterations: u64,
    /// Regions committed across the run.
    pub regions_committed: usize,
    /// Regions rolled back across the run.
    pub regions_rolled_back: usize,
    /// Report of the last completed iteration.
    pub final_report: Option<IterationReport>,
}

/// Callback invoked after each iteration completes.
pub trait IterationCallback: Send {
    /// Called after an iteration completes successfully.
    fn on_iteration(&mut self, report: &IterationReport);
}

/// A no-op iteration callback.
pub struct NoOpCallback;

impl IterationCallback for NoOpCallback {
    fn on_iteration(&mut self, _report: &IterationReport) {}
}

/// Run `iterations` iterations and close the simulation.
///
/// # Errors
///
/// Returns [`RunnerError`] with the first uncaught error. The simulation is
/// closed before returning either way.
pub async fn run_simulation<D: Driver>(
    simulation: &mut Simulation<D>,
    iterations: u64,
    callback: &mut dyn IterationCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut result = SimulationResult::default();
    info!(iterations, "Simulation starting");

    for _ in 0..iterations {
        let report = match simulation.iterate().await {
            Ok(report) => report,
            Err(err) => {
                if let Err(close_err) = simulation.close().await {
                    warn!(error = %close_err, "Cleanup after failed iteration also failed");
                }
                return Err(err.into());
            }
        };

        callback.on_iteration(&report);
        result.iterations = result.iterations.saturating_add(1);
        result.regions_committed = result.regions_committed.saturating_add(report.committed());
        result.regions_rolled_back = result
            .regions_rolled_back
            .saturating_add(report.rolled_back());
        result.final_report = Some(report);
    }

    simulation.close().await?;
    Ok(result)
}

/// Log the simulation end summary.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        iterations = result.iterations,
        regions_committed = result.regions_committed,
        regions_rolled_back = result.regions_rolled_back,
        "Simulation ended"
    );

    if let Some(ref report) = result.final_report {
        info!(
            iteration = report.iteration,
            date = %report.date,
            traced = report.traced,
            "Final iteration"
        );
    } else {
        warn!("Simulation ended with no iterations executed");
    }
}
