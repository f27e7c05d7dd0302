//! Iteration callback that logs progress.
//!
//! After each iteration this logs one summary line, plus a warning for
//! every region that rolled back so failures are visible without turning
//! on debug logging.

use graphsim_agents::RegionOutcome;
use graphsim_core::{IterationCallback, IterationReport};
use tracing::{info, warn};

/// Logs each [`IterationReport`] as it arrives.
#[derive(Debug, Default)]
pub struct ProgressCallback {
    total_iterations: u64,
    actions: usize,
}

impl ProgressCallback {
    /// Create a callback for a run of `total_iterations`.
    pub const fn new(total_iterations: u64) -> Self {
        Self {
            total_iterations,
            actions: 0,
        }
    }

    /// Actions executed so far across the run.
    pub const fn actions(&self) -> usize {
        self.actions
    }
}

impl IterationCallback for ProgressCallback {
    fn on_iteration(&mut self, report: &IterationReport) {
        let actions: usize = report
            .agents
            .iter()
            .flat_map(|agent| agent.regions.iter())
            .map(|region| region.actions)
            .sum();
        self.actions = self.actions.saturating_add(actions);

        for agent in &report.agents {
            for region in &agent.regions {
                if let RegionOutcome::RolledBack { ref reason } = region.outcome {
                    warn!(
                        iteration = report.iteration,
                        agent = %agent.agent,
                        region = %region.key,
                        reason = %reason,
                        "Region rolled back"
                    );
                }
            }
        }

        info!(
            iteration = report.iteration,
            of = self.total_iterations,
            date = %report.date.date(),
            traced = report.traced,
            actions,
            committed = report.committed(),
            rolled_back = report.rolled_back(),
            "Iteration finished"
        );
    }
}
