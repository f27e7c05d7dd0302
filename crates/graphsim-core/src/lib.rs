//! Scheduling engine for the graphsim workload simulator.
//!
//! This crate drives the iteration loop: it owns the simulated clock, the
//! master seed, the per-iteration session registry and the trace sampling
//! policy, and runs every registered agent against a backend [`Driver`]
//! once per iteration.
//!
//! # Modules
//!
//! - [`clock`] -- [`SimulationClock`]: iteration number to simulated date.
//! - [`config`] -- YAML configuration ([`SimulationConfig`]) and validation.
//! - [`runner`] -- [`run_simulation`]: bounded run with guaranteed close.
//! - [`sampling`] -- [`SamplingPolicy`]: which iterations are traced.
//! - [`session`] -- [`SessionRegistry`]: lazily opened, iteration-scoped
//!   sessions.
//! - [`simulation`] -- [`Simulation`]: the per-iteration state machine.
//!
//! [`Driver`]: graphsim_agents::Driver

pub mod clock;
pub mod config;
pub mod runner;
pub mod sampling;
pub mod session;
pub mod simulation;

// Re-export primary types at crate root.
pub use clock::{ClockError, SimulationClock};
pub use config::{BackendKind, ConfigError, SimulationConfig};
pub use runner::{
    IterationCallback, NoOpCallback, RunnerError, SimulationResult, log_simulation_end,
    run_simulation,
};
pub use sampling::SamplingPolicy;
pub use session::SessionRegistry;
pub use simulation::{DEFAULT_SESSION_KEY, IterationReport, Simulation, SimulationError};
