//! Error types for the graphsim binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and simulation execution.

use std::path::PathBuf;

/// Top-level error for the graphsim binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: graphsim_core::ConfigError,
    },

    /// Reference data could not be loaded.
    #[error("world error: {source}")]
    World {
        /// The underlying load error.
        #[from]
        source: graphsim_world::LoadError,
    },

    /// Connecting to the backend failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: graphsim_db::DbError,
    },

    /// Bootstrapping the simulation failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: graphsim_core::SimulationError,
    },

    /// Simulation runner failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: graphsim_core::RunnerError,
    },

    /// Writing the graph dump failed.
    #[error("failed to write graph dump to {path}: {source}")]
    Dump {
        /// Destination path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
