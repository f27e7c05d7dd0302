//! Command-line interface.
//!
//! Flags override the matching configuration file entries; anything not
//! given on the command line comes from the file (or its defaults).

use std::path::PathBuf;

use clap::Parser;
use graphsim_core::{BackendKind, SimulationConfig};

/// Deterministic graph database workload simulator.
#[derive(Debug, Parser)]
#[command(name = "graphsim", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "graphsim-config.yaml")]
    pub config: PathBuf,

    /// Directory holding the reference CSV files.
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Master random seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of iterations to run.
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Per-region entity multiplier.
    #[arg(long)]
    pub scale_factor: Option<u32>,

    /// Backend to run against (`memory` or `postgres`).
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// `PostgreSQL` connection URL.
    #[arg(long)]
    pub postgres_url: Option<String>,

    /// Disable sampled trace scopes entirely.
    #[arg(long)]
    pub disable_tracing: bool,

    /// Write the committed graph as JSON here after the run (memory backend).
    #[arg(long)]
    pub dump_graph: Option<PathBuf>,
}

impl Cli {
    /// Apply command-line overrides to a loaded configuration.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            config.simulation.iterations = iterations;
        }
        if let Some(scale_factor) = self.scale_factor {
            config.simulation.scale_factor = scale_factor;
        }
        if let Some(backend) = self.backend {
            config.backend.kind = backend;
        }
        if let Some(ref url) = self.postgres_url {
            config.backend.postgres_url.clone_from(url);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["graphsim"]).unwrap();
        let mut config = SimulationConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(cli.config, PathBuf::from("graphsim-config.yaml"));
        assert!(!cli.disable_tracing);
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "graphsim",
            "--seed",
            "42",
            "--iterations",
            "3",
            "--scale-factor",
            "2",
            "--backend",
            "postgres",
            "--postgres-url",
            "postgres://x@y/z",
            "--disable-tracing",
        ])
        .unwrap();
        let mut config = SimulationConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.simulation.iterations, 3);
        assert_eq!(config.simulation.scale_factor, 2);
        assert_eq!(config.backend.kind, BackendKind::Postgres);
        assert_eq!(config.backend.postgres_url, "postgres://x@y/z");
        assert!(cli.disable_tracing);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["graphsim", "--backend", "neo4j"]).is_err());
    }
}
