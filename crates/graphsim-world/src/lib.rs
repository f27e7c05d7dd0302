//! Reference world for the graphsim workload simulator.
//!
//! The world is the immutable backdrop every agent reads from: a geography
//! tree (continents, countries, cities) and a set of name pools scaled by the
//! configured scale factor. It is built once at startup from CSV reference
//! data and never mutated afterwards, so it can be shared freely between
//! agents and regions.
//!
//! # Modules
//!
//! - [`error`] -- [`LoadError`] for missing or malformed reference data.
//! - [`loader`] -- [`WorldSources`] (logical file name to bytes) and CSV
//!   ingestion.
//! - [`world`] -- The [`World`] tree, lookups, and pool pickers.

pub mod error;
pub mod loader;
pub mod world;

// Re-export primary types at crate root.
pub use error::LoadError;
pub use loader::{WorldSources, files};
pub use world::{City, Continent, Country, Gender, POOL_ENTRIES_PER_SCALE, World, uniform_index};
