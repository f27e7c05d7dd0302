//! Agents, actions and the backend interface for the graphsim workload
//! simulator.
//!
//! This crate holds everything that decides *what* a backend is asked to do:
//! the forkable random source, the closed action catalogue, the driver
//! traits backends implement, trace scopes, and the domain agents. It does
//! no I/O of its own.
//!
//! # Modules
//!
//! - [`action`] -- The [`Action`] catalogue, [`ActionOutput`] and output
//!   conversion.
//! - [`agent`] -- [`Agent`], [`AgentKind`], [`AgentContext`] and reports.
//! - [`driver`] -- [`Driver`], [`Session`] and [`Transaction`] traits.
//! - [`error`] -- [`DriverError`] and [`AgentError`].
//! - [`kinds`] -- Domain logic for each agent kind.
//! - [`random`] -- [`RandomSource`], the deterministic seed tree.
//! - [`region`] -- Regions and session keys.
//! - [`trace`] -- [`TraceScope`] and [`TraceSink`] implementations.

pub mod action;
pub mod agent;
pub mod driver;
pub mod error;
pub mod kinds;
pub mod random;
pub mod region;
pub mod trace;

// Re-export primary types at crate root for convenience.
pub use action::{Action, ActionOutput, Couple, marriage_id};
pub use agent::{
    Agent, AgentContext, AgentKind, AgentReport, Executor, RegionOutcome, RegionReport,
};
pub use driver::{Driver, Session, Tracker, Transaction};
pub use error::{AgentError, BoxError, DriverError};
pub use random::RandomSource;
pub use region::{Region, RegionKind, WORLD_KEY};
pub use trace::{LogTraceSink, NoopTraceSink, TraceKey, TraceScope, TraceSink};
