//! Backend drivers for the graphsim workload simulator.
//!
//! Two implementations of the [`Driver`](graphsim_agents::Driver) capability
//! set live here:
//!
//! - [`memory`] -- [`MemoryDriver`]: an in-process property graph with
//!   copy-on-write transactions. The reference backend, and the one the
//!   engine's tests run against.
//! - [`postgres`] -- [`PostgresDriver`]: a relational rendition of the same
//!   graph on `PostgreSQL` via [`sqlx`], one single-connection pool per
//!   session.
//!
//! Both answer every [`Action`](graphsim_agents::Action) with the same
//! semantics, so a seeded run produces the same data on either.

pub mod error;
pub mod memory;
pub mod postgres;

// Re-export primary types at crate root.
pub use error::DbError;
pub use memory::{GraphStore, MemoryDriver, MemorySession, MemoryTransaction};
pub use postgres::{
    PostgresConfig, PostgresDriver, PostgresPool, PostgresSession, PostgresTransaction,
};
