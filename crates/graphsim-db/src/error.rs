//! Error types for the backend drivers.
//!
//! Drivers report native failures as [`DbError`] and box them into a
//! [`DriverError`](graphsim_agents::DriverError) at the trait boundary, so
//! the engine sees a uniform error while logs keep the native detail.

/// Errors that can occur in a backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A snapshot could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A write referenced a node that does not exist.
    #[error("unknown {kind}: {key}")]
    UnknownReference {
        /// Node label, e.g. `person`.
        kind: &'static str,
        /// The missing key.
        key: String,
    },

    /// A write would create a second node with an existing key.
    #[error("duplicate {kind}: {key}")]
    Duplicate {
        /// Node label, e.g. `marriage`.
        kind: &'static str,
        /// The clashing key.
        key: String,
    },

    /// A relocation named a city the person does not currently live in.
    #[error("{email} does not currently live in {city}")]
    NotResident {
        /// The person's email.
        email: String,
        /// The city the relocation claimed to start from.
        city: String,
    },

    /// A write was handed to a read-only path.
    #[error("action {action} writes and cannot run read-only")]
    ReadOnly {
        /// Reporting name of the action.
        action: &'static str,
    },

    /// The session was already closed.
    #[error("session {key} is closed")]
    SessionClosed {
        /// Session key.
        key: String,
    },

    /// The driver was already closed.
    #[error("driver is closed")]
    DriverClosed,

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
