//! Error types for the graphsim-agents crate.
//!
//! Backend failures are [`DriverError`]s and carry the backend's native error
//! boxed; the engine never looks inside them. [`AgentError`] is the
//! per-region failure that causes a rollback.

/// Boxed native backend error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised by a backend driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A single action failed in the backend.
    #[error("action {action} failed: {source}")]
    BackendQuery {
        /// Reporting name of the action.
        action: &'static str,
        /// The backend's native error.
        source: BoxError,
    },

    /// Opening, committing or closing a session or transaction failed.
    #[error("{operation} failed: {source}")]
    Resource {
        /// The operation that failed, e.g. `open_session`.
        operation: &'static str,
        /// The backend's native error.
        source: BoxError,
    },
}

impl DriverError {
    /// Wrap a native error raised while executing an action.
    pub fn query(action: &'static str, source: impl Into<BoxError>) -> Self {
        Self::BackendQuery {
            action,
            source: source.into(),
        }
    }

    /// Wrap a native error raised by a resource operation.
    pub fn resource(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Resource {
            operation,
            source: source.into(),
        }
    }
}

/// Failures that abort a single region of an agent.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// The backend failed.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// An action produced an output of the wrong shape.
    #[error("action {action} returned {found} output, expected {expected}")]
    UnexpectedOutput {
        /// Reporting name of the action.
        action: &'static str,
        /// The shape the agent needed.
        expected: &'static str,
        /// The shape the backend produced.
        found: &'static str,
    },

    /// The world has nothing to pick from.
    #[error("world has no {pool}")]
    EmptyPool {
        /// What was missing.
        pool: &'static str,
    },

    /// Calendar arithmetic left chrono's supported range.
    #[error("date out of range while computing {context}")]
    DateOutOfRange {
        /// What was being computed.
        context: &'static str,
    },

    /// The agent was handed a region of the wrong kind.
    #[error("agent {agent} cannot run over region {region}")]
    RegionMismatch {
        /// Agent name.
        agent: &'static str,
        /// Region key.
        region: String,
    },
}
