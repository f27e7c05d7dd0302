//! Backend capability interface.
//!
//! A backend is a [`Driver`] that opens keyed [`Session`]s, which in turn
//! open [`Transaction`]s that execute [`Action`]s. The engine is generic over
//! the driver, so each backend is a monomorphised implementation rather than
//! a trait object. All futures are `Send`.

use std::future::Future;

use graphsim_world::World;
use serde::Serialize;

use crate::action::{Action, ActionOutput};
use crate::error::DriverError;

/// Identity handed to a backend when a transaction opens, so native
/// diagnostics can be attributed to an agent, region and iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tracker {
    /// Agent name.
    pub agent: String,
    /// Session key of the region.
    pub region: String,
    /// 1-based iteration number.
    pub iteration: u64,
    /// The agent's trace flag.
    pub trace: bool,
}

/// A database backend.
pub trait Driver: Send + Sync {
    /// Session type opened by this driver.
    type Session: Session;

    /// Create the schema and load the world's static data. Must complete
    /// before any session is opened.
    fn bootstrap(&self, world: &World) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Open a fresh session for a key.
    fn open_session(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Self::Session, DriverError>> + Send;

    /// Release every backend resource.
    fn close(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// A keyed backend session, shared by every agent addressing the key within
/// one iteration.
pub trait Session: Send + Sync {
    /// Transaction type opened by this session.
    type Transaction: Transaction;

    /// The key the session was opened for.
    fn key(&self) -> &str;

    /// Open a transaction attributed to `tracker`.
    fn new_transaction(
        &self,
        tracker: Tracker,
    ) -> impl Future<Output = Result<Self::Transaction, DriverError>> + Send;

    /// Close the session. Only the engine calls this.
    fn close(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

/// A unit of work inside a session.
pub trait Transaction: Send + Sized {
    /// Execute one action.
    fn execute(
        &mut self,
        action: &Action,
    ) -> impl Future<Output = Result<ActionOutput, DriverError>> + Send;

    /// Make every action executed so far durable.
    fn commit(self) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Discard every action executed so far.
    fn rollback(self) -> impl Future<Output = Result<(), DriverError>> + Send;
}
