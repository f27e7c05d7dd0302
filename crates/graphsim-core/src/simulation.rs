//! The scheduling loop.
//!
//! A [`Simulation`] owns the driver, the world, the registered agents, the
//! master [`RandomSource`] and the session registry. Each call to
//! [`Simulation::iterate`] runs one iteration:
//!
//! 1. Decide whether the iteration is traced (sampler sees the 0-based index).
//! 2. For each agent in registration order, fork one generator from the
//!    master and run the agent to completion.
//! 3. Close and evict every region session.
//! 4. Advance the clock.
//!
//! The lifecycle is `initialised -> running -> closed`; a closed simulation
//! refuses to iterate.

use std::sync::Arc;

use chrono::NaiveDateTime;
use graphsim_agents::{
    Agent, AgentContext, AgentReport, Driver, DriverError, RandomSource, Session, TraceSink,
};
use graphsim_world::World;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, SimulationClock};
use crate::sampling::SamplingPolicy;
use crate::session::SessionRegistry;

/// Key of the session opened at initialisation and held until shutdown.
pub const DEFAULT_SESSION_KEY: &str = "default";

/// Errors that can occur while driving the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The simulation was already closed.
    #[error("simulation is closed")]
    Closed,

    /// The clock could not produce a date or advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A backend resource operation outside any region failed.
    #[error("driver error: {source}")]
    Driver {
        /// The underlying driver error.
        #[from]
        source: DriverError,
    },
}

/// Outcome of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationReport {
    /// 1-based iteration number.
    pub iteration: u64,
    /// Simulated date.
    pub date: NaiveDateTime,
    /// Whether the iteration was sampled for tracing.
    pub traced: bool,
    /// Number of region sessions closed at iteration end.
    pub sessions_closed: usize,
    /// One report per agent, in registration order.
    pub agents: Vec<AgentReport>,
}

impl IterationReport {
    /// Regions committed across all agents.
    pub fn committed(&self) -> usize {
        self.agents.iter().map(AgentReport::committed).sum()
    }

    /// Regions rolled back across all agents.
    pub fn rolled_back(&self) -> usize {
        self.agents.iter().map(AgentReport::rolled_back).sum()
    }
}

/// What agents see of the simulation during one iteration.
struct IterationContext<'a, D: Driver> {
    driver: &'a D,
    registry: &'a SessionRegistry<D::Session>,
    world: &'a World,
    iteration: u64,
    today: NaiveDateTime,
    traced: bool,
    sink: &'a dyn TraceSink,
}

impl<D: Driver> AgentContext for IterationContext<'_, D> {
    type Session = D::Session;

    fn world(&self) -> &World {
        self.world
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn today(&self) -> NaiveDateTime {
        self.today
    }

    fn trace_iteration(&self) -> bool {
        self.traced
    }

    fn trace_sink(&self) -> &dyn TraceSink {
        self.sink
    }

    async fn session_for(&self, key: &str) -> Result<Arc<D::Session>, DriverError> {
        self.registry.get_or_open(self.driver, key).await
    }
}

/// The deterministic simulation engine.
pub struct Simulation<D: Driver> {
    driver: D,
    world: World,
    agents: Vec<Agent>,
    random: RandomSource,
    policy: SamplingPolicy,
    sink: Arc<dyn TraceSink>,
    clock: SimulationClock,
    registry: SessionRegistry<D::Session>,
    default_session: Option<D::Session>,
    closed: bool,
}

impl<D: Driver> Simulation<D> {
    /// Bootstrap the backend and open the default session.
    ///
    /// Schema and static data are loaded before this returns, so the first
    /// iteration always runs against a ready backend.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Driver`] if bootstrap or the default
    /// session fails. The driver is closed best-effort before returning.
    pub async fn initialise(
        driver: D,
        world: World,
        agents: Vec<Agent>,
        seed: u64,
        policy: SamplingPolicy,
        sink: Arc<dyn TraceSink>,
    ) -> Result<Self, SimulationError> {
        if let Err(err) = driver.bootstrap(&world).await {
            return Err(abort_start(&driver, err).await);
        }
        let default_session = match driver.open_session(DEFAULT_SESSION_KEY).await {
            Ok(session) => session,
            Err(err) => return Err(abort_start(&driver, err).await),
        };
        info!(
            seed,
            agents = agents.len(),
            scale_factor = world.scale_factor(),
            ?policy,
            "Simulation initialised"
        );
        Ok(Self {
            driver,
            world,
            agents,
            random: RandomSource::new(seed),
            policy,
            sink,
            clock: SimulationClock::new(),
            registry: SessionRegistry::new(),
            default_session: Some(default_session),
            closed: false,
        })
    }

    /// The iteration that will run next (1-based).
    pub const fn iteration(&self) -> u64 {
        self.clock.iteration()
    }

    /// The backend driver.
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// The reference world.
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The registered agents, in registration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The session registry (empty between iterations).
    pub const fn sessions(&self) -> &SessionRegistry<D::Session> {
        &self.registry
    }

    /// The session opened at initialisation, until the simulation closes.
    pub const fn default_session(&self) -> Option<&D::Session> {
        self.default_session.as_ref()
    }

    /// Whether [`close`](Self::close) has run.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Run one iteration.
    ///
    /// Region failures are reported in the returned [`IterationReport`];
    /// only failures outside any region (closing sessions, the clock) are
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Closed`] after [`close`](Self::close),
    /// [`SimulationError::Driver`] if closing the iteration's sessions
    /// fails, or [`SimulationError::Clock`] on calendar overflow.
    pub async fn iterate(&mut self) -> Result<IterationReport, SimulationError> {
        if self.closed {
            return Err(SimulationError::Closed);
        }

        let iteration = self.clock.iteration();
        let today = self.clock.today()?;
        let traced = self.policy.sample(iteration.saturating_sub(1));
        debug!(iteration, %today, traced, "Iteration starting");

        let ctx = IterationContext {
            driver: &self.driver,
            registry: &self.registry,
            world: &self.world,
            iteration,
            today,
            traced,
            sink: self.sink.as_ref(),
        };

        let mut agents = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let rng = self.random.next_source();
            agents.push(agent.run(&ctx, rng).await);
        }

        let sessions_closed = self.registry.close_all().await?;
        self.clock.advance()?;

        let report = IterationReport {
            iteration,
            date: today,
            traced,
            sessions_closed,
            agents,
        };
        info!(
            iteration,
            committed = report.committed(),
            rolled_back = report.rolled_back(),
            sessions_closed,
            "Iteration complete"
        );
        Ok(report)
    }

    /// Close region sessions, the default session and the driver.
    ///
    /// Idempotent. Every step is attempted even if an earlier one fails;
    /// the first failure is returned.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Driver`] if any close fails.
    pub async fn close(&mut self) -> Result<(), SimulationError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let regions = self.registry.close_all().await.map(|_count| ());
        let default = match self.default_session.take() {
            Some(session) => session.close().await,
            None => Ok(()),
        };
        let driver = self.driver.close().await;
        info!(iteration = self.clock.iteration(), "Simulation closed");

        regions.and(default).and(driver)?;
        Ok(())
    }
}

/// Close a driver whose start-up failed, keeping the original error.
async fn abort_start<D: Driver>(driver: &D, err: DriverError) -> SimulationError {
    if let Err(close_err) = driver.close().await {
        warn!(error = %close_err, "Closing driver after failed start-up also failed");
    }
    err.into()
}

impl<D: Driver> std::fmt::Debug for Simulation<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("iteration", &self.clock.iteration())
            .field("agents", &self.agents)
            .field("policy", &self.policy)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
