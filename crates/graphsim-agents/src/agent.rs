//! Agents: the scheduling unit of the simulation.
//!
//! An [`Agent`] is a kind plus a trace flag. Each iteration the engine hands
//! it an [`AgentContext`] and a freshly forked [`RandomSource`]; the agent
//! then walks its regions in world order:
//!
//! 1. fork one generator per region, all up front;
//! 2. acquire the region's session and open a transaction;
//! 3. run the kind's domain logic (inside a [`TraceScope`] when sampled);
//! 4. commit, or roll back and record the failure.
//!
//! A failed region never affects its siblings or later agents.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;
use graphsim_world::World;
use serde::Serialize;

use crate::action::{Action, ActionOutput, Couple};
use crate::driver::{Session, Tracker, Transaction};
use crate::error::{AgentError, DriverError};
use crate::kinds;
use crate::random::RandomSource;
use crate::region::{Region, RegionKind};
use crate::trace::{TraceKey, TraceScope, TraceSink};

/// Everything an agent may see of the engine during one iteration.
pub trait AgentContext: Sync {
    /// Session type handed out by the registry.
    type Session: Session;

    /// The immutable reference world.
    fn world(&self) -> &World;

    /// 1-based iteration number.
    fn iteration(&self) -> u64;

    /// Simulated date of this iteration.
    fn today(&self) -> NaiveDateTime;

    /// Whether this iteration was sampled for tracing.
    fn trace_iteration(&self) -> bool;

    /// Where trace scopes report.
    fn trace_sink(&self) -> &dyn TraceSink;

    /// Open or reuse the session for a key. Agents never close sessions.
    fn session_for(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Arc<Self::Session>, DriverError>> + Send;
}

/// The closed set of agent kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// New people are born in every city.
    PersonBirth,
    /// Residents' ages are recomputed.
    AgeUpdate,
    /// Unmarried adults are paired up.
    Marriage,
    /// Newborns are allocated to married couples.
    Parentship,
    /// Long-standing residents move within their continent.
    Relocation,
    /// Companies are founded in every country.
    Company,
    /// Products are launched on every continent.
    Product,
    /// Worldwide read: current residents of a city.
    FindCurrentResidents,
    /// Worldwide read: parents of a city's newborns.
    TwoHop,
    /// Worldwide read: where those parents live now.
    ThreeHop,
}

impl AgentKind {
    /// Every kind, in the default registration order.
    pub const ALL: [Self; 10] = [
        Self::PersonBirth,
        Self::AgeUpdate,
        Self::Marriage,
        Self::Parentship,
        Self::Relocation,
        Self::Company,
        Self::Product,
        Self::FindCurrentResidents,
        Self::TwoHop,
        Self::ThreeHop,
    ];

    /// Configuration name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PersonBirth => "personBirth",
            Self::AgeUpdate => "ageUpdate",
            Self::Marriage => "marriage",
            Self::Parentship => "parentship",
            Self::Relocation => "relocation",
            Self::Company => "company",
            Self::Product => "product",
            Self::FindCurrentResidents => "findCurrentResidents",
            Self::TwoHop => "twoHop",
            Self::ThreeHop => "threeHop",
        }
    }

    /// Look a kind up by configuration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The regions this kind runs over.
    pub const fn region_kind(self) -> RegionKind {
        match self {
            Self::PersonBirth
            | Self::AgeUpdate
            | Self::Marriage
            | Self::Parentship
            | Self::Relocation => RegionKind::City,
            Self::Company => RegionKind::Country,
            Self::Product => RegionKind::Continent,
            Self::FindCurrentResidents | Self::TwoHop | Self::ThreeHop => RegionKind::World,
        }
    }
}

/// How a region ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RegionOutcome {
    /// The transaction committed.
    Committed,
    /// The transaction was rolled back (or never opened).
    RolledBack {
        /// Rendered failure.
        reason: String,
    },
}

/// Result of one region of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionReport {
    /// Session key of the region.
    pub key: String,
    /// Number of actions issued.
    pub actions: usize,
    /// How the region ended.
    pub outcome: RegionOutcome,
}

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    /// Agent name.
    pub agent: String,
    /// Per-region results, in the order the regions ran.
    pub regions: Vec<RegionReport>,
}

impl AgentReport {
    /// Regions that committed.
    pub fn committed(&self) -> usize {
        self.regions
            .iter()
            .filter(|r| r.outcome == RegionOutcome::Committed)
            .count()
    }

    /// Regions that were rolled back.
    pub fn rolled_back(&self) -> usize {
        self.regions.len().saturating_sub(self.committed())
    }
}

/// A registered agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    kind: AgentKind,
    trace: bool,
}

impl Agent {
    /// Create an agent of a kind.
    pub const fn new(kind: AgentKind, trace: bool) -> Self {
        Self { kind, trace }
    }

    /// Create an agent from its configuration name.
    pub fn from_name(name: &str, trace: bool) -> Option<Self> {
        AgentKind::from_name(name).map(|kind| Self::new(kind, trace))
    }

    /// The agent's kind.
    pub const fn kind(&self) -> AgentKind {
        self.kind
    }

    /// Configuration name.
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Whether the agent asked to be traced.
    pub const fn trace(&self) -> bool {
        self.trace
    }

    /// Run one iteration over every region of this agent's kind.
    pub async fn run<C: AgentContext>(&self, ctx: &C, mut rng: RandomSource) -> AgentReport {
        let regions = Region::select(self.kind.region_kind(), ctx.world());
        let forks: Vec<RandomSource> = regions.iter().map(|_| rng.next_source()).collect();

        let mut reports = Vec::with_capacity(regions.len());
        for (region, region_rng) in regions.into_iter().zip(forks) {
            reports.push(self.run_region(ctx, region, region_rng).await);
        }

        AgentReport {
            agent: self.name().to_owned(),
            regions: reports,
        }
    }

    async fn run_region<C: AgentContext>(
        &self,
        ctx: &C,
        region: Region<'_>,
        rng: RandomSource,
    ) -> RegionReport {
        let key = region.key().to_owned();
        let tracker = Tracker {
            agent: self.name().to_owned(),
            region: key.clone(),
            iteration: ctx.iteration(),
            trace: self.trace,
        };

        let tx = match begin(ctx, &key, tracker).await {
            Ok(tx) => tx,
            Err(err) => return self.abandon(key, 0, &err.into()),
        };

        let scope = (self.trace && ctx.trace_iteration()).then(|| {
            TraceScope::enter(
                ctx.trace_sink(),
                TraceKey {
                    agent: self.name().to_owned(),
                    region: key.clone(),
                    iteration: ctx.iteration(),
                },
            )
        });

        let mut exec = Executor::new(tx, scope);
        let result = kinds::run(self.kind, ctx, region, rng, &mut exec).await;
        let (tx, actions) = exec.finish();

        match result {
            Ok(()) => match tx.commit().await {
                Ok(()) => RegionReport {
                    key,
                    actions,
                    outcome: RegionOutcome::Committed,
                },
                Err(err) => self.abandon(key, actions, &err.into()),
            },
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(
                        agent = self.name(),
                        region = %key,
                        error = %rollback,
                        "Rollback failed"
                    );
                }
                self.abandon(key, actions, &err)
            }
        }
    }

    fn abandon(&self, key: String, actions: usize, err: &AgentError) -> RegionReport {
        tracing::warn!(
            agent = self.name(),
            region = %key,
            actions,
            error = %err,
            "Region rolled back"
        );
        RegionReport {
            key,
            actions,
            outcome: RegionOutcome::RolledBack {
                reason: err.to_string(),
            },
        }
    }
}

async fn begin<C: AgentContext>(
    ctx: &C,
    key: &str,
    tracker: Tracker,
) -> Result<<C::Session as Session>::Transaction, DriverError> {
    let session = ctx.session_for(key).await?;
    session.new_transaction(tracker).await
}

/// Runs actions against one region's transaction, counting them and
/// reporting them to the region's trace scope.
#[derive(Debug)]
pub struct Executor<'s, T> {
    tx: T,
    scope: Option<TraceScope<'s>>,
    actions: usize,
}

impl<'s, T: Transaction> Executor<'s, T> {
    /// Wrap a transaction.
    pub const fn new(tx: T, scope: Option<TraceScope<'s>>) -> Self {
        Self {
            tx,
            scope,
            actions: 0,
        }
    }

    async fn execute(&mut self, action: Action) -> Result<ActionOutput, AgentError> {
        if let Some(scope) = &self.scope {
            scope.record(&action);
        }
        self.actions = self.actions.saturating_add(1);
        Ok(self.tx.execute(&action).await?)
    }

    /// Run a write that returns nothing.
    pub async fn done(&mut self, action: Action) -> Result<(), AgentError> {
        let name = action.name();
        self.execute(action).await?.into_done(name)
    }

    /// Run an action that returns a count.
    pub async fn count(&mut self, action: Action) -> Result<u64, AgentError> {
        let name = action.name();
        self.execute(action).await?.into_count(name)
    }

    /// Run a read that returns keys, sorted ascending.
    pub async fn keys(&mut self, action: Action) -> Result<Vec<String>, AgentError> {
        let name = action.name();
        self.execute(action).await?.into_keys(name)
    }

    /// Run a read that returns couples, sorted ascending.
    pub async fn couples(&mut self, action: Action) -> Result<Vec<Couple>, AgentError> {
        let name = action.name();
        self.execute(action).await?.into_couples(name)
    }

    /// Close the trace scope and hand back the transaction and action count.
    pub fn finish(self) -> (T, usize) {
        (self.tx, self.actions)
    }
}
