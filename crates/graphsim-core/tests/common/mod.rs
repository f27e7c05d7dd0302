//! Shared fixtures for the engine tests: a reference world, a recording
//! trace sink and a driver wrapper that perturbs an inner backend.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use graphsim_agents::{
    Action, ActionOutput, Agent, AgentKind, Driver, DriverError, Session, TraceKey, TraceSink,
    Tracker, Transaction,
};
use graphsim_world::{World, WorldSources, files};

/// Three cities on two continents.
pub fn world(scale_factor: u32) -> World {
    let sources = WorldSources::new()
        .with(files::CONTINENTS, "name\nEurope\nAsia\n")
        .with(
            files::COUNTRIES,
            "name,continent\nUnited Kingdom,Europe\nFrance,Europe\nJapan,Asia\n",
        )
        .with(
            files::CITIES,
            "name,country\nLondon,United Kingdom\nParis,France\nTokyo,Japan\n",
        )
        .with(files::MALE_FORENAMES, "name\nJohn\nPeter\nKenji\n")
        .with(files::FEMALE_FORENAMES, "name\nMary\nAnne\nYuki\n")
        .with(files::SURNAMES, "name\nSmith\nDupont\nTanaka\n")
        .with(files::ADJECTIVES, "name\nquick\nbright\ncalm\n")
        .with(files::NOUNS, "name\nfox\nlamp\nriver\n");
    World::initialise(scale_factor, &sources).expect("fixture world loads")
}

/// A single city.
pub fn london_only() -> World {
    let sources = WorldSources::new()
        .with(files::CONTINENTS, "name\nEurope\n")
        .with(files::COUNTRIES, "name,continent\nUnited Kingdom,Europe\n")
        .with(files::CITIES, "name,country\nLondon,United Kingdom\n")
        .with(files::MALE_FORENAMES, "name\nJohn\nPeter\n")
        .with(files::FEMALE_FORENAMES, "name\nMary\nAnne\n")
        .with(files::SURNAMES, "name\nSmith\nJones\n")
        .with(files::ADJECTIVES, "name\nquick\n")
        .with(files::NOUNS, "name\nfox\n");
    World::initialise(1, &sources).expect("fixture world loads")
}

/// Every kind, traced.
pub fn all_agents() -> Vec<Agent> {
    AgentKind::ALL
        .into_iter()
        .map(|kind| Agent::new(kind, true))
        .collect()
}

/// Records every trace event as a line of text.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("sink lock").clone()
    }

    fn push(&self, line: String) {
        self.events.lock().expect("sink lock").push(line);
    }
}

impl TraceSink for RecordingSink {
    fn enter(&self, key: &TraceKey) {
        self.push(format!("enter {} {} {}", key.agent, key.region, key.iteration));
    }

    fn action(&self, key: &TraceKey, action: &Action) {
        let params = serde_json::to_string(action).expect("action serializes");
        self.push(format!("action {} {} {params}", key.agent, key.region));
    }

    fn exit(&self, key: &TraceKey) {
        self.push(format!("exit {} {} {}", key.agent, key.region, key.iteration));
    }
}

/// How [`Perturbed`] alters its inner backend.
#[derive(Debug, Default)]
pub struct Perturbation {
    /// Return every list in reverse order.
    pub reverse_lists: bool,
    /// Fail company registrations in this country.
    pub fail_company_in: Option<&'static str>,
    /// Fail every region session close.
    pub fail_session_close: bool,
    /// Fail the n-th (1-based) person inserted by one transaction in this city.
    pub fail_birth: Option<(&'static str, usize)>,
    /// Fail schema and data bootstrap.
    pub fail_bootstrap: bool,
    /// Set once the driver has been closed.
    pub driver_closed: AtomicBool,
    /// Trackers seen when transactions opened.
    pub trackers: Mutex<Vec<Tracker>>,
}

/// Wraps a driver, session or transaction and applies a [`Perturbation`].
pub struct Perturbed<T> {
    pub inner: T,
    pub perturbation: Arc<Perturbation>,
    births: usize,
}

impl<T> Perturbed<T> {
    pub fn new(inner: T, perturbation: Perturbation) -> Self {
        Self {
            inner,
            perturbation: Arc::new(perturbation),
            births: 0,
        }
    }

    fn wrap<U>(&self, inner: U) -> Perturbed<U> {
        Perturbed {
            inner,
            perturbation: Arc::clone(&self.perturbation),
            births: 0,
        }
    }
}

impl<D: Driver> Driver for Perturbed<D> {
    type Session = Perturbed<D::Session>;

    async fn bootstrap(&self, world: &World) -> Result<(), DriverError> {
        if self.perturbation.fail_bootstrap {
            return Err(DriverError::resource("bootstrap", "injected bootstrap failure"));
        }
        self.inner.bootstrap(world).await
    }

    async fn open_session(&self, key: &str) -> Result<Self::Session, DriverError> {
        let session = self.inner.open_session(key).await?;
        Ok(self.wrap(session))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.perturbation.driver_closed.store(true, Ordering::SeqCst);
        self.inner.close().await
    }
}

impl<S: Session> Session for Perturbed<S> {
    type Transaction = Perturbed<S::Transaction>;

    fn key(&self) -> &str {
        self.inner.key()
    }

    async fn new_transaction(&self, tracker: Tracker) -> Result<Self::Transaction, DriverError> {
        self.perturbation
            .trackers
            .lock()
            .expect("tracker lock")
            .push(tracker.clone());
        let tx = self.inner.new_transaction(tracker).await?;
        Ok(self.wrap(tx))
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.inner.close().await?;
        if self.perturbation.fail_session_close && self.inner.key() != "default" {
            return Err(DriverError::resource("close_session", "injected close failure"));
        }
        Ok(())
    }
}

impl<T: Transaction> Transaction for Perturbed<T> {
    async fn execute(&mut self, action: &Action) -> Result<ActionOutput, DriverError> {
        if let Action::InsertCompany { country, .. } = action {
            if self.perturbation.fail_company_in == Some(country.as_str()) {
                return Err(DriverError::query(action.name(), "injected failure"));
            }
        }
        if let (Action::InsertPerson { city, .. }, Some((fail_city, nth))) =
            (action, self.perturbation.fail_birth)
        {
            if city == fail_city {
                self.births += 1;
                if self.births == nth {
                    return Err(DriverError::query(action.name(), "injected failure"));
                }
            }
        }
        let output = self.inner.execute(action).await?;
        if !self.perturbation.reverse_lists {
            return Ok(output);
        }
        Ok(match output {
            ActionOutput::Keys(mut keys) => {
                keys.reverse();
                ActionOutput::Keys(keys)
            }
            ActionOutput::Couples(mut couples) => {
                couples.reverse();
                ActionOutput::Couples(couples)
            }
            other => other,
        })
    }

    async fn commit(self) -> Result<(), DriverError> {
        self.inner.commit().await
    }

    async fn rollback(self) -> Result<(), DriverError> {
        self.inner.rollback().await
    }
}
