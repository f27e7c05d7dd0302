//! Agent execution against a scripted in-test backend.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::arithmetic_side_effects
)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use graphsim_agents::{
    Action, ActionOutput, Agent, AgentContext, AgentKind, Couple, DriverError, NoopTraceSink,
    RandomSource, RegionOutcome, Session, TraceKey, TraceSink, Tracker, Transaction,
};
use graphsim_world::{World, WorldSources, files};

fn world(scale_factor: u32) -> World {
    let sources = WorldSources::new()
        .with(files::CONTINENTS, "name\nEurope\n")
        .with(files::COUNTRIES, "name,continent\nUnited Kingdom,Europe\n")
        .with(files::CITIES, "name,country\nLondon,United Kingdom\nLeeds,United Kingdom\n")
        .with(files::MALE_FORENAMES, "name\nJohn\nPeter\n")
        .with(files::FEMALE_FORENAMES, "name\nMary\nAnne\n")
        .with(files::SURNAMES, "name\nSmith\nJones\n")
        .with(files::ADJECTIVES, "name\nquick\n")
        .with(files::NOUNS, "name\nfox\n");
    World::initialise(scale_factor, &sources).unwrap()
}

/// Shared log of what the scripted backend saw.
#[derive(Default)]
struct Log {
    actions: Vec<Action>,
    commits: usize,
    rollbacks: usize,
}

struct ScriptedTx {
    log: Arc<Mutex<Log>>,
    executed: usize,
    fail_on: Option<usize>,
}

impl Transaction for ScriptedTx {
    async fn execute(&mut self, action: &Action) -> Result<ActionOutput, DriverError> {
        self.executed += 1;
        if self.fail_on == Some(self.executed) {
            return Err(DriverError::query(action.name(), "scripted failure"));
        }
        self.log.lock().unwrap().actions.push(action.clone());
        Ok(match action {
            Action::UpdateAgesOfPeopleInCity { .. } => ActionOutput::Count(0),
            Action::UnmarriedPeopleInCity { gender, .. } => ActionOutput::Keys(match gender {
                graphsim_world::Gender::Female => vec!["w3".into(), "w1".into(), "w2".into()],
                graphsim_world::Gender::Male => vec!["m2".into(), "m1".into()],
            }),
            Action::MarriedCouplesInCity { .. } => ActionOutput::Couples(vec![Couple {
                wife: "w1".into(),
                husband: "m1".into(),
            }]),
            Action::BirthsInCity { .. } => ActionOutput::Keys(vec!["baby".into()]),
            Action::ResidentsInCity { .. }
            | Action::CitiesInContinent { .. }
            | Action::FindCurrentResidents { .. }
            | Action::TwoHop { .. }
            | Action::ThreeHop { .. } => ActionOutput::Keys(Vec::new()),
            _ => ActionOutput::Done,
        })
    }

    async fn commit(self) -> Result<(), DriverError> {
        self.log.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn rollback(self) -> Result<(), DriverError> {
        self.log.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

struct ScriptedSession {
    key: String,
    log: Arc<Mutex<Log>>,
    fail_on: Option<usize>,
}

impl Session for ScriptedSession {
    type Transaction = ScriptedTx;

    fn key(&self) -> &str {
        &self.key
    }

    async fn new_transaction(&self, _tracker: Tracker) -> Result<ScriptedTx, DriverError> {
        Ok(ScriptedTx {
            log: Arc::clone(&self.log),
            executed: 0,
            fail_on: self.fail_on,
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[derive(Default)]
struct Events(Mutex<Vec<String>>);

impl TraceSink for Events {
    fn enter(&self, key: &TraceKey) {
        self.0.lock().unwrap().push(format!("enter:{}", key.region));
    }
    fn action(&self, _key: &TraceKey, action: &Action) {
        self.0.lock().unwrap().push(action.name().to_owned());
    }
    fn exit(&self, key: &TraceKey) {
        self.0.lock().unwrap().push(format!("exit:{}", key.region));
    }
}

struct Ctx<'a> {
    world: World,
    iteration: u64,
    trace_iteration: bool,
    sink: &'a dyn TraceSink,
    log: Arc<Mutex<Log>>,
    fail_on: Option<usize>,
}

impl AgentContext for Ctx<'_> {
    type Session = ScriptedSession;

    fn world(&self) -> &World {
        &self.world
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn today(&self) -> NaiveDateTime {
        NaiveDate::from_yo_opt(i32::try_from(self.iteration).unwrap(), 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn trace_iteration(&self) -> bool {
        self.trace_iteration
    }

    fn trace_sink(&self) -> &dyn TraceSink {
        self.sink
    }

    async fn session_for(&self, key: &str) -> Result<Arc<ScriptedSession>, DriverError> {
        Ok(Arc::new(ScriptedSession {
            key: key.to_owned(),
            log: Arc::clone(&self.log),
            fail_on: self.fail_on,
        }))
    }
}

fn ctx(scale_factor: u32, sink: &dyn TraceSink) -> Ctx<'_> {
    Ctx {
        world: world(scale_factor),
        iteration: 1,
        trace_iteration: true,
        sink,
        log: Arc::default(),
        fail_on: None,
    }
}

async fn birth_emails(seed: u64) -> Vec<String> {
    let sink = NoopTraceSink;
    let ctx = ctx(1, &sink);
    let agent = Agent::new(AgentKind::PersonBirth, false);
    agent.run(&ctx, RandomSource::new(seed)).await;
    let log = ctx.log.lock().unwrap();
    log.actions
        .iter()
        .map(|a| match a {
            Action::InsertPerson { email, .. } => email.clone(),
            other => panic!("unexpected action {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn person_birth_emails_are_reproducible() {
    let first = birth_emails(1).await;
    let second = birth_emails(1).await;
    assert_eq!(first.len(), 2, "one person per city at scale factor 1");
    assert_eq!(first, second);
    assert!(first[0].contains("_0001-01-01T00:00_0_1_London_United Kingdom_Europe@gmail.com"));
}

#[tokio::test]
async fn failing_action_rolls_back_only_that_region() {
    let sink = NoopTraceSink;
    let mut ctx = ctx(5, &sink);
    ctx.fail_on = Some(3);
    let agent = Agent::new(AgentKind::PersonBirth, false);
    let report = agent.run(&ctx, RandomSource::new(1)).await;

    assert_eq!(report.regions.len(), 2);
    for region in &report.regions {
        assert_eq!(region.actions, 3);
        assert!(matches!(region.outcome, RegionOutcome::RolledBack { .. }));
    }
    let log = ctx.log.lock().unwrap();
    assert_eq!(log.commits, 0);
    assert_eq!(log.rollbacks, 2);
}

#[tokio::test]
async fn marriage_pairs_shuffled_women_with_sorted_men() {
    let sink = NoopTraceSink;
    let ctx = ctx(1, &sink);
    let agent = Agent::new(AgentKind::Marriage, false);
    let report = agent.run(&ctx, RandomSource::new(4)).await;
    assert_eq!(report.committed(), 2);

    let log = ctx.log.lock().unwrap();
    let husbands: Vec<&str> = log
        .actions
        .iter()
        .filter_map(|a| match a {
            Action::InsertMarriage { husband, .. } => Some(husband.as_str()),
            _ => None,
        })
        .collect();
    // two cities, two marriages each, men taken in ascending order
    assert_eq!(husbands, vec!["m1", "m2", "m1", "m2"]);
}

#[tokio::test]
async fn parentship_allocates_to_the_only_couple() {
    let sink = NoopTraceSink;
    let ctx = ctx(1, &sink);
    let agent = Agent::new(AgentKind::Parentship, false);
    agent.run(&ctx, RandomSource::new(4)).await;
    let log = ctx.log.lock().unwrap();
    assert!(log.actions.contains(&Action::InsertParentship {
        mother: "w1".into(),
        father: "m1".into(),
        child: "baby".into(),
    }));
}

#[tokio::test]
async fn trace_scope_requires_flag_and_sampling() {
    let events = Events::default();
    let agent = Agent::new(AgentKind::TwoHop, true);

    let mut sampled = ctx(1, &events);
    agent.run(&sampled, RandomSource::new(1)).await;
    assert_eq!(
        *events.0.lock().unwrap(),
        vec!["enter:world", "twoHop", "exit:world"]
    );

    events.0.lock().unwrap().clear();
    sampled.trace_iteration = false;
    agent.run(&sampled, RandomSource::new(1)).await;
    assert!(events.0.lock().unwrap().is_empty());

    let quiet = Agent::new(AgentKind::TwoHop, false);
    sampled.trace_iteration = true;
    quiet.run(&sampled, RandomSource::new(1)).await;
    assert!(events.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn each_insight_runs_its_own_query_on_the_first_city() {
    let city = || "London".to_owned();
    let cases = [
        (
            AgentKind::FindCurrentResidents,
            Action::FindCurrentResidents { city: city() },
        ),
        (AgentKind::TwoHop, Action::TwoHop { city: city() }),
        (AgentKind::ThreeHop, Action::ThreeHop { city: city() }),
    ];
    for (kind, expected) in cases {
        let sink = NoopTraceSink;
        let ctx = ctx(1, &sink);
        Agent::new(kind, false)
            .run(&ctx, RandomSource::new(1))
            .await;
        let log = ctx.log.lock().unwrap();
        assert_eq!(log.actions, vec![expected], "{kind:?}");
    }
}
