//! In-process property graph backend.
//!
//! The graph is a [`GraphStore`] behind a shared async mutex. Each
//! [`MemoryTransaction`] keeps a journal of its successful writes and never
//! copies the graph. Every action takes the lock, replays the journal onto
//! the shared graph, runs, and then reverts through the undo records the
//! replay produced, so other transactions never observe uncommitted writes.
//! Commit replays the journal for good; a failed replay is reverted and
//! leaves the shared graph untouched.
//!
//! Node labels mirror the relational schema: continents, countries and
//! cities are loaded at bootstrap; people, residencies, marriages,
//! parentships, companies and products are created by agents.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::NaiveDate;
use graphsim_agents::{
    Action, ActionOutput, Couple, Driver, DriverError, Session, Tracker, Transaction,
};
use graphsim_world::{Gender, World};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DbError;

/// A person node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Person {
    /// Unique key.
    pub email: String,
    /// Gender.
    pub gender: Gender,
    /// Forename.
    pub forename: String,
    /// Surname.
    pub surname: String,
    /// Birth date.
    pub birth_date: NaiveDate,
    /// City of birth.
    pub birth_city: String,
    /// Age in whole years, once an age update has reached the person.
    pub age: Option<u32>,
}

/// A `LIVES_IN` edge. Open while `end` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Residency {
    /// Resident's email.
    pub email: String,
    /// City.
    pub city: String,
    /// First day of residency.
    pub start: NaiveDate,
    /// Day the resident moved away.
    pub end: Option<NaiveDate>,
}

impl Residency {
    const fn is_current(&self) -> bool {
        self.end.is_none()
    }
}

/// A marriage node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marriage {
    /// Stable identifier.
    pub id: i64,
    /// Wife's email.
    pub wife: String,
    /// Husband's email.
    pub husband: String,
    /// City the marriage took place in.
    pub city: String,
}

/// A `PARENT_OF` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Parentship {
    /// Mother's email.
    pub mother: String,
    /// Father's email.
    pub father: String,
    /// Child's email.
    pub child: String,
}

/// A company node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Company {
    /// Company number.
    pub number: i64,
    /// Name.
    pub name: String,
    /// Country of registration.
    pub country: String,
    /// Founding date.
    pub founded: NaiveDate,
}

/// A product node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    /// Barcode.
    pub barcode: i64,
    /// Name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Continent the product is sold in.
    pub continent: String,
}

/// The whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStore {
    continents: BTreeSet<String>,
    /// Country name to continent name.
    countries: BTreeMap<String, String>,
    /// City name to country name.
    cities: BTreeMap<String, String>,
    people: BTreeMap<String, Person>,
    residencies: Vec<Residency>,
    marriages: BTreeMap<i64, Marriage>,
    parentships: BTreeSet<Parentship>,
    companies: BTreeMap<i64, Company>,
    products: BTreeMap<i64, Product>,
}

impl GraphStore {
    /// A graph holding only the world's geography.
    pub fn from_world(world: &World) -> Self {
        let mut store = Self::default();
        for continent in world.continents() {
            store.continents.insert(continent.name().to_owned());
            for country in continent.countries() {
                store
                    .countries
                    .insert(country.name().to_owned(), continent.name().to_owned());
                for city in country.cities() {
                    store
                        .cities
                        .insert(city.name().to_owned(), country.name().to_owned());
                }
            }
        }
        store
    }

    /// Look up a person by email.
    pub fn person(&self, email: &str) -> Option<&Person> {
        self.people.get(email)
    }

    /// Every person, by email.
    pub fn people(&self) -> impl Iterator<Item = &Person> {
        self.people.values()
    }

    /// Every residency edge, in creation order.
    pub fn residencies(&self) -> &[Residency] {
        &self.residencies
    }

    /// Every marriage, by identifier.
    pub fn marriages(&self) -> impl Iterator<Item = &Marriage> {
        self.marriages.values()
    }

    /// Every parentship, ascending.
    pub fn parentships(&self) -> impl Iterator<Item = &Parentship> {
        self.parentships.iter()
    }

    /// Every company, by number.
    pub fn companies(&self) -> impl Iterator<Item = &Company> {
        self.companies.values()
    }

    /// Every product, by barcode.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.products.values()
    }

    /// Serialize the graph as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DbError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply any action, read or write.
    pub fn execute(&mut self, action: &Action) -> Result<ActionOutput, DbError> {
        self.apply(action, &mut Vec::new())
    }

    /// Apply every journaled write in order, recording how to revert them.
    ///
    /// Stops at the first failure; `undo` then covers the writes that did
    /// apply.
    fn replay(&mut self, journal: &[Action], undo: &mut Vec<Undo>) -> Result<(), DbError> {
        for action in journal {
            self.apply(action, undo)?;
        }
        Ok(())
    }

    /// Revert mutations, newest first.
    fn revert(&mut self, undo: Vec<Undo>) {
        for step in undo.into_iter().rev() {
            match step {
                Undo::Person(email) => {
                    self.people.remove(&email);
                }
                Undo::Residency => {
                    self.residencies.pop();
                }
                Undo::Reopen(index) => {
                    if let Some(residency) = self.residencies.get_mut(index) {
                        residency.end = None;
                    }
                }
                Undo::Marriage(id) => {
                    self.marriages.remove(&id);
                }
                Undo::Parentship(parentship) => {
                    self.parentships.remove(&parentship);
                }
                Undo::Company(number) => {
                    self.companies.remove(&number);
                }
                Undo::Product(barcode) => {
                    self.products.remove(&barcode);
                }
                Undo::Age { email, previous } => {
                    if let Some(person) = self.people.get_mut(&email) {
                        person.age = previous;
                    }
                }
            }
        }
    }

    /// Apply an action, pushing one undo record per mutation.
    ///
    /// Writes validate before they mutate, so a failed write leaves no
    /// trace.
    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, action: &Action, undo: &mut Vec<Undo>) -> Result<ActionOutput, DbError> {
        match action {
            Action::InsertPerson {
                city,
                email,
                gender,
                forename,
                surname,
                birth_date,
            } => {
                self.require_city(city)?;
                if self.people.contains_key(email) {
                    return Err(duplicate("person", email));
                }
                self.people.insert(
                    email.clone(),
                    Person {
                        email: email.clone(),
                        gender: *gender,
                        forename: forename.clone(),
                        surname: surname.clone(),
                        birth_date: *birth_date,
                        birth_city: city.clone(),
                        age: None,
                    },
                );
                self.residencies.push(Residency {
                    email: email.clone(),
                    city: city.clone(),
                    start: *birth_date,
                    end: None,
                });
                undo.push(Undo::Person(email.clone()));
                undo.push(Undo::Residency);
                Ok(ActionOutput::Done)
            }
            Action::InsertMarriage {
                city,
                marriage_id,
                wife,
                husband,
            } => {
                self.require_city(city)?;
                self.require_person(wife)?;
                self.require_person(husband)?;
                if self.marriages.contains_key(marriage_id) {
                    return Err(duplicate("marriage", &marriage_id.to_string()));
                }
                self.marriages.insert(
                    *marriage_id,
                    Marriage {
                        id: *marriage_id,
                        wife: wife.clone(),
                        husband: husband.clone(),
                        city: city.clone(),
                    },
                );
                undo.push(Undo::Marriage(*marriage_id));
                Ok(ActionOutput::Done)
            }
            Action::InsertParentship {
                mother,
                father,
                child,
            } => {
                self.require_person(mother)?;
                self.require_person(father)?;
                self.require_person(child)?;
                let parentship = Parentship {
                    mother: mother.clone(),
                    father: father.clone(),
                    child: child.clone(),
                };
                if !self.parentships.insert(parentship.clone()) {
                    return Err(duplicate("parentship", child));
                }
                undo.push(Undo::Parentship(parentship));
                Ok(ActionOutput::Done)
            }
            Action::InsertRelocation {
                from,
                email,
                destination,
                date,
            } => {
                self.require_person(email)?;
                self.require_city(destination)?;
                let open: Vec<usize> = self
                    .residencies
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.is_current() && r.email == *email && r.city == *from)
                    .map(|(index, _)| index)
                    .collect();
                if open.is_empty() {
                    return Err(DbError::NotResident {
                        email: email.clone(),
                        city: from.clone(),
                    });
                }
                for index in open {
                    if let Some(residency) = self.residencies.get_mut(index) {
                        residency.end = Some(*date);
                        undo.push(Undo::Reopen(index));
                    }
                }
                self.residencies.push(Residency {
                    email: email.clone(),
                    city: destination.clone(),
                    start: *date,
                    end: None,
                });
                undo.push(Undo::Residency);
                Ok(ActionOutput::Done)
            }
            Action::InsertCompany {
                country,
                number,
                name,
                date,
            } => {
                if !self.countries.contains_key(country) {
                    return Err(unknown("country", country));
                }
                if self.companies.contains_key(number) {
                    return Err(duplicate("company", &number.to_string()));
                }
                self.companies.insert(
                    *number,
                    Company {
                        number: *number,
                        name: name.clone(),
                        country: country.clone(),
                        founded: *date,
                    },
                );
                undo.push(Undo::Company(*number));
                Ok(ActionOutput::Done)
            }
            Action::InsertProduct {
                continent,
                barcode,
                name,
                description,
            } => {
                if !self.continents.contains(continent) {
                    return Err(unknown("continent", continent));
                }
                if self.products.contains_key(barcode) {
                    return Err(duplicate("product", &barcode.to_string()));
                }
                self.products.insert(
                    *barcode,
                    Product {
                        barcode: *barcode,
                        name: name.clone(),
                        description: description.clone(),
                        continent: continent.clone(),
                    },
                );
                undo.push(Undo::Product(*barcode));
                Ok(ActionOutput::Done)
            }
            Action::UpdateAgesOfPeopleInCity { city, today } => {
                let residents: Vec<String> = self
                    .current_residents(city)
                    .into_iter()
                    .map(str::to_owned)
                    .collect();
                let mut updated: u64 = 0;
                for email in &residents {
                    if let Some(person) = self.people.get_mut(email) {
                        undo.push(Undo::Age {
                            email: email.clone(),
                            previous: person.age,
                        });
                        person.age = Some(today.years_since(person.birth_date).unwrap_or(0));
                        updated = updated.saturating_add(1);
                    }
                }
                Ok(ActionOutput::Count(updated))
            }
            _ => self.read(action),
        }
    }

    /// Answer a read-only action.
    #[allow(clippy::too_many_lines)]
    pub fn read(&self, action: &Action) -> Result<ActionOutput, DbError> {
        let output = match action {
            Action::UnmarriedPeopleInCity {
                city,
                gender,
                adult_birth_date,
            } => {
                let married: BTreeSet<&str> = self
                    .marriages
                    .values()
                    .flat_map(|m| [m.wife.as_str(), m.husband.as_str()])
                    .collect();
                ActionOutput::Keys(
                    self.current_residents(city)
                        .into_iter()
                        .filter(|email| !married.contains(email))
                        .filter(|email| {
                            self.people.get(*email).is_some_and(|p| {
                                p.gender == *gender && p.birth_date <= *adult_birth_date
                            })
                        })
                        .map(str::to_owned)
                        .collect(),
                )
            }
            Action::BirthsInCity { city, date } => ActionOutput::Keys(
                self.people
                    .values()
                    .filter(|p| p.birth_city == *city && p.birth_date == *date)
                    .map(|p| p.email.clone())
                    .collect(),
            ),
            Action::MarriedCouplesInCity { city } => {
                let mut couples: Vec<Couple> = self
                    .marriages
                    .values()
                    .filter(|m| m.city == *city)
                    .map(|m| Couple {
                        wife: m.wife.clone(),
                        husband: m.husband.clone(),
                    })
                    .collect();
                couples.sort_unstable();
                ActionOutput::Couples(couples)
            }
            Action::ResidentsInCity {
                city,
                limit,
                earliest,
            } => {
                let limit = usize::try_from(*limit).unwrap_or(usize::MAX);
                let residents: BTreeSet<&str> = self
                    .residencies
                    .iter()
                    .filter(|r| r.is_current() && r.city == *city && r.start <= *earliest)
                    .map(|r| r.email.as_str())
                    .collect();
                ActionOutput::Keys(residents.into_iter().take(limit).map(str::to_owned).collect())
            }
            Action::CitiesInContinent { exclude, continent } => ActionOutput::Keys(
                self.cities
                    .iter()
                    .filter(|(name, country)| {
                        *name != exclude
                            && self.countries.get(*country).is_some_and(|c| c == continent)
                    })
                    .map(|(name, _)| name.clone())
                    .collect(),
            ),
            Action::FindCurrentResidents { city } => ActionOutput::Keys(
                self.current_residents(city)
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            ),
            Action::TwoHop { city } => ActionOutput::Keys(
                self.parents_of_children_born_in(city)
                    .into_iter()
                    .map(str::to_owned)
                    .collect(),
            ),
            Action::ThreeHop { city } => {
                let parents = self.parents_of_children_born_in(city);
                let cities: BTreeSet<&str> = self
                    .residencies
                    .iter()
                    .filter(|r| r.is_current() && parents.contains(r.email.as_str()))
                    .map(|r| r.city.as_str())
                    .collect();
                ActionOutput::Keys(cities.into_iter().map(str::to_owned).collect())
            }
            write => {
                return Err(DbError::ReadOnly {
                    action: write.name(),
                });
            }
        };
        Ok(output)
    }

    fn current_residents(&self, city: &str) -> BTreeSet<&str> {
        self.residencies
            .iter()
            .filter(|r| r.is_current() && r.city == city)
            .map(|r| r.email.as_str())
            .collect()
    }

    fn parents_of_children_born_in(&self, city: &str) -> BTreeSet<&str> {
        self.parentships
            .iter()
            .filter(|p| {
                self.people
                    .get(&p.child)
                    .is_some_and(|child| child.birth_city == city)
            })
            .flat_map(|p| [p.mother.as_str(), p.father.as_str()])
            .collect()
    }

    fn require_city(&self, city: &str) -> Result<(), DbError> {
        if self.cities.contains_key(city) {
            Ok(())
        } else {
            Err(unknown("city", city))
        }
    }

    fn require_person(&self, email: &str) -> Result<(), DbError> {
        if self.people.contains_key(email) {
            Ok(())
        } else {
            Err(unknown("person", email))
        }
    }
}

fn unknown(kind: &'static str, key: &str) -> DbError {
    DbError::UnknownReference {
        kind,
        key: key.to_owned(),
    }
}

/// Reverses one mutation made by [`GraphStore::apply`].
#[derive(Debug)]
enum Undo {
    Person(String),
    /// Drop the most recently pushed residency.
    Residency,
    /// Reopen the residency at this index.
    Reopen(usize),
    Marriage(i64),
    Parentship(Parentship),
    Company(i64),
    Product(i64),
    Age { email: String, previous: Option<u32> },
}

fn duplicate(kind: &'static str, key: &str) -> DbError {
    DbError::Duplicate {
        kind,
        key: key.to_owned(),
    }
}

/// Session counters shared by a driver and its sessions.
#[derive(Debug, Default)]
struct SessionStats {
    opened: AtomicU64,
    closed: AtomicU64,
}

/// The in-memory backend.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    store: Arc<Mutex<GraphStore>>,
    stats: Arc<SessionStats>,
    closed: Arc<AtomicBool>,
}

impl MemoryDriver {
    /// Create a driver over an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed graph.
    pub async fn snapshot(&self) -> GraphStore {
        self.store.lock().await.clone()
    }

    /// Sessions opened so far.
    pub fn sessions_opened(&self) -> u64 {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    pub fn sessions_closed(&self) -> u64 {
        self.stats.closed.load(Ordering::SeqCst)
    }

    /// Whether [`Driver::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Driver for MemoryDriver {
    type Session = MemorySession;

    async fn bootstrap(&self, world: &World) -> Result<(), DriverError> {
        let store = GraphStore::from_world(world);
        info!(
            continents = store.continents.len(),
            countries = store.countries.len(),
            cities = store.cities.len(),
            "In-memory graph bootstrapped"
        );
        *self.store.lock().await = store;
        Ok(())
    }

    async fn open_session(&self, key: &str) -> Result<MemorySession, DriverError> {
        if self.is_closed() {
            return Err(DriverError::resource("open_session", DbError::DriverClosed));
        }
        let id = self.stats.opened.fetch_add(1, Ordering::SeqCst);
        debug!(key, id, "Memory session opened");
        Ok(MemorySession {
            id,
            key: key.to_owned(),
            store: Arc::clone(&self.store),
            stats: Arc::clone(&self.stats),
            driver_closed: Arc::clone(&self.closed),
            closed: AtomicBool::new(false),
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.closed.store(true, Ordering::SeqCst);
        info!(
            opened = self.sessions_opened(),
            closed = self.sessions_closed(),
            "In-memory driver closed"
        );
        Ok(())
    }
}

/// A session on the in-memory graph.
#[derive(Debug)]
pub struct MemorySession {
    id: u64,
    key: String,
    store: Arc<Mutex<GraphStore>>,
    stats: Arc<SessionStats>,
    driver_closed: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl MemorySession {
    /// Driver-unique session number, in opening order.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Whether the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Session for MemorySession {
    type Transaction = MemoryTransaction;

    fn key(&self) -> &str {
        &self.key
    }

    async fn new_transaction(&self, tracker: Tracker) -> Result<MemoryTransaction, DriverError> {
        if self.driver_closed.load(Ordering::SeqCst) {
            return Err(DriverError::resource("new_transaction", DbError::DriverClosed));
        }
        if self.is_closed() {
            return Err(DriverError::resource(
                "new_transaction",
                DbError::SessionClosed {
                    key: self.key.clone(),
                },
            ));
        }
        Ok(MemoryTransaction {
            tracker,
            shared: Arc::clone(&self.store),
            journal: Vec::new(),
        })
    }

    async fn close(&self) -> Result<(), DriverError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// A journaling transaction on the in-memory graph.
#[derive(Debug)]
pub struct MemoryTransaction {
    tracker: Tracker,
    shared: Arc<Mutex<GraphStore>>,
    journal: Vec<Action>,
}

impl MemoryTransaction {
    /// Who opened the transaction.
    pub const fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Writes staged so far, in execution order.
    pub fn journal(&self) -> &[Action] {
        &self.journal
    }
}

impl Transaction for MemoryTransaction {
    async fn execute(&mut self, action: &Action) -> Result<ActionOutput, DriverError> {
        let mut shared = self.shared.lock().await;
        let mut undo = Vec::new();
        let output = match shared.replay(&self.journal, &mut undo) {
            Ok(()) if action.is_write() => shared.apply(action, &mut undo),
            Ok(()) => shared.read(action),
            Err(err) => Err(err),
        };
        shared.revert(undo);
        drop(shared);

        if action.is_write() && output.is_ok() {
            self.journal.push(action.clone());
        }
        output.map_err(|err| DriverError::query(action.name(), err))
    }

    async fn commit(self) -> Result<(), DriverError> {
        if self.journal.is_empty() {
            return Ok(());
        }
        let mut shared = self.shared.lock().await;
        let mut undo = Vec::new();
        if let Err(err) = shared.replay(&self.journal, &mut undo) {
            shared.revert(undo);
            return Err(DriverError::resource("commit", err));
        }
        drop(shared);
        debug!(
            agent = %self.tracker.agent,
            region = %self.tracker.region,
            writes = self.journal.len(),
            "Memory transaction committed"
        );
        Ok(())
    }

    async fn rollback(self) -> Result<(), DriverError> {
        debug!(
            agent = %self.tracker.agent,
            region = %self.tracker.region,
            discarded = self.journal.len(),
            "Memory transaction rolled back"
        );
        Ok(())
    }
}
