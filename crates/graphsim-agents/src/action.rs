//! The closed catalogue of backend actions and their outputs.
//!
//! An [`Action`] is a pure description of one domain operation plus its
//! inputs. Backends translate each variant into their native query language
//! inside [`Transaction::execute`](crate::driver::Transaction::execute) and
//! answer with an [`ActionOutput`]. List outputs are re-sorted on conversion
//! so backend-native order never reaches agent logic.

use chrono::NaiveDate;
use graphsim_world::Gender;
use serde::Serialize;

use crate::error::AgentError;

/// One domain operation against a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Create a person born (and resident) in a city.
    InsertPerson {
        /// City of birth and first residency.
        city: String,
        /// Unique person key.
        email: String,
        /// Gender.
        gender: Gender,
        /// Forename.
        forename: String,
        /// Surname.
        surname: String,
        /// Birth date, also the residency start.
        birth_date: NaiveDate,
    },

    /// Marry two people in a city.
    InsertMarriage {
        /// City the marriage took place in.
        city: String,
        /// Stable identifier, see [`marriage_id`].
        marriage_id: i64,
        /// Wife's email.
        wife: String,
        /// Husband's email.
        husband: String,
    },

    /// Record both parents of a child.
    InsertParentship {
        /// Mother's email.
        mother: String,
        /// Father's email.
        father: String,
        /// Child's email.
        child: String,
    },

    /// Move a resident to another city.
    InsertRelocation {
        /// Current city.
        from: String,
        /// Person's email.
        email: String,
        /// Destination city.
        destination: String,
        /// Move date (ends the old residency, starts the new one).
        date: NaiveDate,
    },

    /// Register a company in a country.
    InsertCompany {
        /// Country of registration.
        country: String,
        /// Company number.
        number: i64,
        /// Company name.
        name: String,
        /// Founding date.
        date: NaiveDate,
    },

    /// Launch a product on a continent.
    InsertProduct {
        /// Continent the product is sold in.
        continent: String,
        /// Barcode.
        barcode: i64,
        /// Product name.
        name: String,
        /// Free text description.
        description: String,
    },

    /// Recompute the age of every current resident of a city.
    UpdateAgesOfPeopleInCity {
        /// City.
        city: String,
        /// Reference date.
        today: NaiveDate,
    },

    /// Unmarried adult residents of one gender.
    UnmarriedPeopleInCity {
        /// City.
        city: String,
        /// Gender.
        gender: Gender,
        /// Latest birth date that still counts as adult.
        adult_birth_date: NaiveDate,
    },

    /// People born in a city on a date.
    BirthsInCity {
        /// City.
        city: String,
        /// Birth date.
        date: NaiveDate,
    },

    /// Couples married in a city.
    MarriedCouplesInCity {
        /// City.
        city: String,
    },

    /// Long-standing residents of a city.
    ResidentsInCity {
        /// City.
        city: String,
        /// Maximum number of residents returned.
        limit: u32,
        /// Residency must have started on or before this date.
        earliest: NaiveDate,
    },

    /// Other cities on a continent.
    CitiesInContinent {
        /// City to leave out.
        exclude: String,
        /// Continent.
        continent: String,
    },

    /// Everyone currently living in a city.
    FindCurrentResidents {
        /// City.
        city: String,
    },

    /// Parents of the children born in a city.
    TwoHop {
        /// City.
        city: String,
    },

    /// Current cities of the parents of the children born in a city.
    ThreeHop {
        /// City.
        city: String,
    },
}

impl Action {
    /// Reporting name, as used in traces and backend diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::InsertPerson { .. } => "insertPerson",
            Self::InsertMarriage { .. } => "insertMarriage",
            Self::InsertParentship { .. } => "insertParentship",
            Self::InsertRelocation { .. } => "insertRelocation",
            Self::InsertCompany { .. } => "insertCompany",
            Self::InsertProduct { .. } => "insertProduct",
            Self::UpdateAgesOfPeopleInCity { .. } => "updateAgesOfPeopleInCity",
            Self::UnmarriedPeopleInCity { .. } => "unmarriedPeopleInCity",
            Self::BirthsInCity { .. } => "birthsInCity",
            Self::MarriedCouplesInCity { .. } => "marriedCouplesInCity",
            Self::ResidentsInCity { .. } => "residentsInCity",
            Self::CitiesInContinent { .. } => "citiesInContinent",
            Self::FindCurrentResidents { .. } => "findCurrentResidents",
            Self::TwoHop { .. } => "twoHop",
            Self::ThreeHop { .. } => "threeHop",
        }
    }

    /// Whether the action mutates backend state.
    pub const fn is_write(&self) -> bool {
        matches!(
            self,
            Self::InsertPerson { .. }
                | Self::InsertMarriage { .. }
                | Self::InsertParentship { .. }
                | Self::InsertRelocation { .. }
                | Self::InsertCompany { .. }
                | Self::InsertProduct { .. }
                | Self::UpdateAgesOfPeopleInCity { .. }
        )
    }
}

/// A married couple, ordered by wife then husband.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Couple {
    /// Wife's email.
    pub wife: String,
    /// Husband's email.
    pub husband: String,
}

/// What a backend returns for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutput {
    /// No result.
    Done,
    /// Number of rows or nodes touched.
    Count(u64),
    /// Ordered keys (emails or city names).
    Keys(Vec<String>),
    /// Married couples.
    Couples(Vec<Couple>),
}

impl ActionOutput {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Count(_) => "count",
            Self::Keys(_) => "keys",
            Self::Couples(_) => "couples",
        }
    }

    fn mismatch(&self, action: &'static str, expected: &'static str) -> AgentError {
        AgentError::UnexpectedOutput {
            action,
            expected,
            found: self.shape(),
        }
    }

    /// Expect no result.
    pub fn into_done(self, action: &'static str) -> Result<(), AgentError> {
        match self {
            Self::Done => Ok(()),
            other => Err(other.mismatch(action, "done")),
        }
    }

    /// Expect a count.
    pub fn into_count(self, action: &'static str) -> Result<u64, AgentError> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(other.mismatch(action, "count")),
        }
    }

    /// Expect keys, returned in ascending order.
    pub fn into_keys(self, action: &'static str) -> Result<Vec<String>, AgentError> {
        match self {
            Self::Keys(mut keys) => {
                keys.sort_unstable();
                Ok(keys)
            }
            other => Err(other.mismatch(action, "keys")),
        }
    }

    /// Expect couples, returned in ascending order.
    pub fn into_couples(self, action: &'static str) -> Result<Vec<Couple>, AgentError> {
        match self {
            Self::Couples(mut couples) => {
                couples.sort_unstable();
                Ok(couples)
            }
            other => Err(other.mismatch(action, "couples")),
        }
    }
}

/// Stable marriage identifier: the first eight bytes of the BLAKE3 hash of
/// `wife + husband`, little endian.
pub fn marriage_id(wife: &str, husband: &str) -> i64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(wife.as_bytes());
    hasher.update(husband.as_bytes());
    let hash = hasher.finalize();
    hash.as_bytes()
        .first_chunk::<8>()
        .map_or(0, |bytes| i64::from_le_bytes(*bytes))
}
