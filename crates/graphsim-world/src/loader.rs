//! CSV reference-data ingestion.
//!
//! Reference data arrives as a [`WorldSources`] map from logical file name to
//! raw bytes, so the loader never touches the filesystem itself (except via
//! [`WorldSources::from_dir`], used by the binary). Every file carries a
//! header row; surrounding whitespace in fields is trimmed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::LoadError;
use crate::world::{City, Continent, Country, NamePools, POOL_ENTRIES_PER_SCALE, World};

/// Logical reference file names.
pub mod files {
    /// Continents: `name`.
    pub const CONTINENTS: &str = "continents.csv";
    /// Countries: `name,continent`.
    pub const COUNTRIES: &str = "countries.csv";
    /// Cities: `name,country`.
    pub const CITIES: &str = "cities.csv";
    /// Male forename pool: `name`.
    pub const MALE_FORENAMES: &str = "male_forenames.csv";
    /// Female forename pool: `name`.
    pub const FEMALE_FORENAMES: &str = "female_forenames.csv";
    /// Surname pool: `name`.
    pub const SURNAMES: &str = "surnames.csv";
    /// Adjective pool: `name`.
    pub const ADJECTIVES: &str = "adjectives.csv";
    /// Noun pool: `name`.
    pub const NOUNS: &str = "nouns.csv";
    /// Country currencies: `country,currency`. Optional.
    pub const COUNTRY_CURRENCIES: &str = "country_currencies.csv";
    /// Country languages: `country,language`. Optional.
    pub const COUNTRY_LANGUAGES: &str = "country_languages.csv";

    /// Files that must be present.
    pub const REQUIRED: [&str; 8] = [
        CONTINENTS,
        COUNTRIES,
        CITIES,
        MALE_FORENAMES,
        FEMALE_FORENAMES,
        SURNAMES,
        ADJECTIVES,
        NOUNS,
    ];

    /// Files that may be absent.
    pub const OPTIONAL: [&str; 2] = [COUNTRY_CURRENCIES, COUNTRY_LANGUAGES];
}

/// Reference data keyed by logical file name.
#[derive(Debug, Clone, Default)]
pub struct WorldSources {
    files: BTreeMap<String, Vec<u8>>,
}

impl WorldSources {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(name.into(), bytes.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    /// Raw bytes of a file, if supplied.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Read every known reference file present in `dir`.
    ///
    /// Absent files are skipped; [`World::initialise`] reports the ones that
    /// are required.
    pub fn from_dir(dir: &Path) -> Result<Self, LoadError> {
        let mut sources = Self::new();
        for name in files::REQUIRED.iter().chain(files::OPTIONAL.iter()) {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|source| LoadError::Io {
                path: path.display().to_string(),
                source,
            })?;
            sources.insert(*name, bytes);
        }
        Ok(sources)
    }
}

#[derive(Debug, Deserialize)]
struct NameRecord {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CountryRecord {
    name: String,
    continent: String,
}

#[derive(Debug, Deserialize)]
struct CityRecord {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct CurrencyRecord {
    country: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct LanguageRecord {
    country: String,
    language: String,
}

impl World {
    /// Build the world from reference data.
    ///
    /// Pools are truncated to `scale_factor * POOL_ENTRIES_PER_SCALE`
    /// entries. Continent, country and city names must each be unique since
    /// they double as session keys.
    pub fn initialise(scale_factor: u32, sources: &WorldSources) -> Result<Self, LoadError> {
        if scale_factor == 0 {
            return Err(LoadError::InvalidScaleFactor);
        }

        let mut continents = Vec::new();
        let mut continent_pos = BTreeMap::new();
        for record in parse::<NameRecord>(sources, files::CONTINENTS)? {
            if continent_pos.contains_key(&record.name) {
                return Err(duplicate("continent", record.name));
            }
            continent_pos.insert(record.name.clone(), continents.len());
            continents.push(Continent::new(record.name));
        }

        let mut country_pos = BTreeMap::new();
        for record in parse::<CountryRecord>(sources, files::COUNTRIES)? {
            if country_pos.contains_key(&record.name) {
                return Err(duplicate("country", record.name));
            }
            let continent = continent_pos
                .get(&record.continent)
                .and_then(|&a| continents.get_mut(a).map(|c| (a, c)));
            let Some((a, continent)) = continent else {
                return Err(unknown(files::COUNTRIES, record.name, "continent", record.continent));
            };
            country_pos.insert(record.name.clone(), (a, continent.countries.len()));
            continent.countries.push(Country::new(record.name, record.continent));
        }

        let mut city_names = BTreeSet::new();
        for record in parse::<CityRecord>(sources, files::CITIES)? {
            if !city_names.insert(record.name.clone()) {
                return Err(duplicate("city", record.name));
            }
            let Some(country) = country_mut(&mut continents, &country_pos, &record.country) else {
                return Err(unknown(files::CITIES, record.name, "country", record.country));
            };
            let continent = country.continent().to_owned();
            country
                .cities
                .push(City::new(record.name, record.country, continent));
        }

        if sources.get(files::COUNTRY_CURRENCIES).is_some() {
            for record in parse::<CurrencyRecord>(sources, files::COUNTRY_CURRENCIES)? {
                let Some(country) = country_mut(&mut continents, &country_pos, &record.country)
                else {
                    return Err(unknown(
                        files::COUNTRY_CURRENCIES,
                        record.currency,
                        "country",
                        record.country,
                    ));
                };
                country.currencies.push(record.currency);
            }
        }

        if sources.get(files::COUNTRY_LANGUAGES).is_some() {
            for record in parse::<LanguageRecord>(sources, files::COUNTRY_LANGUAGES)? {
                let Some(country) = country_mut(&mut continents, &country_pos, &record.country)
                else {
                    return Err(unknown(
                        files::COUNTRY_LANGUAGES,
                        record.language,
                        "country",
                        record.country,
                    ));
                };
                country.languages.push(record.language);
            }
        }

        let limit = usize::try_from(scale_factor)
            .unwrap_or(usize::MAX)
            .saturating_mul(POOL_ENTRIES_PER_SCALE);
        let pools = NamePools {
            male_forenames: pool(sources, files::MALE_FORENAMES, limit)?,
            female_forenames: pool(sources, files::FEMALE_FORENAMES, limit)?,
            surnames: pool(sources, files::SURNAMES, limit)?,
            adjectives: pool(sources, files::ADJECTIVES, limit)?,
            nouns: pool(sources, files::NOUNS, limit)?,
        };

        let world = Self::from_parts(scale_factor, continents, pools);
        tracing::info!(
            continents = world.continents().len(),
            countries = world.countries().count(),
            cities = world.cities().count(),
            scale_factor,
            "Reference world loaded"
        );
        Ok(world)
    }
}

fn parse<T: DeserializeOwned>(sources: &WorldSources, file: &str) -> Result<Vec<T>, LoadError> {
    let bytes = sources.get(file).ok_or_else(|| LoadError::MissingFile {
        file: file.to_owned(),
    })?;
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes)
        .deserialize()
        .collect::<Result<Vec<T>, csv::Error>>()
        .map_err(|source| LoadError::Malformed {
            file: file.to_owned(),
            source,
        })
}

fn pool(sources: &WorldSources, file: &str, limit: usize) -> Result<Vec<String>, LoadError> {
    let mut names: Vec<String> = parse::<NameRecord>(sources, file)?
        .into_iter()
        .map(|r| r.name)
        .collect();
    if names.is_empty() {
        return Err(LoadError::EmptyPool {
            file: file.to_owned(),
        });
    }
    names.truncate(limit);
    Ok(names)
}

fn country_mut<'a>(
    continents: &'a mut [Continent],
    positions: &BTreeMap<String, (usize, usize)>,
    name: &str,
) -> Option<&'a mut Country> {
    let &(a, b) = positions.get(name)?;
    continents.get_mut(a)?.countries.get_mut(b)
}

fn duplicate(kind: &'static str, name: String) -> LoadError {
    LoadError::Duplicate { kind, name }
}

fn unknown(file: &str, name: String, kind: &'static str, reference: String) -> LoadError {
    LoadError::UnknownReference {
        file: file.to_owned(),
        name,
        kind,
        reference,
    }
}
