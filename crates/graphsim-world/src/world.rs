//! The reference world: geography tree, name pools and lookups.
//!
//! A [`World`] is immutable once built. Entities are owned top-down
//! (continent owns countries, country owns cities); upward links are plain
//! name keys resolved through the world's indices. Iteration order is always
//! reference-file order, which keeps region selection stable across runs.

use std::collections::BTreeMap;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of pool entries kept per unit of scale factor.
pub const POOL_ENTRIES_PER_SCALE: usize = 50;

/// Gender of a simulated person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Gender {
    /// Map a random boolean draw to a gender (`true` is male).
    pub const fn from_bool(male: bool) -> Self {
        if male { Self::Male } else { Self::Female }
    }

    /// Lowercase name, as stored by backends.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A city. The lowest level of the geography tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    name: String,
    country: String,
    continent: String,
}

impl City {
    pub(crate) const fn new(name: String, country: String, continent: String) -> Self {
        Self {
            name,
            country,
            continent,
        }
    }

    /// City name (unique within the world).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the country this city belongs to.
    pub fn country(&self) -> &str {
        &self.country
    }

    /// Name of the continent this city belongs to.
    pub fn continent(&self) -> &str {
        &self.continent
    }
}

/// A country with its cities, currencies and languages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Country {
    name: String,
    continent: String,
    pub(crate) cities: Vec<City>,
    pub(crate) currencies: Vec<String>,
    pub(crate) languages: Vec<String>,
}

impl Country {
    pub(crate) const fn new(name: String, continent: String) -> Self {
        Self {
            name,
            continent,
            cities: Vec::new(),
            currencies: Vec::new(),
            languages: Vec::new(),
        }
    }

    /// Country name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the continent this country belongs to.
    pub fn continent(&self) -> &str {
        &self.continent
    }

    /// Cities in reference-file order.
    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    /// Currency codes used in this country.
    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Languages spoken in this country.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }
}

/// A continent. The root of each geography subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continent {
    name: String,
    pub(crate) countries: Vec<Country>,
}

impl Continent {
    pub(crate) const fn new(name: String) -> Self {
        Self {
            name,
            countries: Vec::new(),
        }
    }

    /// Continent name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Countries in reference-file order.
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }
}

/// Name pools, already truncated to the scale factor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct NamePools {
    pub(crate) male_forenames: Vec<String>,
    pub(crate) female_forenames: Vec<String>,
    pub(crate) surnames: Vec<String>,
    pub(crate) adjectives: Vec<String>,
    pub(crate) nouns: Vec<String>,
}

/// Position of a country inside the tree: (continent, country).
type CountryPos = (usize, usize);

/// Position of a city inside the tree: (continent, country, city).
type CityPos = (usize, usize, usize);

/// The immutable reference world.
#[derive(Debug, Clone)]
pub struct World {
    scale_factor: u32,
    continents: Vec<Continent>,
    pools: NamePools,
    continent_index: BTreeMap<String, usize>,
    country_index: BTreeMap<String, CountryPos>,
    city_index: BTreeMap<String, CityPos>,
}

impl World {
    /// Assemble a world from an already validated tree and pools.
    pub(crate) fn from_parts(scale_factor: u32, continents: Vec<Continent>, pools: NamePools) -> Self {
        let mut continent_index = BTreeMap::new();
        let mut country_index = BTreeMap::new();
        let mut city_index = BTreeMap::new();
        for (a, continent) in continents.iter().enumerate() {
            continent_index.insert(continent.name.clone(), a);
            for (b, country) in continent.countries.iter().enumerate() {
                country_index.insert(country.name.clone(), (a, b));
                for (c, city) in country.cities.iter().enumerate() {
                    city_index.insert(city.name.clone(), (a, b, c));
                }
            }
        }
        Self {
            scale_factor,
            continents,
            pools,
            continent_index,
            country_index,
            city_index,
        }
    }

    /// The scale factor the world was built with.
    pub const fn scale_factor(&self) -> u32 {
        self.scale_factor
    }

    /// All continents in reference-file order.
    pub fn continents(&self) -> &[Continent] {
        &self.continents
    }

    /// All countries, continent by continent.
    pub fn countries(&self) -> impl Iterator<Item = &Country> {
        self.continents.iter().flat_map(|c| c.countries.iter())
    }

    /// All cities, country by country.
    pub fn cities(&self) -> impl Iterator<Item = &City> {
        self.countries().flat_map(|c| c.cities.iter())
    }

    /// Look up a continent by name.
    pub fn continent(&self, name: &str) -> Option<&Continent> {
        let a = *self.continent_index.get(name)?;
        self.continents.get(a)
    }

    /// Look up a country by name.
    pub fn country(&self, name: &str) -> Option<&Country> {
        let (a, b) = *self.country_index.get(name)?;
        self.continents.get(a)?.countries.get(b)
    }

    /// Look up a city by name.
    pub fn city(&self, name: &str) -> Option<&City> {
        let (a, b, c) = *self.city_index.get(name)?;
        self.continents.get(a)?.countries.get(b)?.cities.get(c)
    }

    /// Cities of a country. Empty for an unknown country.
    pub fn cities_in_country(&self, country: &str) -> &[City] {
        self.country(country).map_or(&[], |c| c.cities.as_slice())
    }

    /// Cities of a continent, country by country.
    pub fn cities_in_continent<'a>(&'a self, continent: &str) -> impl Iterator<Item = &'a City> + use<'a> {
        self.continent(continent)
            .into_iter()
            .flat_map(|c| c.countries.iter())
            .flat_map(|c| c.cities.iter())
    }

    /// The country a city belongs to.
    pub fn country_of(&self, city: &City) -> Option<&Country> {
        self.country(city.country())
    }

    /// The continent a city belongs to.
    pub fn continent_of(&self, city: &City) -> Option<&Continent> {
        self.continent(city.continent())
    }

    /// Pick a forename for the given gender. Consumes one draw.
    pub fn pick_forename<R: RngCore + ?Sized>(&self, gender: Gender, rng: &mut R) -> &str {
        match gender {
            Gender::Male => pick(&self.pools.male_forenames, rng),
            Gender::Female => pick(&self.pools.female_forenames, rng),
        }
    }

    /// Pick a surname. Consumes one draw.
    pub fn pick_surname<R: RngCore + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.pools.surnames, rng)
    }

    /// Pick an adjective. Consumes one draw.
    pub fn pick_adjective<R: RngCore + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.pools.adjectives, rng)
    }

    /// Pick a noun. Consumes one draw.
    pub fn pick_noun<R: RngCore + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.pools.nouns, rng)
    }

    /// Number of entries kept in each pool, in the order male forenames,
    /// female forenames, surnames, adjectives, nouns.
    pub fn pool_sizes(&self) -> [usize; 5] {
        [
            self.pools.male_forenames.len(),
            self.pools.female_forenames.len(),
            self.pools.surnames.len(),
            self.pools.adjectives.len(),
            self.pools.nouns.len(),
        ]
    }
}

/// Map one 64-bit draw onto `0..len` by widening multiply.
///
/// Always consumes exactly the one draw it is given, which keeps the number
/// of draws per pick fixed. Returns 0 when `len` is 0.
pub fn uniform_index(draw: u64, len: usize) -> usize {
    let bound = u128::try_from(len).unwrap_or(u128::MAX);
    let wide = u128::from(draw).wrapping_mul(bound).wrapping_shr(64);
    usize::try_from(wide).unwrap_or(0)
}

/// Uniform pick from a pool. Pools are never empty after loading.
fn pick<'a, R: RngCore + ?Sized>(pool: &'a [String], rng: &mut R) -> &'a str {
    if pool.is_empty() {
        return "";
    }
    let idx = uniform_index(rng.next_u64(), pool.len());
    pool.get(idx).map_or("", String::as_str)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::loader::fixtures;

    #[test]
    fn gender_maps_true_to_male() {
        assert_eq!(Gender::from_bool(true), Gender::Male);
        assert_eq!(Gender::from_bool(false), Gender::Female);
        assert_eq!(Gender::Female.to_string(), "female");
    }

    #[test]
    fn traversal_follows_file_order() {
        let world = fixtures::world(1);
        let names: Vec<&str> = world.cities().map(City::name).collect();
        assert_eq!(names, vec!["London", "Manchester", "Paris", "Lyon", "Tokyo"]);
        let europe: Vec<&str> = world.cities_in_continent("Europe").map(City::name).collect();
        assert_eq!(europe, vec!["London", "Manchester", "Paris", "Lyon"]);
        assert!(world.cities_in_continent("Atlantis").next().is_none());
    }

    #[test]
    fn back_references_resolve() {
        let world = fixtures::world(1);
        let lyon = world.city("Lyon").unwrap();
        assert_eq!(world.country_of(lyon).unwrap().name(), "France");
        assert_eq!(world.continent_of(lyon).unwrap().name(), "Europe");
        assert_eq!(world.cities_in_country("United Kingdom").len(), 2);
        assert!(world.cities_in_country("Narnia").is_empty());
        assert_eq!(world.country("France").unwrap().currencies(), ["EUR"]);
    }

    #[test]
    fn pickers_are_deterministic_for_a_seed() {
        let world = fixtures::world(1);
        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(world.pick_surname(&mut a), world.pick_surname(&mut b));
            assert_eq!(
                world.pick_forename(Gender::Female, &mut a),
                world.pick_forename(Gender::Female, &mut b)
            );
        }
    }

    #[test]
    fn uniform_index_stays_in_bounds() {
        assert_eq!(uniform_index(u64::MAX, 3), 2);
        assert_eq!(uniform_index(0, 3), 0);
        assert_eq!(uniform_index(u64::MAX, 0), 0);
        assert_eq!(uniform_index(1 << 63, 2), 1);
    }

    #[test]
    fn picks_come_from_the_right_pool() {
        let world = fixtures::world(1);
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..20 {
            let name = world.pick_forename(Gender::Male, &mut rng);
            assert!(["John", "Peter", "Kenji"].contains(&name));
        }
    }
}
