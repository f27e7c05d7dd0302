//! Regions an agent runs over, and their session keys.

use graphsim_world::{City, Continent, Country, World};

/// Session key used by worldwide agents.
pub const WORLD_KEY: &str = "world";

/// The granularity an agent kind works at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKind {
    /// One region per city.
    City,
    /// One region per country.
    Country,
    /// One region per continent.
    Continent,
    /// A single worldwide region.
    World,
}

/// One unit of work for an agent, borrowed from the world.
#[derive(Debug, Clone, Copy)]
pub enum Region<'w> {
    /// A city.
    City(&'w City),
    /// A country.
    Country(&'w Country),
    /// A continent.
    Continent(&'w Continent),
    /// The whole world.
    World,
}

impl<'w> Region<'w> {
    /// All regions of a kind, in stable world order.
    pub fn select(kind: RegionKind, world: &'w World) -> Vec<Self> {
        match kind {
            RegionKind::City => world.cities().map(Region::City).collect(),
            RegionKind::Country => world.countries().map(Region::Country).collect(),
            RegionKind::Continent => world.continents().iter().map(Region::Continent).collect(),
            RegionKind::World => vec![Region::World],
        }
    }

    /// Session key: the region's name, or [`WORLD_KEY`].
    pub fn key(&self) -> &'w str {
        match *self {
            Self::City(city) => city.name(),
            Self::Country(country) => country.name(),
            Self::Continent(continent) => continent.name(),
            Self::World => WORLD_KEY,
        }
    }
}
