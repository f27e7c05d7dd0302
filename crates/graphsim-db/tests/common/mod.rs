//! Shared fixtures for the driver integration tests.

use chrono::NaiveDate;
use graphsim_agents::Tracker;
use graphsim_world::{World, WorldSources, files};

/// A small two-continent world.
pub fn world() -> World {
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
        .with(files::MALE_FORENAMES, "name\nJohn\n")
        .with(files::FEMALE_FORENAMES, "name\nMary\n")
        .with(files::SURNAMES, "name\nSmith\n")
        .with(files::ADJECTIVES, "name\nquick\n")
        .with(files::NOUNS, "name\nfox\n")
        .with(
            files::COUNTRY_CURRENCIES,
            "country,currency\nUnited Kingdom,GBP\nFrance,EUR\n",
        );
    World::initialise(1, &sources).expect("fixture world loads")
}

pub fn tracker(region: &str) -> Tracker {
    Tracker {
        agent: "test".to_owned(),
        region: region.to_owned(),
        iteration: 1,
        trace: false,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
