//! Domain logic for each agent kind, run against one region.
//!
//! Every function here is deterministic in (world, iteration, region
//! generator, backend read results); read results arrive already sorted.

use chrono::{Months, NaiveDate, NaiveDateTime};
use graphsim_world::{City, Continent, Country, Gender, World};

use crate::action::{Action, marriage_id};
use crate::agent::{AgentContext, AgentKind, Executor};
use crate::driver::Transaction;
use crate::error::AgentError;
use crate::random::RandomSource;
use crate::region::Region;

/// People born at least this many years ago may marry.
pub const ADULT_AGE_YEARS: u32 = 18;

/// Residents must have lived in a city this long before relocating.
pub const RELOCATION_RESIDENCY_YEARS: u32 = 2;

/// Email timestamp layout.
const EMAIL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub(crate) async fn run<C: AgentContext, T: Transaction>(
    kind: AgentKind,
    ctx: &C,
    region: Region<'_>,
    mut rng: RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let world = ctx.world();
    let today = ctx.today();
    match (kind, region) {
        (AgentKind::PersonBirth, Region::City(city)) => {
            person_birth(world, city, today, ctx.iteration(), &mut rng, exec).await
        }
        (AgentKind::AgeUpdate, Region::City(city)) => age_update(city, today.date(), exec).await,
        (AgentKind::Marriage, Region::City(city)) => {
            marriage(city, today.date(), &mut rng, exec).await
        }
        (AgentKind::Parentship, Region::City(city)) => {
            parentship(city, today.date(), &mut rng, exec).await
        }
        (AgentKind::Relocation, Region::City(city)) => {
            relocation(world, city, today.date(), &mut rng, exec).await
        }
        (AgentKind::Company, Region::Country(country)) => {
            company(world, country, today.date(), &mut rng, exec).await
        }
        (AgentKind::Product, Region::Continent(continent)) => {
            product(world, continent, &mut rng, exec).await
        }
        (AgentKind::FindCurrentResidents, Region::World) => {
            insight(kind, world, |city| Action::FindCurrentResidents { city }, exec).await
        }
        (AgentKind::TwoHop, Region::World) => {
            insight(kind, world, |city| Action::TwoHop { city }, exec).await
        }
        (AgentKind::ThreeHop, Region::World) => {
            insight(kind, world, |city| Action::ThreeHop { city }, exec).await
        }
        (kind, region) => Err(AgentError::RegionMismatch {
            agent: kind.name(),
            region: region.key().to_owned(),
        }),
    }
}

fn years_before(today: NaiveDate, years: u32, context: &'static str) -> Result<NaiveDate, AgentError> {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .ok_or(AgentError::DateOutOfRange { context })
}

async fn person_birth<T: Transaction>(
    world: &World,
    city: &City,
    today: NaiveDateTime,
    iteration: u64,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let stamp = today.format(EMAIL_DATE_FORMAT).to_string();
    for i in 0..world.scale_factor() {
        let surname = world.pick_surname(rng).to_owned();
        let gender = Gender::from_bool(rng.next_bool());
        let forename = world.pick_forename(gender, rng).to_owned();
        let email = format!(
            "{forename}.{surname}_{stamp}_{i}_{iteration}_{}_{}_{}@gmail.com",
            city.name(),
            city.country(),
            city.continent()
        );
        exec.done(Action::InsertPerson {
            city: city.name().to_owned(),
            email,
            gender,
            forename,
            surname,
            birth_date: today.date(),
        })
        .await?;
    }
    Ok(())
}

async fn age_update<T: Transaction>(
    city: &City,
    today: NaiveDate,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let updated = exec
        .count(Action::UpdateAgesOfPeopleInCity {
            city: city.name().to_owned(),
            today,
        })
        .await?;
    tracing::trace!(city = city.name(), updated, "Ages updated");
    Ok(())
}

async fn marriage<T: Transaction>(
    city: &City,
    today: NaiveDate,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let adult_birth_date = years_before(today, ADULT_AGE_YEARS, "adult birth date")?;
    let mut women = exec
        .keys(Action::UnmarriedPeopleInCity {
            city: city.name().to_owned(),
            gender: Gender::Female,
            adult_birth_date,
        })
        .await?;
    let men = exec
        .keys(Action::UnmarriedPeopleInCity {
            city: city.name().to_owned(),
            gender: Gender::Male,
            adult_birth_date,
        })
        .await?;

    rng.shuffle(&mut women);
    for (wife, husband) in women.into_iter().zip(men) {
        exec.done(Action::InsertMarriage {
            city: city.name().to_owned(),
            marriage_id: marriage_id(&wife, &husband),
            wife,
            husband,
        })
        .await?;
    }
    Ok(())
}

async fn parentship<T: Transaction>(
    city: &City,
    today: NaiveDate,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let children = exec
        .keys(Action::BirthsInCity {
            city: city.name().to_owned(),
            date: today,
        })
        .await?;
    let couples = exec
        .couples(Action::MarriedCouplesInCity {
            city: city.name().to_owned(),
        })
        .await?;

    let allocation = rng.random_allocation(couples.len(), children.len());
    for (child, index) in children.into_iter().zip(allocation) {
        let Some(couple) = couples.get(index) else {
            continue;
        };
        exec.done(Action::InsertParentship {
            mother: couple.wife.clone(),
            father: couple.husband.clone(),
            child,
        })
        .await?;
    }
    Ok(())
}

async fn relocation<T: Transaction>(
    world: &World,
    city: &City,
    today: NaiveDate,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let earliest = years_before(today, RELOCATION_RESIDENCY_YEARS, "residency start")?;
    let residents = exec
        .keys(Action::ResidentsInCity {
            city: city.name().to_owned(),
            limit: world.scale_factor(),
            earliest,
        })
        .await?;
    let destinations = exec
        .keys(Action::CitiesInContinent {
            exclude: city.name().to_owned(),
            continent: city.continent().to_owned(),
        })
        .await?;

    for email in residents {
        let Some(destination) = rng.choose(&destinations) else {
            break;
        };
        exec.done(Action::InsertRelocation {
            from: city.name().to_owned(),
            email,
            destination: destination.clone(),
            date: today,
        })
        .await?;
    }
    Ok(())
}

async fn company<T: Transaction>(
    world: &World,
    country: &Country,
    today: NaiveDate,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    for _ in 0..world.scale_factor() {
        let number = rng.next_u63();
        let adjective = world.pick_adjective(rng);
        let noun = world.pick_noun(rng);
        exec.done(Action::InsertCompany {
            country: country.name().to_owned(),
            number,
            name: format!("{adjective}-{noun}-{number}"),
            date: today,
        })
        .await?;
    }
    Ok(())
}

async fn product<T: Transaction>(
    world: &World,
    continent: &Continent,
    rng: &mut RandomSource,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    for _ in 0..world.scale_factor() {
        let barcode = rng.next_u63();
        let adjective = world.pick_adjective(rng);
        let noun = world.pick_noun(rng);
        let first = world.pick_adjective(rng);
        let second = world.pick_adjective(rng);
        exec.done(Action::InsertProduct {
            continent: continent.name().to_owned(),
            barcode,
            name: format!("{adjective} {noun}"),
            description: format!("A {first} and {second} {noun}"),
        })
        .await?;
    }
    Ok(())
}

async fn insight<T: Transaction>(
    kind: AgentKind,
    world: &World,
    query: fn(String) -> Action,
    exec: &mut Executor<'_, T>,
) -> Result<(), AgentError> {
    let city = world
        .cities()
        .next()
        .ok_or(AgentError::EmptyPool { pool: "cities" })?
        .name()
        .to_owned();
    let found = exec.keys(query(city)).await?;
    tracing::trace!(agent = kind.name(), found = found.len(), "Insight read");
    Ok(())
}
