#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Transaction and session semantics of the in-memory driver.

mod common;

use graphsim_agents::{Action, ActionOutput, Couple, Driver, Session, Transaction};
use graphsim_db::MemoryDriver;
use graphsim_world::Gender;

use common::{date, tracker, world};

fn birth(email: &str, gender: Gender) -> Action {
    Action::InsertPerson {
        city: "London".to_owned(),
        email: email.to_owned(),
        gender,
        forename: "F".to_owned(),
        surname: "S".to_owned(),
        birth_date: date(1, 1, 1),
    }
}

fn residents() -> Action {
    Action::FindCurrentResidents {
        city: "London".to_owned(),
    }
}

async fn bootstrapped() -> MemoryDriver {
    let driver = MemoryDriver::new();
    driver.bootstrap(&world()).await.expect("bootstrap");
    driver
}

#[tokio::test]
async fn bootstrap_loads_geography_only() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    let out = tx
        .execute(&Action::CitiesInContinent {
            exclude: "London".to_owned(),
            continent: "Europe".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(out, ActionOutput::Keys(vec!["Paris".to_owned()]));
    assert_eq!(driver.snapshot().await.people().count(), 0);
}

#[tokio::test]
async fn transaction_sees_own_writes_before_commit() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    tx.execute(&birth("a", Gender::Male)).await.unwrap();

    assert_eq!(
        tx.execute(&residents()).await.unwrap(),
        ActionOutput::Keys(vec!["a".to_owned()])
    );
    assert_eq!(driver.snapshot().await.people().count(), 0);

    tx.commit().await.unwrap();
    assert!(driver.snapshot().await.person("a").is_some());
}

#[tokio::test]
async fn rollback_discards_every_write() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    tx.execute(&birth("a", Gender::Male)).await.unwrap();
    tx.execute(&birth("b", Gender::Female)).await.unwrap();
    tx.rollback().await.unwrap();

    assert_eq!(driver.snapshot().await.people().count(), 0);
}

#[tokio::test]
async fn failed_write_is_a_query_error_and_leaves_nothing_staged() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    tx.execute(&birth("a", Gender::Male)).await.unwrap();
    let err = tx.execute(&birth("a", Gender::Male)).await.unwrap_err();
    assert!(err.to_string().contains("insertPerson"));

    tx.commit().await.unwrap();
    assert_eq!(driver.snapshot().await.people().count(), 1);
}

#[tokio::test]
async fn married_couples_come_back_sorted() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    for (email, gender) in [
        ("w2", Gender::Female),
        ("w1", Gender::Female),
        ("m1", Gender::Male),
        ("m2", Gender::Male),
    ] {
        tx.execute(&birth(email, gender)).await.unwrap();
    }
    for (id, wife, husband) in [(1, "w2", "m1"), (2, "w1", "m2")] {
        tx.execute(&Action::InsertMarriage {
            city: "London".to_owned(),
            marriage_id: id,
            wife: wife.to_owned(),
            husband: husband.to_owned(),
        })
        .await
        .unwrap();
    }

    let out = tx
        .execute(&Action::MarriedCouplesInCity {
            city: "London".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(
        out,
        ActionOutput::Couples(vec![
            Couple {
                wife: "w1".to_owned(),
                husband: "m2".to_owned(),
            },
            Couple {
                wife: "w2".to_owned(),
                husband: "m1".to_owned(),
            },
        ])
    );
}

#[tokio::test]
async fn residents_respect_limit_and_start_date() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    for email in ["c", "a", "b"] {
        tx.execute(&birth(email, Gender::Male)).await.unwrap();
    }
    tx.execute(&Action::InsertPerson {
        city: "London".to_owned(),
        email: "newcomer".to_owned(),
        gender: Gender::Male,
        forename: "F".to_owned(),
        surname: "S".to_owned(),
        birth_date: date(9, 1, 1),
    })
    .await
    .unwrap();

    let out = tx
        .execute(&Action::ResidentsInCity {
            city: "London".to_owned(),
            limit: 2,
            earliest: date(5, 1, 1),
        })
        .await
        .unwrap();
    assert_eq!(out, ActionOutput::Keys(vec!["a".to_owned(), "b".to_owned()]));
}

#[tokio::test]
async fn sessions_are_counted_and_refuse_work_once_closed() {
    let driver = bootstrapped().await;
    let first = driver.open_session("London").await.unwrap();
    let second = driver.open_session("London").await.unwrap();
    assert_ne!(first.id(), second.id());
    assert_eq!(driver.sessions_opened(), 2);

    first.close().await.unwrap();
    first.close().await.unwrap();
    assert_eq!(driver.sessions_closed(), 1);
    assert!(first.new_transaction(tracker("London")).await.is_err());
    assert!(second.new_transaction(tracker("London")).await.is_ok());
}

#[tokio::test]
async fn closed_driver_refuses_sessions_and_transactions() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    driver.close().await.unwrap();
    assert!(driver.is_closed());
    assert!(driver.open_session("London").await.is_err());

    let err = session
        .new_transaction(tracker("London"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("driver is closed"));
}

#[tokio::test]
async fn uncommitted_writes_are_invisible_to_other_transactions() {
    let driver = bootstrapped().await;
    let london = driver.open_session("London").await.unwrap();
    let paris = driver.open_session("Paris").await.unwrap();
    let mut writer = london.new_transaction(tracker("London")).await.unwrap();
    let mut reader = paris.new_transaction(tracker("Paris")).await.unwrap();

    writer.execute(&birth("a", Gender::Male)).await.unwrap();
    writer.execute(&birth("b", Gender::Male)).await.unwrap();
    assert_eq!(writer.journal().len(), 2);
    assert_eq!(
        reader.execute(&residents()).await.unwrap(),
        ActionOutput::Keys(vec![])
    );

    writer.commit().await.unwrap();
    assert_eq!(
        reader.execute(&residents()).await.unwrap(),
        ActionOutput::Keys(vec!["a".to_owned(), "b".to_owned()])
    );
}

#[tokio::test]
async fn conflicting_commit_fails_without_partial_writes() {
    let driver = bootstrapped().await;
    let london = driver.open_session("London").await.unwrap();
    let paris = driver.open_session("Paris").await.unwrap();
    let mut first = london.new_transaction(tracker("London")).await.unwrap();
    let mut second = paris.new_transaction(tracker("Paris")).await.unwrap();

    first.execute(&birth("shared", Gender::Male)).await.unwrap();
    second.execute(&birth("other", Gender::Male)).await.unwrap();
    second.execute(&birth("shared", Gender::Male)).await.unwrap();
    first.commit().await.unwrap();

    assert!(second.commit().await.is_err());
    let graph = driver.snapshot().await;
    assert!(graph.person("shared").is_some());
    assert!(graph.person("other").is_none());
    assert_eq!(graph.residencies().len(), 1);
}

#[tokio::test]
async fn relocation_from_a_stale_city_is_rejected() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    tx.execute(&birth("a", Gender::Male)).await.unwrap();

    let err = tx
        .execute(&Action::InsertRelocation {
            from: "Paris".to_owned(),
            email: "a".to_owned(),
            destination: "Tokyo".to_owned(),
            date: date(3, 1, 1),
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("insertRelocation"));
    assert_eq!(tx.journal().len(), 1);
}

#[tokio::test]
async fn snapshot_serializes_to_json() {
    let driver = bootstrapped().await;
    let session = driver.open_session("London").await.unwrap();
    let mut tx = session.new_transaction(tracker("London")).await.unwrap();
    tx.execute(&birth("a", Gender::Female)).await.unwrap();
    tx.commit().await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&driver.snapshot().await.to_json().unwrap()).unwrap();
    assert_eq!(json["people"]["a"]["gender"], "female");
    assert_eq!(json["cities"]["Tokyo"], "Japan");
}
