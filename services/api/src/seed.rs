//! Demo household data
//!
//! Mirrors the sample day used during development: two users, one dog, and
//! a day of care events. Only runs against an empty user table.

use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use tracing::info;

use crate::models::{NewDog, NewEvent, NewUser};
use crate::state::AppState;

/// Insert the demo household unless users already exist.
pub async fn demo_data(state: &AppState) -> Result<()> {
    if !state.users.get_all().await?.is_empty() {
        info!("Skipping demo seed; users already present");
        return Ok(());
    }

    info!("Seeding demo household");

    let david = state
        .users
        .create(&NewUser {
            username: "David".to_string(),
        })
        .await?;
    state
        .users
        .create(&NewUser {
            username: "Judy".to_string(),
        })
        .await?;

    let archie = state
        .dogs
        .create(&NewDog {
            name: "Archie".to_string(),
            birthday: NaiveDate::from_ymd_opt(2019, 1, 14),
        })
        .await?;

    let types = state.event_types.get_all().await?;
    let type_id = |name: &str| -> Result<i64> {
        types
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
            .ok_or_else(|| anyhow::anyhow!("event type {} not seeded", name))
    };

    // One sample day, 2020-04-20 in the local zone.
    let day: &[(&str, i64, Option<i64>, Option<&str>, bool)] = &[
        ("EAT", 1587396600, None, None, false),
        ("CLOMIPRAMINE", 1587396601, None, None, false),
        ("WALK", 1587399300, Some(1587400645), None, false),
        ("PEE", 1587399745, None, None, false),
        ("POOP", 1587399925, None, None, false),
        ("PLAY", 1587405205, Some(1587406285), Some("Played fetch and rope tug"), false),
        ("PEE", 1587409345, None, None, true),
        ("BATH", 1587419425, None, None, false),
        ("GROOM", 1587419425, None, None, false),
        ("TRAINING", 1587428545, Some(1587430405), None, false),
    ];

    for (kind, start, end, note, is_accident) in day {
        let start_time = DateTime::from_timestamp(*start, 0)
            .ok_or_else(|| anyhow::anyhow!("bad seed timestamp {}", start))?;
        let end_time = match end {
            Some(end) => Some(
                DateTime::from_timestamp(*end, 0)
                    .ok_or_else(|| anyhow::anyhow!("bad seed timestamp {}", end))?,
            ),
            None => None,
        };

        state
            .events
            .insert(&NewEvent {
                user_id: david.id,
                dog_ids: vec![archie.id],
                event_type_id: type_id(kind)?,
                note: (*note).map(str::to_string),
                start_time,
                end_time,
                is_accident: *is_accident,
            })
            .await?;
    }

    info!("Demo household seeded");
    Ok(())
}
