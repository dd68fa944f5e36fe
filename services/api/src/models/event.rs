//! Event model and display helpers

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Dog, EventType, User};
use crate::timeclock::LocalClock;

/// Maximum stored length of an event note.
pub const NOTE_MAX_LEN: usize = 128;

/// A fully validated event, ready for persistence.
///
/// The id is assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub user_id: i64,
    pub dog_ids: Vec<i64>,
    pub event_type_id: i64,
    pub note: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_accident: bool,
}

/// A persisted event with its references hydrated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    pub id: i64,
    pub user: User,
    pub event_type: EventType,
    pub dogs: Vec<Dog>,
    pub note: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_accident: bool,
}

impl EventDetail {
    /// How long the event lasted, when both times are present and ordered.
    ///
    /// An end time before the start time is tolerated in storage; it simply
    /// yields no duration here.
    pub fn duration(&self) -> Option<Duration> {
        let end = self.end_time?;
        if end >= self.start_time {
            Some(end - self.start_time)
        } else {
            None
        }
    }

    /// Summary line, e.g. "Walk - Archie - 0:30:00".
    pub fn summary(&self) -> String {
        let names = self
            .dogs
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let duration = match self.duration() {
            Some(d) => {
                let secs = d.num_seconds();
                let (hours, rem) = (secs / 3600, secs % 3600);
                let (minutes, seconds) = (rem / 60, rem % 60);
                format!(" - {}:{:02}:{:02}", hours, minutes, seconds)
            }
            None => String::new(),
        };

        format!("{} - {}{}", self.event_type.display_name(), names, duration)
    }

    /// Entry line in local time, e.g. "David @ 09:35 AM - around the block".
    pub fn entry(&self, clock: &LocalClock) -> String {
        let (_, time) = clock.to_local(self.start_time);
        let note = match &self.note {
            Some(note) => format!(" - {}", note),
            None => String::new(),
        };
        format!(
            "{} @ {}{}",
            self.user.username,
            time.format("%I:%M %p"),
            note
        )
    }
}
