//! Event-kind catalog model
//!
//! Event kinds live in a mutable catalog table. The initial fixed set
//! ("EAT", "WALK", "PEE", ...) is seeded by the schema migration; new kinds
//! may be inserted at runtime.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Event-kind entity. Names are canonically upper-case tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EventType {
    pub id: i64,
    pub name: String,
}

impl EventType {
    /// Whether this kind is the walk kind tracked by the active-walk marker.
    pub fn is_walk(&self) -> bool {
        self.name.eq_ignore_ascii_case("WALK")
    }

    /// Display form of the kind name: "WALK" -> "Walk".
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
            None => String::new(),
        }
    }
}

/// New event-kind creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEventType {
    pub name: String,
}
