//! Raw event submission payload
//!
//! Incoming event data arrives as loosely-typed JSON, either from the web
//! form shell or from the webhook endpoint. `RawSubmission` gives that data
//! an explicit shape with named optional fields; the event builder performs
//! all validation and resolution over it.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

/// A caller-supplied entity reference: either a numeric id or a name.
///
/// JSON numbers deserialize as `Id`; strings deserialize as `Name` even when
/// they look numeric, and the resolver additionally tries those as ids.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Token {
    Id(i64),
    Name(String),
}

impl Token {
    /// The numeric id this token may denote, if any.
    pub fn numeric(&self) -> Option<i64> {
        match self {
            Token::Id(id) => Some(*id),
            Token::Name(name) => name.parse().ok(),
        }
    }

    /// The name this token may denote. Numeric ids have no name form.
    pub fn name(&self) -> Option<&str> {
        match self {
            Token::Id(_) => None,
            Token::Name(name) => Some(name.as_str()),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Id(id) => write!(f, "{}", id),
            Token::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Name(value.to_string())
    }
}

/// A caller-supplied point in time, in one of the accepted raw forms.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    /// Seconds since the Unix epoch.
    Unix(i64),
    /// A wall-clock time of day, interpreted in the configured local zone
    /// together with the submission's date field.
    Clock(NaiveTime),
    /// An already absolute instant (RFC 3339).
    Instant(DateTime<Utc>),
}

impl<'de> Deserialize<'de> for TimeInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimeInputVisitor;

        impl<'de> Visitor<'de> for TimeInputVisitor {
            type Value = TimeInput;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a unix timestamp, an HH:MM[:SS] time, or an RFC 3339 instant")
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<TimeInput, E> {
                Ok(TimeInput::Unix(value))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<TimeInput, E> {
                i64::try_from(value)
                    .map(TimeInput::Unix)
                    .map_err(|_| E::custom("timestamp out of range"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TimeInput, E> {
                if let Ok(instant) = value.parse::<DateTime<Utc>>() {
                    return Ok(TimeInput::Instant(instant));
                }
                if let Ok(time) = value.parse::<NaiveTime>() {
                    return Ok(TimeInput::Clock(time));
                }
                Err(E::custom(format!("unrecognized time value `{}`", value)))
            }
        }

        deserializer.deserialize_any(TimeInputVisitor)
    }
}

/// The raw field mapping behind an event submission.
///
/// Field aliases accept the historical form names (`dog`, `event`,
/// `accident`) alongside the canonical ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSubmission {
    #[serde(default)]
    pub user: Option<Token>,
    #[serde(default, alias = "dog")]
    pub dogs: Option<Vec<Token>>,
    #[serde(default, alias = "event")]
    pub event_type: Option<Token>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "accident")]
    pub is_accident: Option<bool>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<TimeInput>,
    #[serde(default)]
    pub end_time: Option<TimeInput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_numeric() {
        assert_eq!(Token::Id(3).numeric(), Some(3));
        assert_eq!(Token::Name("7".to_string()).numeric(), Some(7));
        assert_eq!(Token::Name("Archie".to_string()).numeric(), None);
    }

    #[test]
    fn test_deserialize_webhook_payload() {
        let raw: RawSubmission = serde_json::from_value(json!({
            "user": "David",
            "dogs": ["Archie", 2],
            "event_type": "WALK",
            "start_time": 1587400200,
            "end_time": 1587402000
        }))
        .unwrap();

        assert_eq!(raw.user, Some(Token::Name("David".to_string())));
        assert_eq!(
            raw.dogs,
            Some(vec![Token::Name("Archie".to_string()), Token::Id(2)])
        );
        assert_eq!(raw.start_time, Some(TimeInput::Unix(1587400200)));
        assert_eq!(raw.end_time, Some(TimeInput::Unix(1587402000)));
        assert_eq!(raw.note, None);
        assert_eq!(raw.is_accident, None);
    }

    #[test]
    fn test_deserialize_form_payload() {
        let raw: RawSubmission = serde_json::from_value(json!({
            "user": 1,
            "dog": [1],
            "event": 7,
            "date": "2020-04-20",
            "start_time": "09:35",
            "note": "around the block",
            "accident": false
        }))
        .unwrap();

        assert_eq!(raw.user, Some(Token::Id(1)));
        assert_eq!(raw.event_type, Some(Token::Id(7)));
        assert_eq!(raw.date, Some(NaiveDate::from_ymd_opt(2020, 4, 20).unwrap()));
        assert_eq!(
            raw.start_time,
            Some(TimeInput::Clock(NaiveTime::from_hms_opt(9, 35, 0).unwrap()))
        );
        assert_eq!(raw.is_accident, Some(false));
    }

    #[test]
    fn test_deserialize_rfc3339_instant() {
        let raw: RawSubmission = serde_json::from_value(json!({
            "start_time": "2020-04-20T17:10:00Z"
        }))
        .unwrap();

        let expected = "2020-04-20T17:10:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(raw.start_time, Some(TimeInput::Instant(expected)));
    }

    #[test]
    fn test_deserialize_rejects_garbage_time() {
        let result: Result<RawSubmission, _> = serde_json::from_value(json!({
            "start_time": "not a time"
        }));
        assert!(result.is_err());
    }
}
