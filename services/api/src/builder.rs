//! Event construction from raw submissions
//!
//! The builder turns a `RawSubmission` into a fully validated `NewEvent`,
//! resolving every reference against the store and normalizing the supplied
//! times to UTC. It either produces a complete event or a typed failure; it
//! never writes to the store.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::models::event::NOTE_MAX_LEN;
use crate::models::{NewEvent, RawSubmission, TimeInput, Token};
use crate::resolver::{Directory, ResolveError};
use crate::timeclock::{LocalClock, TimeError};

/// What to do when a submission omits the dogs field entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DogsDefault {
    /// Broadcast: the event applies to every dog in the store.
    All,
    /// The event applies to no dogs.
    None,
}

/// A typed construction failure, naming the failing field and its cause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// A required field was absent from the submission
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    /// A string field exceeds its stored length bound
    #[error("field `{field}` exceeds {limit} characters")]
    FieldTooLong { field: &'static str, limit: usize },

    /// A token could not be mapped to exactly one entity
    #[error("could not resolve {field} `{token}`: {cause}")]
    UnresolvedReference {
        field: &'static str,
        token: String,
        cause: ResolveError,
    },

    /// Time normalization failed
    #[error(transparent)]
    Time(#[from] TimeError),

    /// A store read failed outside of identifier resolution
    #[error("store failure during {operation}: {cause}")]
    Store {
        operation: &'static str,
        cause: String,
    },
}

impl BuildError {
    fn unresolved(field: &'static str, token: &Token, cause: ResolveError) -> Self {
        BuildError::UnresolvedReference {
            field,
            token: token.to_string(),
            cause,
        }
    }

    /// The logical field this failure points at, when it has one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            BuildError::MissingField(field) => Some(field),
            BuildError::FieldTooLong { field, .. } => Some(field),
            BuildError::UnresolvedReference { field, .. } => Some(field),
            BuildError::Time(_) | BuildError::Store { .. } => None,
        }
    }
}

/// Constructs validated events from raw submissions.
#[derive(Clone)]
pub struct EventBuilder<D> {
    directory: D,
    clock: LocalClock,
    dogs_default: DogsDefault,
}

impl<D: Directory> EventBuilder<D> {
    /// Create a builder over the given store view
    pub fn new(directory: D, clock: LocalClock, dogs_default: DogsDefault) -> Self {
        Self {
            directory,
            clock,
            dogs_default,
        }
    }

    /// Validate and resolve a raw submission into a `NewEvent`.
    ///
    /// Fields are checked in a fixed order (user, dogs, event type, then the
    /// optional fields) so the first failing field deterministically names
    /// the reported error.
    pub async fn build(&self, raw: &RawSubmission) -> Result<NewEvent, BuildError> {
        let user_token = raw.user.as_ref().ok_or(BuildError::MissingField("user"))?;
        let user = self
            .directory
            .resolve_user(user_token)
            .await
            .map_err(|cause| BuildError::unresolved("user", user_token, cause))?;

        let dog_ids = self.resolve_dogs(raw.dogs.as_deref()).await?;

        let type_token = raw
            .event_type
            .as_ref()
            .ok_or(BuildError::MissingField("event_type"))?;
        let event_type = self
            .directory
            .resolve_event_type(type_token)
            .await
            .map_err(|cause| BuildError::unresolved("event_type", type_token, cause))?;

        if let Some(note) = &raw.note {
            if note.chars().count() > NOTE_MAX_LEN {
                return Err(BuildError::FieldTooLong {
                    field: "note",
                    limit: NOTE_MAX_LEN,
                });
            }
        }

        // Start time falls back to "now"; end time stays absent when omitted.
        let start_time = self
            .instant_from(raw.start_time.as_ref(), raw.date, true)?
            .unwrap_or_else(Utc::now);
        let end_time = self.instant_from(raw.end_time.as_ref(), raw.date, false)?;

        Ok(NewEvent {
            user_id: user.id,
            dog_ids,
            event_type_id: event_type.id,
            note: raw.note.clone(),
            start_time,
            end_time,
            is_accident: raw.is_accident.unwrap_or(false),
        })
    }

    /// Resolve the dog tokens, fail-fast on the first failure. An omitted
    /// field follows the configured default policy.
    async fn resolve_dogs(&self, tokens: Option<&[Token]>) -> Result<Vec<i64>, BuildError> {
        match tokens {
            Some(tokens) => {
                let mut ids = Vec::with_capacity(tokens.len());
                for token in tokens {
                    let dog = self
                        .directory
                        .resolve_dog(token)
                        .await
                        .map_err(|cause| BuildError::unresolved("dog", token, cause))?;
                    ids.push(dog.id);
                }
                Ok(ids)
            }
            None => match self.dogs_default {
                DogsDefault::All => {
                    let dogs = self.directory.all_dogs().await.map_err(|e| {
                        BuildError::Store {
                            operation: "all_dogs",
                            cause: e.to_string(),
                        }
                    })?;
                    Ok(dogs.into_iter().map(|d| d.id).collect())
                }
                DogsDefault::None => Ok(Vec::new()),
            },
        }
    }

    fn instant_from(
        &self,
        input: Option<&TimeInput>,
        date: Option<NaiveDate>,
        default_to_now: bool,
    ) -> Result<Option<DateTime<Utc>>, BuildError> {
        let instant = match input {
            Some(TimeInput::Unix(secs)) => Some(
                DateTime::from_timestamp(*secs, 0)
                    .ok_or(TimeError::InvalidTimestamp(*secs))?,
            ),
            Some(TimeInput::Instant(instant)) => Some(*instant),
            Some(TimeInput::Clock(time)) => Some(self.clock.to_utc(date, Some(*time))?),
            None if default_to_now => Some(self.clock.to_utc(date, None)?),
            None => None,
        };
        Ok(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dog, EventType, User};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory store view that records every resolution attempt.
    #[derive(Default)]
    struct FakeDirectory {
        users: Vec<User>,
        dogs: Vec<Dog>,
        event_types: Vec<EventType>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDirectory {
        fn household() -> Self {
            Self {
                users: vec![
                    User {
                        id: 1,
                        username: "David".to_string(),
                        password_hash: None,
                    },
                    User {
                        id: 2,
                        username: "Judy".to_string(),
                        password_hash: None,
                    },
                ],
                dogs: vec![
                    Dog {
                        id: 1,
                        name: "Archie".to_string(),
                        birthday: NaiveDate::from_ymd_opt(2019, 1, 14),
                    },
                    Dog {
                        id: 2,
                        name: "Bear".to_string(),
                        birthday: None,
                    },
                ],
                event_types: vec![
                    EventType {
                        id: 3,
                        name: "EAT".to_string(),
                    },
                    EventType {
                        id: 7,
                        name: "WALK".to_string(),
                    },
                ],
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn find<T: Clone>(
            items: &[T],
            token: &Token,
            id_of: impl Fn(&T) -> i64,
            name_of: impl Fn(&T) -> &str,
        ) -> Result<T, ResolveError> {
            let matches: Vec<&T> = items
                .iter()
                .filter(|item| {
                    token.numeric() == Some(id_of(item))
                        || token.name() == Some(name_of(item))
                })
                .collect();
            match matches.as_slice() {
                [] => Err(ResolveError::NotFound),
                [one] => Ok((*one).clone()),
                _ => Err(ResolveError::Ambiguous),
            }
        }
    }

    impl Directory for &FakeDirectory {
        async fn resolve_user(&self, token: &Token) -> Result<User, ResolveError> {
            self.record("user");
            FakeDirectory::find(&self.users, token, |u| u.id, |u| &u.username)
        }

        async fn resolve_dog(&self, token: &Token) -> Result<Dog, ResolveError> {
            self.record("dog");
            FakeDirectory::find(&self.dogs, token, |d| d.id, |d| &d.name)
        }

        async fn resolve_event_type(&self, token: &Token) -> Result<EventType, ResolveError> {
            self.record("event_type");
            FakeDirectory::find(&self.event_types, token, |t| t.id, |t| &t.name)
        }

        async fn all_dogs(&self) -> Result<Vec<Dog>, ResolveError> {
            self.record("all_dogs");
            Ok(self.dogs.clone())
        }
    }

    fn builder(
        directory: &FakeDirectory,
        dogs_default: DogsDefault,
    ) -> EventBuilder<&FakeDirectory> {
        let clock = LocalClock::new("America/Los_Angeles").unwrap();
        EventBuilder::new(directory, clock, dogs_default)
    }

    fn submission(value: serde_json::Value) -> RawSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_walk_event_end_to_end() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({
            "user": "David",
            "dogs": ["Archie"],
            "event_type": "WALK",
            "start_time": 1587400200,
            "end_time": 1587402000
        }));

        let event = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap();

        assert_eq!(event.user_id, 1);
        assert_eq!(event.dog_ids, vec![1]);
        assert_eq!(event.event_type_id, 7);
        assert_eq!(
            event.end_time.unwrap() - event.start_time,
            chrono::Duration::minutes(30)
        );
        assert!(!event.is_accident);
    }

    #[tokio::test]
    async fn test_resolution_by_id_and_name_agree() {
        let directory = FakeDirectory::household();
        let by_name = submission(json!({"user": "Judy", "dogs": [], "event_type": "EAT"}));
        let by_id = submission(json!({"user": 2, "dogs": [], "event_type": 3}));
        let by_id_string = submission(json!({"user": "2", "dogs": [], "event_type": "3"}));

        let b = builder(&directory, DogsDefault::None);
        let (a, c, d) = (
            b.build(&by_name).await.unwrap(),
            b.build(&by_id).await.unwrap(),
            b.build(&by_id_string).await.unwrap(),
        );
        assert_eq!(a.user_id, 2);
        assert_eq!(c.user_id, 2);
        assert_eq!(d.user_id, 2);
        assert_eq!(a.event_type_id, 3);
        assert_eq!(c.event_type_id, 3);
        assert_eq!(d.event_type_id, 3);
    }

    #[tokio::test]
    async fn test_missing_user_reported_before_any_resolution() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"dogs": ["Archie"], "event_type": "WALK"}));

        let err = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(err, BuildError::MissingField("user"));
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_event_type_reported_after_dogs() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"user": "David", "dogs": ["Archie"]}));

        let err = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(err, BuildError::MissingField("event_type"));
        assert_eq!(directory.calls(), vec!["user", "dog"]);
    }

    #[tokio::test]
    async fn test_unknown_user_is_unresolved_reference() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"user": "Nonexistent", "event_type": "WALK"}));

        let err = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::UnresolvedReference {
                field: "user",
                token: "Nonexistent".to_string(),
                cause: ResolveError::NotFound,
            }
        );
    }

    #[tokio::test]
    async fn test_dog_resolution_fails_fast() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({
            "user": "David",
            "dogs": ["Archie", "Ghost", "Bear"],
            "event_type": "WALK"
        }));

        let err = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::UnresolvedReference {
                field: "dog",
                token: "Ghost".to_string(),
                cause: ResolveError::NotFound,
            }
        );
        // Bear was never attempted.
        assert_eq!(directory.calls(), vec!["user", "dog", "dog"]);
    }

    #[tokio::test]
    async fn test_omitted_dogs_broadcasts_under_all_policy() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"user": "David", "event_type": "EAT"}));

        let event = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap();

        assert_eq!(event.dog_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_omitted_dogs_is_empty_under_none_policy() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"user": "David", "event_type": "EAT"}));

        let event = builder(&directory, DogsDefault::None)
            .build(&raw)
            .await
            .unwrap();

        assert!(event.dog_ids.is_empty());
    }

    #[tokio::test]
    async fn test_note_length_bound() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({
            "user": "David",
            "event_type": "EAT",
            "note": "x".repeat(129)
        }));

        let err = builder(&directory, DogsDefault::None)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BuildError::FieldTooLong {
                field: "note",
                limit: 128
            }
        );
    }

    #[tokio::test]
    async fn test_wall_clock_times_use_local_zone() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({
            "user": "David",
            "dogs": ["Archie"],
            "event_type": "WALK",
            "date": "2020-04-20",
            "start_time": "09:30",
            "end_time": "10:00"
        }));

        let event = builder(&directory, DogsDefault::All)
            .build(&raw)
            .await
            .unwrap();

        // 09:30 in Los Angeles on that date is 16:30 UTC (PDT).
        assert_eq!(
            event.start_time,
            "2020-04-20T16:30:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(
            event.end_time.unwrap(),
            "2020-04-20T17:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[tokio::test]
    async fn test_omitted_end_time_stays_absent() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({"user": "David", "event_type": "PEE"}));
        let directory_with_pee = {
            let mut d = directory;
            d.event_types.push(EventType {
                id: 12,
                name: "PEE".to_string(),
            });
            d
        };

        let event = builder(&directory_with_pee, DogsDefault::None)
            .build(&raw)
            .await
            .unwrap();

        assert!(event.end_time.is_none());
        // Start time defaulted to now.
        assert!((Utc::now() - event.start_time).num_seconds().abs() < 5);
    }

    #[tokio::test]
    async fn test_invalid_unix_timestamp() {
        let directory = FakeDirectory::household();
        let raw = submission(json!({
            "user": "David",
            "event_type": "EAT",
            "start_time": i64::MAX
        }));

        let err = builder(&directory, DogsDefault::None)
            .build(&raw)
            .await
            .unwrap_err();

        assert_eq!(err, BuildError::Time(TimeError::InvalidTimestamp(i64::MAX)));
    }
}
