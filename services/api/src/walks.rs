//! Active-walk tracking
//!
//! At most one walk may be in progress at a time. The marker lives in the
//! store; the "insert only if no marker exists" step is a single conditional
//! statement backed by a unique index, so concurrent starts cannot both win.

use sqlx::PgPool;
use thiserror::Error;

use crate::models::EventDetail;

/// Errors and rejected transitions from the walk tracker
#[derive(Debug, Error)]
pub enum WalkError {
    /// The referenced event is not of the WALK kind
    #[error("event {0} is not a walk")]
    NotAWalk(i64),

    /// A walk is already in progress; the original marker is untouched
    #[error("a walk is already in progress")]
    AlreadyActive,

    /// The underlying store operation failed
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Store operations for the active-walk marker.
pub trait WalkStore {
    /// Insert the marker only if none exists. Returns whether it was
    /// inserted; `false` means another walk is already active.
    fn insert_if_absent(&self, event_id: i64) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// The event id of the walk in progress, if any.
    fn current_event_id(&self) -> impl Future<Output = anyhow::Result<Option<i64>>> + Send;

    /// Remove the marker. Removing an absent marker is fine.
    fn clear(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Marker store backed by the `active_walks` table.
#[derive(Clone)]
pub struct PgWalkStore {
    pool: PgPool,
}

impl PgWalkStore {
    /// Create a new walk store over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl WalkStore for PgWalkStore {
    async fn insert_if_absent(&self, event_id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO active_walks (event_id)
            SELECT $1
            WHERE NOT EXISTS (SELECT 1 FROM active_walks)
            "#,
        )
        .bind(event_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() > 0),
            // The unique index is the backstop for two starts racing past
            // the NOT EXISTS check.
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn current_event_id(&self) -> anyhow::Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT event_id FROM active_walks")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM active_walks")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Tracks whether a walk is currently open.
///
/// Two states: idle and walk-active. Starting while active is a rejected
/// transition, not a crash; ending while idle is a no-op.
#[derive(Clone)]
pub struct WalkTracker<S> {
    store: S,
}

impl<S: WalkStore> WalkTracker<S> {
    /// Create a tracker over the given marker store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Mark the given WALK event as the walk in progress.
    pub async fn begin_walk(&self, event: &EventDetail) -> Result<(), WalkError> {
        if !event.event_type.is_walk() {
            return Err(WalkError::NotAWalk(event.id));
        }
        if self.store.insert_if_absent(event.id).await? {
            Ok(())
        } else {
            Err(WalkError::AlreadyActive)
        }
    }

    /// The event id of the walk in progress, if any.
    pub async fn current_walk(&self) -> Result<Option<i64>, WalkError> {
        Ok(self.store.current_event_id().await?)
    }

    /// Close the walk in progress. Idempotent.
    pub async fn end_walk(&self) -> Result<(), WalkError> {
        Ok(self.store.clear().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dog, EventType, User};
    use chrono::Utc;
    use std::sync::Mutex;

    fn walk_event(id: i64) -> EventDetail {
        EventDetail {
            id,
            user: User {
                id: 1,
                username: "David".to_string(),
                password_hash: None,
            },
            event_type: EventType {
                id: 7,
                name: "WALK".to_string(),
            },
            dogs: vec![Dog {
                id: 1,
                name: "Archie".to_string(),
                birthday: None,
            }],
            note: None,
            start_time: Utc::now(),
            end_time: None,
            is_accident: false,
        }
    }

    fn eat_event(id: i64) -> EventDetail {
        let mut event = walk_event(id);
        event.event_type = EventType {
            id: 3,
            name: "EAT".to_string(),
        };
        event
    }

    /// In-memory marker with the same insert-if-absent contract as the
    /// store-backed one.
    #[derive(Default)]
    struct FakeWalkStore {
        marker: Mutex<Option<i64>>,
    }

    impl WalkStore for &FakeWalkStore {
        async fn insert_if_absent(&self, event_id: i64) -> anyhow::Result<bool> {
            let mut marker = self.marker.lock().unwrap();
            if marker.is_some() {
                Ok(false)
            } else {
                *marker = Some(event_id);
                Ok(true)
            }
        }

        async fn current_event_id(&self) -> anyhow::Result<Option<i64>> {
            Ok(*self.marker.lock().unwrap())
        }

        async fn clear(&self) -> anyhow::Result<()> {
            *self.marker.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_begin_then_current_then_end() {
        let store = FakeWalkStore::default();
        let tracker = WalkTracker::new(&store);

        tracker.begin_walk(&walk_event(42)).await.unwrap();
        assert_eq!(tracker.current_walk().await.unwrap(), Some(42));

        tracker.end_walk().await.unwrap();
        assert_eq!(tracker.current_walk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_second_begin_is_rejected_and_marker_unchanged() {
        let store = FakeWalkStore::default();
        let tracker = WalkTracker::new(&store);

        tracker.begin_walk(&walk_event(42)).await.unwrap();
        let err = tracker.begin_walk(&walk_event(43)).await.unwrap_err();

        assert!(matches!(err, WalkError::AlreadyActive));
        assert_eq!(tracker.current_walk().await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_non_walk_event_is_rejected() {
        let store = FakeWalkStore::default();
        let tracker = WalkTracker::new(&store);

        let err = tracker.begin_walk(&eat_event(7)).await.unwrap_err();
        assert!(matches!(err, WalkError::NotAWalk(7)));
        assert_eq!(tracker.current_walk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_end_walk_when_idle_is_a_no_op() {
        let store = FakeWalkStore::default();
        let tracker = WalkTracker::new(&store);

        tracker.end_walk().await.unwrap();
        assert_eq!(tracker.current_walk().await.unwrap(), None);
    }
}
