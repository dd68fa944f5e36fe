//! Event repository for database operations
//!
//! Event writes are transactional: the event row and its dog associations
//! land together or not at all.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{Dog, EventDetail, EventType, NewEvent, User};

/// Event repository for database operations
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

const DETAIL_COLUMNS: &str = r#"
    e.id, e.note, e.start_time, e.end_time, e.is_accident,
    u.id AS user_id, u.username, u.password_hash,
    t.id AS event_type_id, t.name AS event_type_name
    FROM events e
    JOIN users u ON u.id = e.user_id
    JOIN event_types t ON t.id = e.event_type_id
"#;

impl EventRepository {
    /// Create a new event repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a validated event and its dog associations in one transaction.
    pub async fn insert(&self, new_event: &NewEvent) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO events (user_id, event_type_id, note, start_time, end_time, is_accident)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(new_event.user_id)
        .bind(new_event.event_type_id)
        .bind(&new_event.note)
        .bind(new_event.start_time)
        .bind(new_event.end_time)
        .bind(new_event.is_accident)
        .fetch_one(&mut *tx)
        .await?;

        let event_id: i64 = row.get("id");

        for dog_id in &new_event.dog_ids {
            sqlx::query("INSERT INTO dog_events (event_id, dog_id) VALUES ($1, $2)")
                .bind(event_id)
                .bind(dog_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Inserted event {}", event_id);

        Ok(event_id)
    }

    /// Replace an event's fields and dog associations in one transaction.
    /// Returns false when the event does not exist.
    pub async fn update(&self, id: i64, new_event: &NewEvent) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE events
            SET user_id = $2, event_type_id = $3, note = $4,
                start_time = $5, end_time = $6, is_accident = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(new_event.user_id)
        .bind(new_event.event_type_id)
        .bind(&new_event.note)
        .bind(new_event.start_time)
        .bind(new_event.end_time)
        .bind(new_event.is_accident)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM dog_events WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for dog_id in &new_event.dog_ids {
            sqlx::query("INSERT INTO dog_events (event_id, dog_id) VALUES ($1, $2)")
                .bind(id)
                .bind(dog_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Updated event {}", id);

        Ok(true)
    }

    /// Delete an event. Returns false when it does not exist.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch a single event with its references hydrated.
    pub async fn get_detail(&self, id: i64) -> Result<Option<EventDetail>> {
        let row = sqlx::query(&format!("SELECT {} WHERE e.id = $1", DETAIL_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut event = detail_from_row(&row);
                let mut dogs = self.dogs_for_events(&[event.id]).await?;
                event.dogs = dogs.remove(&event.id).unwrap_or_default();
                Ok(Some(event))
            }
            None => Ok(None),
        }
    }

    /// All events, most recent first.
    pub async fn list(&self) -> Result<Vec<EventDetail>> {
        let rows = sqlx::query(&format!(
            "SELECT {} ORDER BY e.start_time DESC",
            DETAIL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Events involving a dog whose start time falls in [from, to).
    pub async fn list_for_dog_between(
        &self,
        dog_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<EventDetail>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            JOIN dog_events de ON de.event_id = e.id
            WHERE de.dog_id = $1 AND e.start_time >= $2 AND e.start_time < $3
            ORDER BY e.start_time
            "#,
            DETAIL_COLUMNS
        ))
        .bind(dog_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<EventDetail>> {
        let mut events: Vec<EventDetail> = rows.iter().map(detail_from_row).collect();
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        let mut dogs = self.dogs_for_events(&ids).await?;
        for event in &mut events {
            event.dogs = dogs.remove(&event.id).unwrap_or_default();
        }
        Ok(events)
    }

    async fn dogs_for_events(&self, event_ids: &[i64]) -> Result<HashMap<i64, Vec<Dog>>> {
        let rows = sqlx::query(
            r#"
            SELECT de.event_id, d.id AS dog_id, d.name, d.birthday
            FROM dog_events de
            JOIN dogs d ON d.id = de.dog_id
            WHERE de.event_id = ANY($1)
            ORDER BY d.id
            "#,
        )
        .bind(event_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_event: HashMap<i64, Vec<Dog>> = HashMap::new();
        for row in rows {
            by_event.entry(row.get("event_id")).or_default().push(Dog {
                id: row.get("dog_id"),
                name: row.get("name"),
                birthday: row.get("birthday"),
            });
        }
        Ok(by_event)
    }
}

fn detail_from_row(row: &PgRow) -> EventDetail {
    EventDetail {
        id: row.get("id"),
        user: User {
            id: row.get("user_id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
        },
        event_type: EventType {
            id: row.get("event_type_id"),
            name: row.get("event_type_name"),
        },
        dogs: Vec::new(),
        note: row.get("note"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        is_accident: row.get("is_accident"),
    }
}
