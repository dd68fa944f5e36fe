//! Repositories for database operations

use anyhow::Result;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::models::{Dog, EventType, NewDog, NewEventType, NewUser, User};

pub mod events;

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        info!("Creating new user: {}", new_user.username);

        let row = sqlx::query(
            r#"
            INSERT INTO users (username)
            VALUES ($1)
            RETURNING id, username, password_hash
            "#,
        )
        .bind(&new_user.username)
        .fetch_one(&self.pool)
        .await?;

        Ok(User {
            id: row.get("id"),
            username: row.get("username"),
            password_hash: row.get("password_hash"),
        })
    }

    /// Get all users
    pub async fn get_all(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as(
            r#"
            SELECT id, username, password_hash
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

/// Dog repository for database operations
#[derive(Clone)]
pub struct DogRepository {
    pool: PgPool,
}

impl DogRepository {
    /// Create a new dog repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new dog
    pub async fn create(&self, new_dog: &NewDog) -> Result<Dog> {
        info!("Creating new dog: {}", new_dog.name);

        let row = sqlx::query(
            r#"
            INSERT INTO dogs (name, birthday)
            VALUES ($1, $2)
            RETURNING id, name, birthday
            "#,
        )
        .bind(&new_dog.name)
        .bind(new_dog.birthday)
        .fetch_one(&self.pool)
        .await?;

        Ok(Dog {
            id: row.get("id"),
            name: row.get("name"),
            birthday: row.get("birthday"),
        })
    }

    /// Get all dogs
    pub async fn get_all(&self) -> Result<Vec<Dog>> {
        let dogs = sqlx::query_as(
            r#"
            SELECT id, name, birthday
            FROM dogs
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(dogs)
    }

    /// Find a dog by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Dog>> {
        let dog = sqlx::query_as(
            r#"
            SELECT id, name, birthday
            FROM dogs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(dog)
    }
}

/// Event-kind catalog repository for database operations
#[derive(Clone)]
pub struct EventTypeRepository {
    pool: PgPool,
}

impl EventTypeRepository {
    /// Create a new event-kind repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new kind into the catalog. Names are stored upper-case.
    pub async fn create(&self, new_type: &NewEventType) -> Result<EventType> {
        info!("Creating new event type: {}", new_type.name);

        let row = sqlx::query(
            r#"
            INSERT INTO event_types (name)
            VALUES (upper($1))
            RETURNING id, name
            "#,
        )
        .bind(&new_type.name)
        .fetch_one(&self.pool)
        .await?;

        Ok(EventType {
            id: row.get("id"),
            name: row.get("name"),
        })
    }

    /// Get the whole catalog
    pub async fn get_all(&self) -> Result<Vec<EventType>> {
        let types = sqlx::query_as(
            r#"
            SELECT id, name
            FROM event_types
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }
}
