//! Identifier resolution against the entity store
//!
//! Callers refer to users, dogs, and event kinds by either a numeric id or a
//! name. The resolver maps such a token to exactly one stored entity with a
//! single query per lookup, and reports structured causes instead of raising
//! through the store layer.

use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use thiserror::Error;

use crate::models::{Dog, EventType, Token, User};

/// Why a token could not be mapped to exactly one entity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// Zero matches
    #[error("no match")]
    NotFound,

    /// More than one match. Uniqueness constraints should make this
    /// impossible, but it is checked rather than assumed.
    #[error("more than one match")]
    Ambiguous,

    /// The store access itself failed
    #[error("lookup failed: {0}")]
    LookupFailed(String),
}

/// Read-only view of the entity store used during event construction.
pub trait Directory {
    /// Resolve a token to exactly one user.
    fn resolve_user(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<User, ResolveError>> + Send;

    /// Resolve a token to exactly one dog.
    fn resolve_dog(&self, token: &Token)
    -> impl Future<Output = Result<Dog, ResolveError>> + Send;

    /// Resolve a token to exactly one event kind.
    fn resolve_event_type(
        &self,
        token: &Token,
    ) -> impl Future<Output = Result<EventType, ResolveError>> + Send;

    /// Every dog in the store, for the broadcast default.
    fn all_dogs(&self) -> impl Future<Output = Result<Vec<Dog>, ResolveError>> + Send;
}

/// Resolver backed by the PostgreSQL entity store.
#[derive(Clone)]
pub struct PgResolver {
    pool: PgPool,
}

impl PgResolver {
    /// Create a new resolver over the given pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch by natural key or numeric id in one query, then demand
    /// exactly one row.
    async fn fetch_one<T>(&self, query: &str, token: &Token) -> Result<T, ResolveError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let rows: Vec<T> = sqlx::query_as(query)
            .bind(token.name())
            .bind(token.numeric())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ResolveError::LookupFailed(e.to_string()))?;

        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => Ok(row),
            (Some(_), Some(_)) => Err(ResolveError::Ambiguous),
            (None, _) => Err(ResolveError::NotFound),
        }
    }
}

impl Directory for PgResolver {
    async fn resolve_user(&self, token: &Token) -> Result<User, ResolveError> {
        self.fetch_one(
            r#"
            SELECT id, username, password_hash
            FROM users
            WHERE username = $1 OR id = $2
            "#,
            token,
        )
        .await
    }

    async fn resolve_dog(&self, token: &Token) -> Result<Dog, ResolveError> {
        self.fetch_one(
            r#"
            SELECT id, name, birthday
            FROM dogs
            WHERE name = $1 OR id = $2
            "#,
            token,
        )
        .await
    }

    async fn resolve_event_type(&self, token: &Token) -> Result<EventType, ResolveError> {
        self.fetch_one(
            r#"
            SELECT id, name
            FROM event_types
            WHERE upper(name) = upper($1) OR id = $2
            "#,
            token,
        )
        .await
    }

    async fn all_dogs(&self) -> Result<Vec<Dog>, ResolveError> {
        sqlx::query_as(
            r#"
            SELECT id, name, birthday
            FROM dogs
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ResolveError::LookupFailed(e.to_string()))
    }
}
