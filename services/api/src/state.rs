//! Application state shared across handlers

use sqlx::PgPool;

use crate::builder::EventBuilder;
use crate::repositories::events::EventRepository;
use crate::repositories::{DogRepository, EventTypeRepository, UserRepository};
use crate::resolver::PgResolver;
use crate::timeclock::LocalClock;
use crate::walks::{PgWalkStore, WalkTracker};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub clock: LocalClock,
    pub builder: EventBuilder<PgResolver>,
    pub users: UserRepository,
    pub dogs: DogRepository,
    pub event_types: EventTypeRepository,
    pub events: EventRepository,
    pub walks: WalkTracker<PgWalkStore>,
}
