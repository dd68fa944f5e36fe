use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod builder;
mod config;
mod error;
mod models;
mod repositories;
mod resolver;
mod routes;
mod seed;
mod state;
mod timeclock;
mod walks;

use common::database::{DatabaseConfig, init_pool, run_migrations};
use tokio::net::TcpListener;

use crate::builder::EventBuilder;
use crate::config::AppConfig;
use crate::repositories::events::EventRepository;
use crate::repositories::{DogRepository, EventTypeRepository, UserRepository};
use crate::resolver::PgResolver;
use crate::state::AppState;
use crate::timeclock::LocalClock;
use crate::walks::{PgWalkStore, WalkTracker};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    info!("Starting Dogtrack API service");

    let app_config = AppConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let clock = LocalClock::new(&app_config.timezone)?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool, &MIGRATOR).await?;

    // Initialize repositories and the event core
    let resolver = PgResolver::new(pool.clone());
    let builder = EventBuilder::new(resolver, clock, app_config.dogs_default);

    let app_state = AppState {
        db_pool: pool.clone(),
        clock,
        builder,
        users: UserRepository::new(pool.clone()),
        dogs: DogRepository::new(pool.clone()),
        event_types: EventTypeRepository::new(pool.clone()),
        events: EventRepository::new(pool.clone()),
        walks: WalkTracker::new(PgWalkStore::new(pool)),
    };

    if app_config.seed_demo {
        seed::demo_data(&app_state).await?;
    }

    info!("Dogtrack API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&app_config.bind_addr).await?;
    info!("Dogtrack API service listening on {}", app_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
