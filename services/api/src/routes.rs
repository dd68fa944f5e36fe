//! API service routes
//!
//! The routing shell is deliberately thin: it maps verbs and paths onto the
//! event builder, the repositories, and the walk tracker, and turns typed
//! failures into JSON bodies.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::{
    error::{ApiError, ApiResult},
    models::{EventDetail, NewDog, NewEventType, NewUser, RawSubmission, Token},
    state::AppState,
    timeclock::LocalClock,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(index))
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
        .route("/dogs", get(list_dogs).post(create_dog))
        .route("/dogs/:id", get(get_dog))
        .route("/event-types", get(list_event_types).post(create_event_type))
        .route("/webhook", post(webhook))
        .route("/walks/start", post(start_walk))
        .route("/walks/current", get(current_walk))
        .route("/walks/stop", post(stop_walk))
        .with_state(state)
}

/// An event rendered for display, with times in the local zone.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: i64,
    pub user: String,
    pub event_type: String,
    pub dogs: Vec<String>,
    pub note: Option<String>,
    pub is_accident: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub local_date: NaiveDate,
    pub local_start: NaiveTime,
    pub local_end: Option<NaiveTime>,
    pub summary: String,
    pub entry: String,
}

impl EventResponse {
    fn from_detail(event: &EventDetail, clock: &LocalClock) -> Self {
        let (local_date, local_start) = clock.to_local(event.start_time);
        let local_end = event.end_time.map(|end| clock.to_local(end).1);
        Self {
            id: event.id,
            user: event.user.username.clone(),
            event_type: event.event_type.name.clone(),
            dogs: event.dogs.iter().map(|d| d.name.clone()).collect(),
            note: event.note.clone(),
            is_accident: event.is_accident,
            start_time: event.start_time,
            end_time: event.end_time,
            local_date,
            local_start,
            local_end,
            summary: event.summary(),
            entry: event.entry(clock),
        }
    }
}

/// Greeting bucket for a local hour of day.
fn time_of_day(hour: u32) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=16 => "afternoon",
        17..=19 => "evening",
        _ => "night",
    }
}

fn internal(e: anyhow::Error) -> ApiError {
    error!("store operation failed: {}", e);
    ApiError::InternalServerError
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    common::database::health_check(&state.db_pool).await?;
    Ok(Json(json!({
        "status": "ok",
        "service": "dogtrack-api"
    })))
}

/// Home payload: greeting plus each dog's events for the current local day
pub async fn index(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let (today, now) = state.clock.now_local();
    let next = today.succ_opt().ok_or(ApiError::InternalServerError)?;
    let from = state.clock.from_local(today.and_time(NaiveTime::MIN))?;
    let to = state.clock.from_local(next.and_time(NaiveTime::MIN))?;

    let dogs = state.dogs.get_all().await.map_err(internal)?;
    let mut per_dog = Vec::with_capacity(dogs.len());
    for dog in dogs {
        let events = state
            .events
            .list_for_dog_between(dog.id, from, to)
            .await
            .map_err(internal)?;
        per_dog.push(json!({
            "dog": dog,
            "events": events
                .iter()
                .map(|e| EventResponse::from_detail(e, &state.clock))
                .collect::<Vec<_>>(),
        }));
    }

    Ok(Json(json!({
        "time_of_day": time_of_day(now.hour()),
        "date": today,
        "dogs": per_dog,
    })))
}

/// List all events, most recent first
pub async fn list_events(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let events = state.events.list().await.map_err(internal)?;
    let response: Vec<EventResponse> = events
        .iter()
        .map(|e| EventResponse::from_detail(e, &state.clock))
        .collect();
    Ok(Json(response))
}

/// Create an event from a submission
pub async fn create_event(
    State(state): State<AppState>,
    Json(raw): Json<RawSubmission>,
) -> ApiResult<impl IntoResponse> {
    let new_event = state.builder.build(&raw).await?;
    let id = state.events.insert(&new_event).await.map_err(internal)?;
    let event = fetch_detail(&state, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventResponse::from_detail(&event, &state.clock)),
    ))
}

/// Get one event
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let event = fetch_detail(&state, id).await?;
    Ok(Json(EventResponse::from_detail(&event, &state.clock)))
}

/// Rebuild an event from a fresh submission and replace it
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(raw): Json<RawSubmission>,
) -> ApiResult<impl IntoResponse> {
    let new_event = state.builder.build(&raw).await?;
    let updated = state
        .events
        .update(id, &new_event)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(ApiError::NotFound(format!("event {} not found", id)));
    }
    let event = fetch_detail(&state, id).await?;
    Ok(Json(EventResponse::from_detail(&event, &state.clock)))
}

/// Delete an event
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let deleted = state.events.delete(id).await.map_err(internal)?;
    if deleted {
        Ok(Json(json!({"message": "Event deleted successfully"})))
    } else {
        Err(ApiError::NotFound(format!("event {} not found", id)))
    }
}

/// List all users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.users.get_all().await.map_err(internal)?;
    Ok(Json(users))
}

/// Create a user (administrative; events never create users)
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.create(&payload).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Get a user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let user = state
        .users
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound(format!("user {} not found", id)))?;
    Ok(Json(user))
}

/// List all dogs
pub async fn list_dogs(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let dogs = state.dogs.get_all().await.map_err(internal)?;
    Ok(Json(dogs))
}

/// Create a dog (administrative)
pub async fn create_dog(
    State(state): State<AppState>,
    Json(payload): Json<NewDog>,
) -> ApiResult<impl IntoResponse> {
    let dog = state.dogs.create(&payload).await.map_err(internal)?;
    Ok((StatusCode::CREATED, Json(dog)))
}

/// Get a dog by ID
pub async fn get_dog(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let dog = state
        .dogs
        .find_by_id(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound(format!("dog {} not found", id)))?;
    Ok(Json(dog))
}

/// List the event-kind catalog
pub async fn list_event_types(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let types = state.event_types.get_all().await.map_err(internal)?;
    Ok(Json(types))
}

/// Insert a new kind into the catalog
pub async fn create_event_type(
    State(state): State<AppState>,
    Json(payload): Json<NewEventType>,
) -> ApiResult<impl IntoResponse> {
    let event_type = state
        .event_types
        .create(&payload)
        .await
        .map_err(internal)?;
    Ok((StatusCode::CREATED, Json(event_type)))
}

/// Webhook endpoint for programmatic event creation
///
/// Accepts an arbitrary JSON payload and answers in the historical
/// compatibility shape: `{"success": "true", "event_id": N}` on success,
/// `{"success": "false", "error": msg}` on failure.
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> impl IntoResponse {
    let raw: RawSubmission = match serde_json::from_value(payload) {
        Ok(raw) => raw,
        Err(e) => return webhook_failure(format!("malformed payload: {}", e)),
    };

    let new_event = match state.builder.build(&raw).await {
        Ok(new_event) => new_event,
        Err(e) => return webhook_failure(e.to_string()),
    };

    match state.events.insert(&new_event).await {
        Ok(id) => (
            StatusCode::OK,
            Json(json!({"success": "true", "event_id": id})),
        ),
        Err(e) => {
            error!("webhook insert failed: {}", e);
            webhook_failure("store failure".to_string())
        }
    }
}

fn webhook_failure(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"success": "false", "error": message})),
    )
}

/// Start a walk: construct a WALK event and mark it active
pub async fn start_walk(
    State(state): State<AppState>,
    Json(mut raw): Json<RawSubmission>,
) -> ApiResult<impl IntoResponse> {
    if raw.event_type.is_none() {
        raw.event_type = Some(Token::from("WALK"));
    }

    let new_event = state.builder.build(&raw).await?;
    let id = state.events.insert(&new_event).await.map_err(internal)?;
    let event = fetch_detail(&state, id).await?;

    if let Err(e) = state.walks.begin_walk(&event).await {
        // The event is not kept when the start is rejected.
        if let Err(cleanup) = state.events.delete(id).await {
            error!("failed to remove rejected walk event {}: {}", id, cleanup);
        }
        return Err(e.into());
    }

    Ok((
        StatusCode::CREATED,
        Json(EventResponse::from_detail(&event, &state.clock)),
    ))
}

/// The walk in progress, if any
pub async fn current_walk(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    match state.walks.current_walk().await? {
        Some(event_id) => {
            let event = fetch_detail(&state, event_id).await?;
            Ok(Json(json!({
                "active": true,
                "event": EventResponse::from_detail(&event, &state.clock),
            })))
        }
        None => Ok(Json(json!({"active": false}))),
    }
}

/// Clear the walk in progress. Idempotent.
pub async fn stop_walk(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.walks.end_walk().await?;
    Ok(Json(json!({"active": false})))
}

async fn fetch_detail(state: &AppState, id: i64) -> ApiResult<EventDetail> {
    state
        .events
        .get_detail(id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound(format!("event {} not found", id)))
}
