// --------------------------------------------------
// Handles API endpoints that act on a whole series, plus
// reminder checks and recurrence previews.
//
// Responsibilities:
// - List series and read one series' instances
// - Update / delete / stop a series, scoped by query flags
// - Report due reminders and acknowledge them
// - Preview the dates a pattern would produce
// -------------------------------------------------

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::models::RecurrencePattern;
use crate::recurrence;
use crate::reminder_check::ReminderCheckService;
use crate::routes_tasks::{checked, due_reminders, error_response, parse_id, AppState};
use crate::series::{SeriesManager, SeriesScope, SeriesUpdate};

#[derive(Debug, Deserialize)]
pub struct ScopeQuery {
    pub future_only: Option<bool>,
    pub all_instances: Option<bool>,
}

impl ScopeQuery {
    fn scope(&self) -> Result<SeriesScope, SchedulerError> {
        SeriesScope::from_flags(
            self.future_only.unwrap_or(false),
            self.all_instances.unwrap_or(false),
        )
    }
}

#[derive(Debug, Serialize)]
struct CountResponse {
    series_id: String,
    count: usize,
}

// -----------------------------
// GET /api/series
// Summaries of every series, by title
// -----------------------------
pub async fn list_series(State(state): State<AppState>) -> impl IntoResponse {
    match SeriesManager::new(state.store.as_ref()).summaries() {
        Ok(summaries) => Json(summaries).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// GET /api/series/:series_id
// Instances ordered by due date (undated last)
// -----------------------------
pub async fn get_series(State(state): State<AppState>, Path(series_id): Path<String>) -> impl IntoResponse {
    match SeriesManager::new(state.store.as_ref()).get_series_tasks(&series_id) {
        Ok(tasks) => Json(tasks).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// PUT /api/series/:series_id?future_only=true
// Edits the selected instances; completed ones are left alone
// -----------------------------
pub async fn update_series(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
    Query(q): Query<ScopeQuery>,
    Json(updates): Json<SeriesUpdate>,
) -> impl IntoResponse {
    let scope = match q.scope() {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };

    match SeriesManager::new(state.store.as_ref()).update_series(&series_id, &updates, scope, state.now()) {
        Ok(count) => checked(&state, CountResponse { series_id, count }),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// DELETE /api/series/:series_id?future_only=true
// -----------------------------
pub async fn delete_series(
    State(state): State<AppState>,
    Path(series_id): Path<String>,
    Query(q): Query<ScopeQuery>,
) -> impl IntoResponse {
    let scope = match q.scope() {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };

    match SeriesManager::new(state.store.as_ref()).delete_series(&series_id, scope, state.now()) {
        Ok(count) => checked(&state, CountResponse { series_id, count }),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/series/:series_id/stop
// Open instances stay, but no further instance is spawned
// -----------------------------
pub async fn stop_series(State(state): State<AppState>, Path(series_id): Path<String>) -> impl IntoResponse {
    match SeriesManager::new(state.store.as_ref()).stop_series(&series_id) {
        Ok(count) => checked(&state, CountResponse { series_id, count }),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// GET /api/reminders/due
// -----------------------------
pub async fn get_due_reminders(State(state): State<AppState>) -> impl IntoResponse {
    match due_reminders(&state) {
        Ok(due) => Json(due).into_response(),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/reminders/:reminder_id/shown
// -----------------------------
pub async fn mark_reminder_shown(
    State(state): State<AppState>,
    Path(reminder_id): Path<String>,
) -> impl IntoResponse {
    let reminder_id = match parse_id(&reminder_id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match ReminderCheckService::new(state.store.as_ref()).mark_as_shown(reminder_id) {
        Ok(true) => Json(serde_json::json!({ "ok": true })).into_response(),
        Ok(false) => error_response(SchedulerError::NotFound("reminder")),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PreviewInput {
    pub pattern: RecurrencePattern,
    pub base_date: NaiveDate,
    pub count: Option<usize>,
}

// -----------------------------
// POST /api/recurrence/preview
// Lists the next dates a pattern would produce, without touching any task
// -----------------------------
pub async fn preview_recurrence(Json(input): Json<PreviewInput>) -> impl IntoResponse {
    if let Err(e) = input.pattern.validate() {
        return error_response(e);
    }
    let count = input.count.unwrap_or(5).min(100);
    Json(recurrence::upcoming_dates(&input.pattern, input.base_date, count)).into_response()
}
