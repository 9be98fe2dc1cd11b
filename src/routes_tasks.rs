// --------------------------------------------------
// Handles API endpoints for single tasks, their reminders,
// and user preferences.
//
// Responsibilities:
// - Create / read / update / delete tasks
// - Complete a task (spawning the next instance of its series)
// - Add / remove reminders on a task
// - Get / update user preferences
// -------------------------------------------------

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::SchedulerError;
use crate::models::{RecurrencePattern, ReminderOffset, Task, TaskStatus, UserPreferences};
use crate::reminder_check::{DueReminder, ReminderCheckService};
use crate::reminders;
use crate::series::{self, SeriesManager};
use crate::store::{JsonStore, PreferencesStore, TaskStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JsonStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub(crate) fn error_response(err: SchedulerError) -> Response {
    let status = match &err {
        SchedulerError::Validation { .. } => StatusCode::BAD_REQUEST,
        SchedulerError::InvalidOperation(_) => StatusCode::CONFLICT,
        SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
        SchedulerError::Storage(e) => {
            log::warn!("Storage failure: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

pub(crate) fn parse_id(id: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(id).map_err(|_| (StatusCode::BAD_REQUEST, "invalid id").into_response())
}

fn parse_date(value: Option<&str>) -> Result<Option<NaiveDate>, Response> {
    value
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid due_date").into_response())
}

// Accepts "HH:MM" and "HH:MM:SS"
fn parse_time(value: Option<&str>) -> Result<Option<NaiveTime>, Response> {
    value
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M").or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        })
        .transpose()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid due_time").into_response())
}

/// Body of every mutating response: the result plus whatever reminders are
/// due right after the change.
#[derive(Debug, Serialize)]
pub struct Checked<T: Serialize> {
    pub result: T,
    pub due_reminders: Vec<DueReminder>,
}

/// Run a reminder check, honouring the user's notification switch.
pub(crate) fn due_reminders(state: &AppState) -> Result<Vec<DueReminder>, SchedulerError> {
    let preferences = state.store.get_preferences()?;
    if !preferences.notifications_enabled {
        return Ok(Vec::new());
    }
    ReminderCheckService::new(state.store.as_ref()).check_due_reminders(state.now())
}

pub(crate) fn checked<T: Serialize>(state: &AppState, result: T) -> Response {
    match due_reminders(state) {
        Ok(due_reminders) => Json(Checked { result, due_reminders }).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TasksQuery {
    pub include_done: Option<bool>,
}

// -----------------------------
// GET /api/tasks
// Returns tasks ordered by due date (undated last)
// -----------------------------
pub async fn get_tasks(State(state): State<AppState>, Query(q): Query<TasksQuery>) -> impl IntoResponse {
    let mut tasks = match state.store.get_all() {
        Ok(tasks) => tasks,
        Err(e) => return error_response(e.into()),
    };

    if !q.include_done.unwrap_or(true) {
        tasks.retain(|t| !t.is_complete());
    }
    tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date, t.due_time));

    Json(tasks).into_response()
}

#[derive(Debug, Deserialize)]
pub struct ReminderInput {
    pub offset: ReminderOffset,
    pub custom_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<i64>, // 1..=5, default 3
    #[serde(default)]
    pub categories: Vec<String>,
    pub due_date: Option<String>, // "YYYY-MM-DD"
    pub due_time: Option<String>, // "HH:MM"
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default)]
    pub reminders: Vec<ReminderInput>,
}

// -----------------------------
// POST /api/tasks
// Creates a task; recurring tasks start a new series
// -----------------------------
pub async fn create_task(State(state): State<AppState>, Json(input): Json<TaskInput>) -> impl IntoResponse {
    let due_date = match parse_date(input.due_date.as_deref()) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let due_time = match parse_time(input.due_time.as_deref()) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    let mut task = Task::new(input.title, state.now());
    task.description = input.description;
    task.priority = input.priority.unwrap_or(3);
    task.categories = input.categories;
    task.due_date = due_date;
    task.due_time = due_time;
    task.recurrence = input.recurrence;

    if let Err(e) = task.validate() {
        return error_response(e);
    }
    series::start_series(&mut task);

    for r in &input.reminders {
        if let Err(e) = reminders::add_reminder(&mut task, r.offset, r.custom_minutes) {
            return error_response(e);
        }
    }

    let preferences = match state.store.get_preferences() {
        Ok(p) => p,
        Err(e) => return error_response(e.into()),
    };
    if let Err(e) = reminders::apply_default_reminder(&mut task, &preferences) {
        return error_response(e);
    }

    if let Err(e) = state.store.save(&task) {
        return error_response(e.into());
    }
    log::info!("Created task {} ({})", task.id, task.title);

    checked(&state, task)
}

// -----------------------------
// PUT /api/tasks/:id
// Edits this instance only; reminders follow the new due date/time
// ----------------------------
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<TaskInput>,
) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    let due_date = match parse_date(input.due_date.as_deref()) {
        Ok(d) => d,
        Err(resp) => return resp,
    };
    let due_time = match parse_time(input.due_time.as_deref()) {
        Ok(t) => t,
        Err(resp) => return resp,
    };

    let mut task = match state.store.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(SchedulerError::NotFound("task")),
        Err(e) => return error_response(e.into()),
    };

    task.title = input.title;
    task.description = input.description;
    task.priority = input.priority.unwrap_or(task.priority);
    task.categories = input.categories;
    task.recurrence = input.recurrence;

    let due_changed = task.due_date != due_date || task.due_time != due_time;
    task.due_date = due_date;
    task.due_time = due_time;

    if let Err(e) = task.validate() {
        return error_response(e);
    }
    series::start_series(&mut task);

    // Due change and reminder recalculation go out in the same save
    if due_changed {
        reminders::recalculate_reminders(&mut task, state.now());
    }

    if let Err(e) = state.store.save(&task) {
        return error_response(e.into());
    }

    checked(&state, task)
}

// -----------------------------
// DELETE /api/tasks/:id
// Removes one task; the rest of its series is untouched
// -----------------------------
pub async fn delete_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match state.store.delete(id) {
        Ok(true) => checked(&state, serde_json::json!({ "ok": true })),
        Ok(false) => error_response(SchedulerError::NotFound("task")),
        Err(e) => error_response(e.into()),
    }
}

// -----------------------------
// POST /api/tasks/:id/complete
// Marks a task done and spawns the next instance of its series
// -----------------------------
pub async fn complete_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    match SeriesManager::new(state.store.as_ref()).complete_task(id, state.now()) {
        Ok(completion) => checked(&state, completion),
        Err(e) => error_response(e),
    }
}

// -----------------------------
// POST /api/tasks/:id/reopen
// Sets a completed task back to todo
// -----------------------------
pub async fn reopen_task(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let mut task = match state.store.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(SchedulerError::NotFound("task")),
        Err(e) => return error_response(e.into()),
    };

    task.status = TaskStatus::Todo;
    task.completed_at = None;

    if let Err(e) = state.store.save(&task) {
        return error_response(e.into());
    }

    checked(&state, task)
}

// -----------------------------
// POST /api/tasks/:id/reminders
// -----------------------------
pub async fn add_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ReminderInput>,
) -> impl IntoResponse {
    let id = match parse_id(&id) {
        Ok(u) => u,
        Err(resp) => return resp,
    };

    let mut task = match state.store.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(SchedulerError::NotFound("task")),
        Err(e) => return error_response(e.into()),
    };

    let reminder = match reminders::add_reminder(&mut task, input.offset, input.custom_minutes) {
        Ok(r) => r,
        Err(e) => return error_response(e),
    };

    if let Err(e) = state.store.save(&task) {
        return error_response(e.into());
    }

    checked(&state, reminder)
}

// -----------------------------
// DELETE /api/tasks/:id/reminders/:reminder_id
// -----------------------------
pub async fn remove_reminder(
    State(state): State<AppState>,
    Path((id, reminder_id)): Path<(String, String)>,
) -> impl IntoResponse {
    let (id, reminder_id) = match (parse_id(&id), parse_id(&reminder_id)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(resp), _) | (_, Err(resp)) => return resp,
    };

    let mut task = match state.store.get(id) {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(SchedulerError::NotFound("task")),
        Err(e) => return error_response(e.into()),
    };

    if !reminders::remove_reminder(&mut task, reminder_id) {
        return error_response(SchedulerError::NotFound("reminder"));
    }

    if let Err(e) = state.store.save(&task) {
        return error_response(e.into());
    }

    checked(&state, task)
}

// -----------------------------
// GET /api/preferences
// -----------------------------
pub async fn get_preferences(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.get_preferences() {
        Ok(p) => Json(p).into_response(),
        Err(e) => error_response(e.into()),
    }
}

// -----------------------------
// PUT /api/preferences
// -----------------------------
pub async fn put_preferences(
    State(state): State<AppState>,
    Json(preferences): Json<UserPreferences>,
) -> impl IntoResponse {
    if preferences.default_reminder == Some(ReminderOffset::Custom) {
        return error_response(SchedulerError::validation(
            "default_reminder",
            "default_reminder must be a named offset, got custom",
        ));
    }

    if let Err(e) = state.store.save_preferences(&preferences) {
        return error_response(e.into());
    }

    Json(preferences).into_response()
}
