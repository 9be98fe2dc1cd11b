// Import axum routing utilities and Router
use axum::{
    routing::{delete, get, post, put}, // HTTP method helpers
    Router, // Main router type
};
use std::sync::Arc;
use tower_http::services::ServeDir; // Used to serve static files (HTML/CSS/JS)

use recurring_scheduler::{
    clock::SystemClock,
    config::Config,
    reminder_check::ReminderCheckService,
    routes_series, routes_tasks,
    routes_tasks::AppState,
    store::{JsonStore, PreferencesStore},
};

// Start-of-process check point: report reminders that fell due while the
// app was not running
fn startup_reminder_check(state: &AppState) {
    match state.store.get_preferences() {
        Ok(p) if !p.notifications_enabled => return,
        Ok(_) => {}
        Err(e) => {
            log::warn!("Could not read preferences: {e}");
            return;
        }
    }

    match ReminderCheckService::new(state.store.as_ref()).check_due_reminders(state.now()) {
        Ok(due) if due.is_empty() => log::info!("No reminders due"),
        Ok(due) => {
            for d in &due {
                log::info!(
                    "Reminder due: {} (triggered {})",
                    d.task_title,
                    d.reminder.trigger_time.to_rfc3339()
                );
            }
        }
        Err(e) => log::warn!("Startup reminder check failed: {e}"),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState {
        store: Arc::new(JsonStore::new(&config.data_path)),
        clock: Arc::new(SystemClock),
    };
    log::info!("Using database at {}", state.store.path().display());

    startup_reminder_check(&state);

    let api = Router::new()
        // tasks
        .route("/tasks", get(routes_tasks::get_tasks).post(routes_tasks::create_task))
        .route("/tasks/:id", put(routes_tasks::update_task).delete(routes_tasks::delete_task))
        .route("/tasks/:id/complete", post(routes_tasks::complete_task))
        .route("/tasks/:id/reopen", post(routes_tasks::reopen_task))
        .route("/tasks/:id/reminders", post(routes_tasks::add_reminder))
        .route("/tasks/:id/reminders/:reminder_id", delete(routes_tasks::remove_reminder))
        // series
        .route("/series", get(routes_series::list_series))
        .route(
            "/series/:series_id",
            get(routes_series::get_series)
                .put(routes_series::update_series)
                .delete(routes_series::delete_series),
        )
        .route("/series/:series_id/stop", post(routes_series::stop_series))
        // reminders
        .route("/reminders/due", get(routes_series::get_due_reminders))
        .route("/reminders/:reminder_id/shown", post(routes_series::mark_reminder_shown))
        .route("/recurrence/preview", post(routes_series::preview_recurrence))
        // preferences
        .route(
            "/preferences",
            get(routes_tasks::get_preferences).put(routes_tasks::put_preferences),
        )
        .with_state(state);

    let app = Router::new()
        .nest("/api", api)
        .nest_service("/", ServeDir::new(&config.static_dir));

    log::info!("Server running at http://{}", config.addr());
    log::info!("API base:       http://{}/api", config.addr());

    let listener = match tokio::net::TcpListener::bind(config.addr()).await {
        Ok(l) => l,
        Err(e) => {
            log::error!("Failed to bind {}: {e}", config.addr());
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {e}");
    }
}
