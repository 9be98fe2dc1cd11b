//! Recurring-task and reminder scheduling core of a local-first task
//! manager, plus the thin HTTP and JSON-file plumbing around it.

pub mod clock;      // Injected "now"
pub mod config;     // Environment configuration
pub mod error;      // Scheduler error type
pub mod models;     // Data structures (Task, RecurrencePattern, Reminder, ...)
pub mod recurrence; // Next-occurrence date arithmetic
pub mod reminder_check; // Due-reminder detection
pub mod reminders;  // Reminder trigger computation
pub mod routes_series; // HTTP handlers for series, due reminders, previews
pub mod routes_tasks;  // HTTP handlers for tasks, reminders, preferences
pub mod series;     // Series index and lifecycle
pub mod store;      // Persistent storage (JSON file / in-memory)
