//! Pull-model reminder delivery.
//!
//! There is no background timer. Callers run a check at well-defined points
//! (process start, after each mutating action, on request) and display what
//! comes back. A reminder that became due while nothing was checking is
//! reported late on the next check, never lost.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Reminder, Task};
use crate::store::TaskStore;

/// A due, not yet acknowledged reminder together with its task.
#[derive(Debug, Clone, Serialize)]
pub struct DueReminder {
    pub reminder: Reminder,
    pub task_id: Uuid,
    pub task_title: String,
    pub due_date: Option<chrono::NaiveDate>,
}

/// Reminders with `shown == false` and `trigger_time <= now`, most overdue
/// first. Ties keep collection order.
pub fn check_due_reminders<'a>(tasks: &'a [Task], now: DateTime<Utc>) -> Vec<(&'a Reminder, &'a Task)> {
    let mut due: Vec<(&Reminder, &Task)> = tasks
        .iter()
        .flat_map(|t| t.reminders.iter().map(move |r| (r, t)))
        .filter(|(r, _)| !r.shown && r.trigger_time <= now)
        .collect();

    due.sort_by_key(|(r, _)| r.trigger_time);
    due
}

/// Flag one reminder as shown. Returns the owning task when the reminder
/// exists.
pub fn mark_reminder_shown(tasks: &mut [Task], reminder_id: Uuid) -> Option<&Task> {
    let task = tasks
        .iter_mut()
        .find(|t| t.reminders.iter().any(|r| r.id == reminder_id))?;
    for reminder in task.reminders.iter_mut().filter(|r| r.id == reminder_id) {
        reminder.shown = true;
    }
    Some(task)
}

pub struct ReminderCheckService<'a, S: TaskStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TaskStore + ?Sized> ReminderCheckService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn check_due_reminders(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<DueReminder>> {
        let tasks = self.store.get_all()?;
        let due = check_due_reminders(&tasks, now)
            .into_iter()
            .map(|(reminder, task)| DueReminder {
                reminder: reminder.clone(),
                task_id: task.id,
                task_title: task.title.clone(),
                due_date: task.due_date,
            })
            .collect();
        Ok(due)
    }

    /// Acknowledge a reminder so later checks stop reporting it.
    pub fn mark_as_shown(&self, reminder_id: Uuid) -> SchedulerResult<bool> {
        self.store
            .update_tasks(|tasks| Ok::<_, SchedulerError>(mark_reminder_shown(tasks, reminder_id).is_some()))
    }
}
