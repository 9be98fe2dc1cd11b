//! Reminder scheduling: turning a task's due date/time and a lead-time
//! offset into an absolute UTC trigger instant.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Reminder, ReminderOffset, Task, UserPreferences};

/// Time used when a task has a due date but no due time.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}

/// The instant a task is due, in UTC. `None` when the task has no due date.
pub fn due_instant(task: &Task) -> Option<DateTime<Utc>> {
    let date = task.due_date?;
    let time = task.due_time.unwrap_or_else(end_of_day);
    Some(date.and_time(time).and_utc())
}

fn offset_minutes(offset: ReminderOffset, custom_minutes: Option<i64>) -> SchedulerResult<i64> {
    if let Some(minutes) = offset.minutes() {
        return Ok(minutes);
    }
    match custom_minutes {
        None => Err(SchedulerError::validation(
            "custom_minutes",
            "custom_minutes is required for a custom offset",
        )),
        Some(minutes) if minutes < 0 => Err(SchedulerError::validation(
            "custom_minutes",
            format!("custom_minutes must be >= 0, got {minutes}"),
        )),
        Some(minutes) => Ok(minutes),
    }
}

/// `due` moved back by `minutes`. Lead times too large for chrono's range
/// are rejected rather than overflowing.
fn trigger_before(due: DateTime<Utc>, minutes: i64) -> SchedulerResult<DateTime<Utc>> {
    TimeDelta::try_minutes(minutes)
        .and_then(|lead| due.checked_sub_signed(lead))
        .ok_or_else(|| {
            SchedulerError::validation(
                "custom_minutes",
                format!("custom_minutes is out of range, got {minutes}"),
            )
        })
}

fn build_reminder(
    due: DateTime<Utc>,
    offset: ReminderOffset,
    custom_minutes: Option<i64>,
) -> SchedulerResult<Reminder> {
    let minutes = offset_minutes(offset, custom_minutes)?;
    Ok(Reminder {
        id: Uuid::new_v4(),
        offset,
        custom_minutes: if offset == ReminderOffset::Custom { custom_minutes } else { None },
        trigger_time: trigger_before(due, minutes)?,
        shown: false,
    })
}

/// Attach a new reminder to `task` and return a copy of it.
///
/// Fails with a validation error when the task has no due date, or when a
/// custom offset is missing its (non-negative, in-range) minute count.
pub fn add_reminder(
    task: &mut Task,
    offset: ReminderOffset,
    custom_minutes: Option<i64>,
) -> SchedulerResult<Reminder> {
    let Some(due) = due_instant(task) else {
        return Err(SchedulerError::validation(
            "due_date",
            "cannot add a reminder to a task without a due date",
        ));
    };

    let reminder = build_reminder(due, offset, custom_minutes)?;
    task.reminders.push(reminder.clone());
    Ok(reminder)
}

pub fn remove_reminder(task: &mut Task, reminder_id: Uuid) -> bool {
    let before = task.reminders.len();
    task.reminders.retain(|r| r.id != reminder_id);
    task.reminders.len() != before
}

/// Re-derive every reminder's trigger time from the task's current due
/// instant.
///
/// A reminder whose new trigger lies in the future becomes pending again
/// (`shown = false`); one whose trigger is still in the past keeps its
/// acknowledgement state. Without a due date reminders have no anchor and
/// are dropped, as is any reminder whose lead time no longer fits.
pub fn recalculate_reminders(task: &mut Task, now: DateTime<Utc>) {
    let Some(due) = due_instant(task) else {
        if !task.reminders.is_empty() {
            log::debug!("Dropping {} reminder(s) of undated task {}", task.reminders.len(), task.id);
            task.reminders.clear();
        }
        return;
    };

    let task_id = task.id;
    task.reminders.retain_mut(|reminder| {
        let minutes = reminder.offset_minutes();
        let Ok(trigger_time) = trigger_before(due, minutes) else {
            log::warn!(
                "Dropping reminder {} of task {}: lead time of {minutes} minutes is out of range",
                reminder.id,
                task_id
            );
            return false;
        };
        reminder.trigger_time = trigger_time;
        if reminder.trigger_time > now {
            reminder.shown = false;
        }
        log::debug!("Reminder {} of task {} now triggers at {}", reminder.id, task_id, reminder.trigger_time);
        true
    });
}

/// Rebuild `reminders` from scratch against `task`'s due instant: same
/// offsets, fresh ids, nothing shown yet. Used when a series spawns a new
/// instance.
pub fn rebuild_reminders(task: &Task, reminders: &[Reminder]) -> Vec<Reminder> {
    let Some(due) = due_instant(task) else {
        return Vec::new();
    };
    reminders
        .iter()
        .filter_map(|r| build_reminder(due, r.offset, r.custom_minutes).ok())
        .collect()
}

/// Give a newly created task the user's default reminder, if it has a due
/// date and no reminders of its own yet.
pub fn apply_default_reminder(task: &mut Task, preferences: &UserPreferences) -> SchedulerResult<()> {
    let Some(offset) = preferences.default_reminder else {
        return Ok(());
    };
    if task.due_date.is_none() || !task.reminders.is_empty() {
        return Ok(());
    }
    if offset == ReminderOffset::Custom {
        // No minute count is stored alongside the preference
        log::warn!("Ignoring custom default reminder for task {}: only named offsets apply", task.id);
        return Ok(());
    }
    add_reminder(task, offset, None)?;
    Ok(())
}
