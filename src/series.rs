//! Series lifecycle.
//!
//! A series is never stored. It is the set of tasks that share a
//! `series_id`, rebuilt on demand from the task collection by
//! [`SeriesIndex`]. Deleting one task independently therefore can't leave a
//! dangling reference behind.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SchedulerError, SchedulerResult};
use crate::models::{Frequency, RecurrencePattern, Task, TaskStatus};
use crate::recurrence::calculate_next_date;
use crate::reminders::{rebuild_reminders, recalculate_reminders};
use crate::store::TaskStore;

// -----------------------------
// Index
// -----------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub series_id: String,
    pub title: String,
    pub instances: usize,
    pub completed: usize,
    pub next_due: Option<NaiveDate>, // earliest incomplete instance
    pub active: bool,                // an incomplete instance still recurs
}

/// Series id -> member tasks, built from a task slice.
pub struct SeriesIndex<'a> {
    by_series: HashMap<&'a str, Vec<&'a Task>>,
}

impl<'a> SeriesIndex<'a> {
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut by_series: HashMap<&str, Vec<&Task>> = HashMap::new();
        for task in tasks {
            if let Some(id) = task.series_id.as_deref() {
                by_series.entry(id).or_default().push(task);
            }
        }
        for members in by_series.values_mut() {
            sort_by_due_date(members);
        }
        Self { by_series }
    }

    /// Members ordered by due date, undated instances last.
    pub fn tasks(&self, series_id: &str) -> &[&'a Task] {
        self.by_series.get(series_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn summaries(&self) -> Vec<SeriesSummary> {
        let mut out: Vec<SeriesSummary> = self
            .by_series
            .iter()
            .map(|(id, members)| {
                let pending: Vec<&&Task> = members.iter().filter(|t| !t.is_complete()).collect();
                SeriesSummary {
                    series_id: id.to_string(),
                    title: members.last().map(|t| t.title.clone()).unwrap_or_default(),
                    instances: members.len(),
                    completed: members.len() - pending.len(),
                    next_due: pending.iter().filter_map(|t| t.due_date).min(),
                    active: pending.iter().any(|t| t.is_recurring()),
                }
            })
            .collect();
        out.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        out
    }
}

fn sort_by_due_date(tasks: &mut [&Task]) {
    // None sorts after every date
    tasks.sort_by_key(|t| (t.due_date.is_none(), t.due_date));
}

// -----------------------------
// Scope & updates
// -----------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesScope {
    /// Every instance (bulk edits still skip completed ones).
    All,
    /// Incomplete instances due today or later.
    FutureOnly,
}

impl SeriesScope {
    pub fn from_flags(future_only: bool, all_instances: bool) -> SchedulerResult<Self> {
        match (future_only, all_instances) {
            (true, true) => Err(SchedulerError::invalid_operation(
                "future_only and all_instances cannot both be set",
            )),
            (true, false) => Ok(SeriesScope::FutureOnly),
            (false, _) => Ok(SeriesScope::All),
        }
    }

    fn includes(&self, task: &Task, today: NaiveDate) -> bool {
        match self {
            SeriesScope::All => true,
            SeriesScope::FutureOnly => {
                !task.is_complete() && task.due_date.is_some_and(|d| d >= today)
            }
        }
    }
}

/// Fields that can be changed across a whole series.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<i64>,
    pub categories: Option<Vec<String>>,
    pub due_time: Option<NaiveTime>,
    pub recurrence: Option<RecurrencePattern>,
}

impl SeriesUpdate {
    pub fn validate(&self) -> SchedulerResult<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(SchedulerError::validation("title", "title is required"));
            }
        }
        if let Some(priority) = self.priority {
            if !(1..=5).contains(&priority) {
                return Err(SchedulerError::validation(
                    "priority",
                    format!("priority must be between 1 and 5, got {priority}"),
                ));
            }
        }
        if let Some(pattern) = &self.recurrence {
            pattern.validate()?;
        }
        Ok(())
    }

    fn apply(&self, task: &mut Task, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(categories) = &self.categories {
            task.categories = categories.clone();
        }
        if let Some(pattern) = &self.recurrence {
            task.recurrence = Some(anchor_monthly(pattern.clone(), task.due_date));
        }
        if let Some(due_time) = self.due_time {
            task.due_time = Some(due_time);
            recalculate_reminders(task, now);
        }
    }
}

// -----------------------------
// Pure series operations
// -----------------------------

// A monthly pattern without a day tracks the first instance's day for the
// whole series, so clamped months don't drift it
fn anchor_monthly(mut pattern: RecurrencePattern, due_date: Option<NaiveDate>) -> RecurrencePattern {
    if pattern.frequency == Frequency::Monthly && pattern.day_of_month.is_none() {
        pattern.day_of_month = due_date.map(|d| d.day());
    }
    pattern
}

/// Give a recurring task its series id (if it has none yet) and pin a
/// monthly pattern to its first due day. Returns the series id.
pub fn start_series(task: &mut Task) -> Option<String> {
    let pattern = task.recurrence.take()?;
    task.recurrence = Some(anchor_monthly(pattern, task.due_date));

    let id = task
        .series_id
        .get_or_insert_with(|| Uuid::new_v4().to_string())
        .clone();
    log::info!("Task {} belongs to series {}", task.id, id);
    Some(id)
}

/// Build the instance that follows `completed` in its series.
///
/// `Ok(None)` means the pattern has ended and `completed` stays the last
/// instance. Fails when `completed` is not done or does not recur.
pub fn create_next_instance(completed: &Task, now: DateTime<Utc>) -> SchedulerResult<Option<Task>> {
    if !completed.is_complete() {
        return Err(SchedulerError::invalid_operation(format!(
            "task {} is not complete",
            completed.id
        )));
    }
    let Some(pattern) = &completed.recurrence else {
        return Err(SchedulerError::invalid_operation(format!(
            "task {} is not recurring",
            completed.id
        )));
    };

    let base_date = completed.due_date.unwrap_or_else(|| now.date_naive());
    let Some(next_date) = calculate_next_date(pattern, base_date) else {
        log::info!(
            "Series {} ended after task {}",
            completed.series_id.as_deref().unwrap_or("-"),
            completed.id
        );
        return Ok(None);
    };

    let mut next = Task {
        id: Uuid::new_v4(),
        title: completed.title.clone(),
        description: completed.description.clone(),
        priority: completed.priority,
        categories: completed.categories.clone(),
        status: TaskStatus::Todo,
        created_at: now,
        completed_at: None,
        due_date: Some(next_date),
        due_time: completed.due_time,
        recurrence: Some(anchor_monthly(pattern.clone(), Some(base_date))),
        series_id: completed.series_id.clone(),
        reminders: Vec::new(),
    };
    if next.series_id.is_none() {
        start_series(&mut next);
    }
    next.reminders = rebuild_reminders(&next, &completed.reminders);

    Ok(Some(next))
}

// -----------------------------
// Store-backed manager
// -----------------------------

/// Result of completing a task: the task itself and its successor, if the
/// series continues.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub completed: Task,
    pub next: Option<Task>,
}

pub struct SeriesManager<'a, S: TaskStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TaskStore + ?Sized> SeriesManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn get_series_tasks(&self, series_id: &str) -> SchedulerResult<Vec<Task>> {
        let tasks = self.store.get_all()?;
        let index = SeriesIndex::build(&tasks);
        Ok(index.tasks(series_id).iter().map(|t| (*t).clone()).collect())
    }

    pub fn summaries(&self) -> SchedulerResult<Vec<SeriesSummary>> {
        let tasks = self.store.get_all()?;
        Ok(SeriesIndex::build(&tasks).summaries())
    }

    /// Mark a task done and, if it recurs, spawn its successor. Both are
    /// persisted in a single locked write, so two concurrent completions of
    /// the same task cannot both succeed.
    pub fn complete_task(&self, task_id: Uuid, now: DateTime<Utc>) -> SchedulerResult<Completion> {
        let completion = self.store.update_tasks(|tasks| complete_in(tasks, task_id, now))?;

        if let Some(n) = &completion.next {
            log::info!(
                "Series {} extended with task {} due {:?}",
                n.series_id.as_deref().unwrap_or("-"),
                n.id,
                n.due_date
            );
        }
        Ok(completion)
    }

    /// Apply `updates` to the series members selected by `scope`. Completed
    /// instances are never modified. Unknown series ids update nothing.
    pub fn update_series(
        &self,
        series_id: &str,
        updates: &SeriesUpdate,
        scope: SeriesScope,
        now: DateTime<Utc>,
    ) -> SchedulerResult<usize> {
        updates.validate()?;

        let today = now.date_naive();
        let changed = self.store.update_tasks(|tasks| {
            let mut changed = 0;
            for task in tasks
                .iter_mut()
                .filter(|t| in_series(t, series_id) && !t.is_complete() && scope.includes(t, today))
            {
                updates.apply(task, now);
                changed += 1;
            }
            Ok::<_, SchedulerError>(changed)
        })?;

        log::info!("Updated {changed} task(s) in series {series_id} ({scope:?})");
        Ok(changed)
    }

    /// Delete the series members selected by `scope`.
    pub fn delete_series(&self, series_id: &str, scope: SeriesScope, now: DateTime<Utc>) -> SchedulerResult<usize> {
        let today = now.date_naive();
        let deleted = self.store.update_tasks(|tasks| {
            let before = tasks.len();
            tasks.retain(|t| !(in_series(t, series_id) && scope.includes(t, today)));
            Ok::<_, SchedulerError>(before - tasks.len())
        })?;

        if deleted > 0 {
            log::info!("Deleted {deleted} task(s) from series {series_id} ({scope:?})");
        }
        Ok(deleted)
    }

    /// End a series: incomplete instances keep existing but no longer recur.
    pub fn stop_series(&self, series_id: &str) -> SchedulerResult<usize> {
        let stopped = self.store.update_tasks(|tasks| {
            let mut stopped = 0;
            for task in tasks
                .iter_mut()
                .filter(|t| in_series(t, series_id) && !t.is_complete() && t.is_recurring())
            {
                task.recurrence = None;
                stopped += 1;
            }
            Ok::<_, SchedulerError>(stopped)
        })?;

        if stopped > 0 {
            log::info!("Stopped recurrence of series {series_id}");
        }
        Ok(stopped)
    }
}

fn in_series(task: &Task, series_id: &str) -> bool {
    task.series_id.as_deref() == Some(series_id)
}

// Completion against the loaded collection; runs inside the store lock
fn complete_in(tasks: &mut Vec<Task>, task_id: Uuid, now: DateTime<Utc>) -> SchedulerResult<Completion> {
    let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
        return Err(SchedulerError::NotFound("task"));
    };
    if task.is_complete() {
        return Err(SchedulerError::invalid_operation(format!(
            "task {task_id} is already complete"
        )));
    }

    task.status = TaskStatus::Done;
    task.completed_at = Some(now);
    let completed = task.clone();

    let mut next = if completed.is_recurring() {
        create_next_instance(&completed, now)?
    } else {
        None
    };

    // Re-completing a reopened instance must not spawn a second successor
    if let (Some(candidate), Some(series_id)) = (&next, completed.series_id.as_deref()) {
        let exists = tasks
            .iter()
            .any(|t| t.id != completed.id && in_series(t, series_id) && t.due_date == candidate.due_date);
        if exists {
            log::debug!("Series {series_id} already has an instance on {:?}", candidate.due_date);
            next = None;
        }
    }

    if let Some(n) = &next {
        tasks.push(n.clone());
    }
    Ok(Completion { completed, next })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReminderOffset;
    use crate::reminders::{add_reminder, due_instant};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn utc(y: i32, mo: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, 8, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recurring(title: &str, due: NaiveDate, pattern: RecurrencePattern) -> Task {
        let mut task = Task::new(title, utc(2025, 1, 1));
        task.due_date = Some(due);
        task.due_time = NaiveTime::from_hms_opt(9, 30, 0);
        task.recurrence = Some(pattern);
        start_series(&mut task);
        task
    }

    fn member(series: &Task, due: Option<NaiveDate>, status: TaskStatus) -> Task {
        let mut task = series.clone();
        task.id = Uuid::new_v4();
        task.due_date = due;
        task.status = status;
        task
    }

    #[test]
    fn test_start_series_assigns_id_once() {
        let mut task = recurring("Gym", date(2025, 3, 3), RecurrencePattern::new(Frequency::Daily, 1));
        let id = task.series_id.clone().unwrap();
        assert_eq!(start_series(&mut task), Some(id));

        let mut plain = Task::new("Once", utc(2025, 1, 1));
        assert_eq!(start_series(&mut plain), None);
        assert!(plain.series_id.is_none());
    }

    #[test]
    fn test_start_series_anchors_monthly_day() {
        let task = recurring("Rent", date(2025, 1, 31), RecurrencePattern::new(Frequency::Monthly, 1));
        assert_eq!(task.recurrence.unwrap().day_of_month, Some(31));
    }

    #[test]
    fn test_next_instance_copies_fields_and_rebuilds_reminders() {
        let mut task = recurring("Standup", date(2025, 12, 15), RecurrencePattern::new(Frequency::Daily, 1));
        task.categories = vec!["work".to_string()];
        task.priority = 4;
        add_reminder(&mut task, ReminderOffset::FifteenMinutes, None).unwrap();
        task.reminders[0].shown = true;
        task.status = TaskStatus::Done;

        let now = utc(2025, 12, 15);
        let next = create_next_instance(&task, now).unwrap().unwrap();

        assert_ne!(next.id, task.id);
        assert_eq!(next.series_id, task.series_id);
        assert_eq!(next.title, "Standup");
        assert_eq!(next.priority, 4);
        assert_eq!(next.categories, vec!["work".to_string()]);
        assert_eq!(next.status, TaskStatus::Todo);
        assert_eq!(next.created_at, now);
        assert_eq!(next.due_date, Some(date(2025, 12, 16)));
        assert_eq!(next.due_time, task.due_time);

        assert_eq!(next.reminders.len(), 1);
        let reminder = &next.reminders[0];
        assert!(!reminder.shown);
        assert_ne!(reminder.id, task.reminders[0].id);
        assert_eq!(reminder.trigger_time, due_instant(&next).unwrap() - Duration::minutes(15));
    }

    #[test]
    fn test_next_instance_requires_completion() {
        let task = recurring("Gym", date(2025, 3, 3), RecurrencePattern::new(Frequency::Daily, 1));
        let err = create_next_instance(&task, utc(2025, 3, 3)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidOperation(_)));
    }

    #[test]
    fn test_next_instance_requires_recurrence() {
        let mut task = Task::new("Once", utc(2025, 1, 1));
        task.status = TaskStatus::Done;
        let err = create_next_instance(&task, utc(2025, 3, 3)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidOperation(_)));
    }

    #[test]
    fn test_next_instance_none_after_end_date() {
        let mut pattern = RecurrencePattern::new(Frequency::Weekly, 1);
        pattern.end_date = Some(date(2025, 12, 20));
        let mut task = recurring("Review", date(2025, 12, 15), pattern);
        task.status = TaskStatus::Done;

        assert!(create_next_instance(&task, utc(2025, 12, 15)).unwrap().is_none());
    }

    #[test]
    fn test_undated_instance_uses_completion_day() {
        let mut task = recurring("Water", date(2025, 1, 1), RecurrencePattern::new(Frequency::Daily, 2));
        task.due_date = None;
        task.status = TaskStatus::Done;

        let next = create_next_instance(&task, utc(2025, 6, 10)).unwrap().unwrap();
        assert_eq!(next.due_date, Some(date(2025, 6, 12)));
    }

    #[test]
    fn test_series_order_nulls_last() {
        let head = recurring("Read", date(2025, 5, 3), RecurrencePattern::new(Frequency::Daily, 1));
        let tasks = vec![
            member(&head, None, TaskStatus::Todo),
            member(&head, Some(date(2025, 5, 9)), TaskStatus::Todo),
            head.clone(),
        ];
        let index = SeriesIndex::build(&tasks);
        let dues: Vec<Option<NaiveDate>> = index
            .tasks(head.series_id.as_deref().unwrap())
            .iter()
            .map(|t| t.due_date)
            .collect();

        assert_eq!(dues, vec![Some(date(2025, 5, 3)), Some(date(2025, 5, 9)), None]);
        assert!(index.tasks("no-such-series").is_empty());
    }

    #[test]
    fn test_summaries() {
        let head = recurring("Read", date(2025, 5, 3), RecurrencePattern::new(Frequency::Daily, 1));
        let tasks = vec![
            member(&head, Some(date(2025, 5, 1)), TaskStatus::Done),
            head.clone(),
            Task::new("Loose task", utc(2025, 1, 1)),
        ];
        let summaries = SeriesIndex::build(&tasks).summaries();

        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].instances, 2);
        assert_eq!(summaries[0].completed, 1);
        assert_eq!(summaries[0].next_due, Some(date(2025, 5, 3)));
        assert!(summaries[0].active);
    }

    #[test]
    fn test_scope_flags() {
        assert_eq!(SeriesScope::from_flags(false, false).unwrap(), SeriesScope::All);
        assert_eq!(SeriesScope::from_flags(false, true).unwrap(), SeriesScope::All);
        assert_eq!(SeriesScope::from_flags(true, false).unwrap(), SeriesScope::FutureOnly);
        assert!(matches!(
            SeriesScope::from_flags(true, true),
            Err(SchedulerError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_complete_task_spawns_and_persists_successor() {
        let task = recurring("Journal", date(2025, 12, 9), RecurrencePattern::new(Frequency::Daily, 1));
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let manager = SeriesManager::new(&store);

        let done = manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        assert_eq!(done.completed.status, TaskStatus::Done);
        assert_eq!(done.completed.completed_at, Some(utc(2025, 12, 9)));
        let next = done.next.unwrap();
        assert_eq!(next.due_date, Some(date(2025, 12, 10)));

        let series = manager.get_series_tasks(task.series_id.as_deref().unwrap()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].id, next.id);
    }

    #[test]
    fn test_complete_twice_is_rejected() {
        let task = recurring("Journal", date(2025, 12, 9), RecurrencePattern::new(Frequency::Daily, 1));
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let manager = SeriesManager::new(&store);

        manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        let err = manager.complete_task(task.id, utc(2025, 12, 9)).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidOperation(_)));
        assert!(matches!(
            manager.complete_task(Uuid::new_v4(), utc(2025, 12, 9)),
            Err(SchedulerError::NotFound("task"))
        ));
    }

    #[test]
    fn test_concurrent_completions_spawn_one_successor() {
        let task = recurring("Journal", date(2025, 12, 9), RecurrencePattern::new(Frequency::Daily, 1));
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let barrier = std::sync::Barrier::new(2);

        let results: Vec<SchedulerResult<Completion>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        SeriesManager::new(&store).complete_task(task.id, utc(2025, 12, 9))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(SchedulerError::InvalidOperation(_)))));

        let series = SeriesManager::new(&store)
            .get_series_tasks(task.series_id.as_deref().unwrap())
            .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.iter().filter(|t| t.status == TaskStatus::Todo).count(), 1);
    }

    #[test]
    fn test_recompleting_reopened_task_does_not_duplicate_successor() {
        let task = recurring("Journal", date(2025, 12, 9), RecurrencePattern::new(Frequency::Daily, 1));
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let manager = SeriesManager::new(&store);

        manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        let mut reopened = store.get(task.id).unwrap().unwrap();
        reopened.status = TaskStatus::Todo;
        store.save(&reopened).unwrap();

        let again = manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        assert!(again.next.is_none());
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_complete_last_instance_ends_series() {
        let mut pattern = RecurrencePattern::new(Frequency::Daily, 1);
        pattern.end_date = Some(date(2025, 12, 9));
        let task = recurring("Course", date(2025, 12, 9), pattern);
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let manager = SeriesManager::new(&store);

        let done = manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        assert!(done.next.is_none());
        let series = manager.get_series_tasks(task.series_id.as_deref().unwrap()).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].id, task.id);
    }

    #[test]
    fn test_update_future_only_skips_completed_and_past() {
        let head = recurring("Yoga", date(2025, 12, 10), RecurrencePattern::new(Frequency::Daily, 1));
        let done = member(&head, Some(date(2025, 12, 20)), TaskStatus::Done);
        let past = member(&head, Some(date(2025, 12, 1)), TaskStatus::Todo);
        let future = member(&head, Some(date(2025, 12, 21)), TaskStatus::Todo);
        let store = MemoryStore::with_tasks(vec![head.clone(), done.clone(), past.clone(), future.clone()]);
        let manager = SeriesManager::new(&store);

        let updates = SeriesUpdate {
            title: Some("Hot yoga".to_string()),
            ..SeriesUpdate::default()
        };
        let count = manager
            .update_series(head.series_id.as_deref().unwrap(), &updates, SeriesScope::FutureOnly, utc(2025, 12, 10))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.get(head.id).unwrap().unwrap().title, "Hot yoga");
        assert_eq!(store.get(future.id).unwrap().unwrap().title, "Hot yoga");
        assert_eq!(store.get(done.id).unwrap().unwrap().title, "Yoga");
        assert_eq!(store.get(past.id).unwrap().unwrap().title, "Yoga");
    }

    #[test]
    fn test_update_all_still_skips_completed() {
        let head = recurring("Yoga", date(2025, 12, 10), RecurrencePattern::new(Frequency::Daily, 1));
        let done = member(&head, Some(date(2025, 12, 9)), TaskStatus::Done);
        let past = member(&head, Some(date(2025, 12, 1)), TaskStatus::Todo);
        let store = MemoryStore::with_tasks(vec![head.clone(), done.clone(), past.clone()]);
        let manager = SeriesManager::new(&store);

        let updates = SeriesUpdate {
            priority: Some(1),
            ..SeriesUpdate::default()
        };
        let count = manager
            .update_series(head.series_id.as_deref().unwrap(), &updates, SeriesScope::All, utc(2025, 12, 10))
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(store.get(past.id).unwrap().unwrap().priority, 1);
        assert_eq!(store.get(done.id).unwrap().unwrap().priority, head.priority);
    }

    #[test]
    fn test_update_due_time_recalculates_reminders() {
        let mut head = recurring("Meds", date(2025, 12, 20), RecurrencePattern::new(Frequency::Daily, 1));
        add_reminder(&mut head, ReminderOffset::OneHour, None).unwrap();
        let store = MemoryStore::with_tasks(vec![head.clone()]);
        let manager = SeriesManager::new(&store);

        let updates = SeriesUpdate {
            due_time: NaiveTime::from_hms_opt(18, 0, 0),
            ..SeriesUpdate::default()
        };
        manager
            .update_series(head.series_id.as_deref().unwrap(), &updates, SeriesScope::All, utc(2025, 12, 10))
            .unwrap();

        let saved = store.get(head.id).unwrap().unwrap();
        assert_eq!(
            saved.reminders[0].trigger_time,
            Utc.with_ymd_and_hms(2025, 12, 20, 17, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_update_rejects_invalid_fields() {
        let store = MemoryStore::new();
        let manager = SeriesManager::new(&store);
        let updates = SeriesUpdate {
            priority: Some(0),
            ..SeriesUpdate::default()
        };
        let err = manager
            .update_series("any", &updates, SeriesScope::All, utc(2025, 12, 10))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Validation { field: "priority", .. }));
    }

    #[test]
    fn test_delete_future_only_counts_one() {
        let head = recurring("Piano", date(2025, 12, 1), RecurrencePattern::new(Frequency::Weekly, 1));
        let mut first = head.clone();
        first.status = TaskStatus::Done;
        let second = member(&head, Some(date(2025, 12, 8)), TaskStatus::Done);
        let third = member(&head, Some(date(2025, 12, 15)), TaskStatus::Todo);
        let store = MemoryStore::with_tasks(vec![first, second, third.clone()]);
        let manager = SeriesManager::new(&store);

        let deleted = manager
            .delete_series(head.series_id.as_deref().unwrap(), SeriesScope::FutureOnly, utc(2025, 12, 9))
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.get_all().unwrap().len(), 2);
        assert!(store.get(third.id).unwrap().is_none());
    }

    #[test]
    fn test_delete_all_removes_history_too() {
        let head = recurring("Piano", date(2025, 12, 1), RecurrencePattern::new(Frequency::Weekly, 1));
        let done = member(&head, Some(date(2025, 11, 24)), TaskStatus::Done);
        let other = Task::new("Unrelated", utc(2025, 1, 1));
        let store = MemoryStore::with_tasks(vec![head.clone(), done, other.clone()]);
        let manager = SeriesManager::new(&store);

        let deleted = manager
            .delete_series(head.series_id.as_deref().unwrap(), SeriesScope::All, utc(2025, 12, 9))
            .unwrap();

        assert_eq!(deleted, 2);
        let left = store.get_all().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, other.id);
    }

    #[test]
    fn test_unknown_series_is_noop() {
        let store = MemoryStore::with_tasks(vec![Task::new("Loose", utc(2025, 1, 1))]);
        let manager = SeriesManager::new(&store);
        let now = utc(2025, 12, 9);

        assert!(manager.get_series_tasks("missing").unwrap().is_empty());
        assert_eq!(manager.delete_series("missing", SeriesScope::All, now).unwrap(), 0);
        assert_eq!(
            manager
                .update_series("missing", &SeriesUpdate::default(), SeriesScope::All, now)
                .unwrap(),
            0
        );
        assert_eq!(manager.stop_series("missing").unwrap(), 0);
    }

    #[test]
    fn test_stop_series_prevents_successor() {
        let task = recurring("Newsletter", date(2025, 12, 9), RecurrencePattern::new(Frequency::Weekly, 1));
        let store = MemoryStore::with_tasks(vec![task.clone()]);
        let manager = SeriesManager::new(&store);

        assert_eq!(manager.stop_series(task.series_id.as_deref().unwrap()).unwrap(), 1);
        let done = manager.complete_task(task.id, utc(2025, 12, 9)).unwrap();
        assert!(done.next.is_none());
        assert!(!done.completed.is_recurring());
    }
}
