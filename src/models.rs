use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulerError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Custom,
}

// Weekdays are stored as 0..=6 with 0 = Monday
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub days_of_week: BTreeSet<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            days_of_week: BTreeSet::new(),
            day_of_month: None,
            end_date: None,
        }
    }

    /// Check the pattern invariants, naming the offending field and value.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.interval < 1 {
            return Err(SchedulerError::validation(
                "interval",
                format!("interval must be at least 1, got {}", self.interval),
            ));
        }
        if let Some(day) = self.days_of_week.iter().find(|d| **d > 6) {
            return Err(SchedulerError::validation(
                "days_of_week",
                format!("days_of_week values must be between 0 and 6, got {day}"),
            ));
        }
        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(SchedulerError::validation(
                    "day_of_month",
                    format!("day_of_month must be between 1 and 31, got {day}"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderOffset {
    AtTime,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    OneDay,
    OneWeek,
    Custom,
}

impl ReminderOffset {
    /// Lead time in minutes for the named offsets. `None` for `Custom`,
    /// whose length lives on the reminder itself.
    pub fn minutes(&self) -> Option<i64> {
        match self {
            ReminderOffset::AtTime => Some(0),
            ReminderOffset::FiveMinutes => Some(5),
            ReminderOffset::FifteenMinutes => Some(15),
            ReminderOffset::ThirtyMinutes => Some(30),
            ReminderOffset::OneHour => Some(60),
            ReminderOffset::TwoHours => Some(120),
            ReminderOffset::OneDay => Some(24 * 60),
            ReminderOffset::OneWeek => Some(7 * 24 * 60),
            ReminderOffset::Custom => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: Uuid,
    pub offset: ReminderOffset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_minutes: Option<i64>,
    pub trigger_time: DateTime<Utc>, // derived from the owning task's due instant
    pub shown: bool,
}

impl Reminder {
    pub fn offset_minutes(&self) -> i64 {
        self.offset
            .minutes()
            .or(self.custom_minutes)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub priority: i64, // 1..=5
    #[serde(default)]
    pub categories: Vec<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_time: Option<NaiveTime>, // None = end of day
    #[serde(default)]
    pub recurrence: Option<RecurrencePattern>,
    #[serde(default)]
    pub series_id: Option<String>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl Task {
    pub fn new(title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            priority: 3,
            categories: Vec::new(),
            status: TaskStatus::Todo,
            created_at,
            completed_at: None,
            due_date: None,
            due_time: None,
            recurrence: None,
            series_id: None,
            reminders: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.title.trim().is_empty() {
            return Err(SchedulerError::validation("title", "title is required"));
        }
        if !(1..=5).contains(&self.priority) {
            return Err(SchedulerError::validation(
                "priority",
                format!("priority must be between 1 and 5, got {}", self.priority),
            ));
        }
        if let Some(pattern) = &self.recurrence {
            pattern.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserPreferences {
    #[serde(default)]
    pub default_reminder: Option<ReminderOffset>,
    #[serde(default = "default_notifications_enabled")]
    pub notifications_enabled: bool,
}

fn default_notifications_enabled() -> bool {
    true
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_reminder: None,
            notifications_enabled: true,
        }
    }
}

// Whole-file layout of the JSON store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Db {
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub tasks: Vec<Task>,
}
