use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Db, Task, UserPreferences};

pub const DEFAULT_DB_PATH: &str = "data/db.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed database file: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Whole-object task persistence. Every write replaces the stored tasks
/// atomically, so a task's due date and its reminders are never saved apart.
pub trait TaskStore {
    fn get_all(&self) -> StorageResult<Vec<Task>>;
    fn get(&self, id: Uuid) -> StorageResult<Option<Task>>;
    fn save(&self, task: &Task) -> StorageResult<()>;
    fn delete(&self, id: Uuid) -> StorageResult<bool>;

    /// Read, change and write back the whole task collection while holding
    /// the store lock, so no other write can interleave. When `f` returns
    /// `Err` nothing is written.
    fn update_tasks<T, E>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>;
}

pub trait PreferencesStore {
    fn get_preferences(&self) -> StorageResult<UserPreferences>;
    fn save_preferences(&self, preferences: &UserPreferences) -> StorageResult<()>;
}

fn upsert(tasks: &mut Vec<Task>, task: &Task) {
    match tasks.iter_mut().find(|t| t.id == task.id) {
        Some(existing) => *existing = task.clone(),
        None => tasks.push(task.clone()),
    }
}

fn remove_ids(tasks: &mut Vec<Task>, ids: &[Uuid]) -> usize {
    let before = tasks.len();
    tasks.retain(|t| !ids.contains(&t.id));
    before - tasks.len()
}

// -----------------------------
// JSON file store
// -----------------------------

/// Stores the whole database as one pretty-printed JSON document.
/// Writes go to `<path>.tmp` first and are renamed into place.
pub struct JsonStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_db(&self) -> StorageResult<Db> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Db::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn save_db(&self, db: &Db) -> StorageResult<()> {
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let text = serde_json::to_string_pretty(db)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&tmp_path, text)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut Db) -> T) -> StorageResult<T> {
        self.try_update(|db| Ok(f(db)))
    }

    // Load, mutate, and write back while holding the store lock
    fn try_update<T, E>(&self, f: impl FnOnce(&mut Db) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut db = self.load_db()?;
        let out = f(&mut db)?;
        self.save_db(&db)?;
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(Db) -> T) -> StorageResult<T> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(self.load_db()?))
    }
}

impl TaskStore for JsonStore {
    fn get_all(&self) -> StorageResult<Vec<Task>> {
        self.read(|db| db.tasks)
    }

    fn get(&self, id: Uuid) -> StorageResult<Option<Task>> {
        self.read(|db| db.tasks.into_iter().find(|t| t.id == id))
    }

    fn save(&self, task: &Task) -> StorageResult<()> {
        self.update(|db| upsert(&mut db.tasks, task))
    }

    fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.update(|db| remove_ids(&mut db.tasks, &[id]) > 0)
    }

    fn update_tasks<T, E>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        self.try_update(|db| f(&mut db.tasks))
    }
}

impl PreferencesStore for JsonStore {
    fn get_preferences(&self) -> StorageResult<UserPreferences> {
        self.read(|db| db.preferences)
    }

    fn save_preferences(&self, preferences: &UserPreferences) -> StorageResult<()> {
        self.update(|db| db.preferences = preferences.clone())
    }
}

// -----------------------------
// In-memory store
// -----------------------------

#[derive(Default)]
pub struct MemoryStore {
    db: Mutex<Db>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            db: Mutex::new(Db {
                tasks,
                ..Db::default()
            }),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&mut Db) -> T) -> StorageResult<T> {
        let mut db = self.db.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(f(&mut db))
    }
}

impl TaskStore for MemoryStore {
    fn get_all(&self) -> StorageResult<Vec<Task>> {
        self.with_db(|db| db.tasks.clone())
    }

    fn get(&self, id: Uuid) -> StorageResult<Option<Task>> {
        self.with_db(|db| db.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn save(&self, task: &Task) -> StorageResult<()> {
        self.with_db(|db| upsert(&mut db.tasks, task))
    }

    fn delete(&self, id: Uuid) -> StorageResult<bool> {
        self.with_db(|db| remove_ids(&mut db.tasks, &[id]) > 0)
    }

    fn update_tasks<T, E>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut db = self.db.lock().map_err(|_| StorageError::Poisoned)?;
        // Work on a copy so a failed update leaves nothing half-applied
        let mut tasks = db.tasks.clone();
        let out = f(&mut tasks)?;
        db.tasks = tasks;
        Ok(out)
    }
}

impl PreferencesStore for MemoryStore {
    fn get_preferences(&self) -> StorageResult<UserPreferences> {
        self.with_db(|db| db.preferences.clone())
    }

    fn save_preferences(&self, preferences: &UserPreferences) -> StorageResult<()> {
        self.with_db(|db| db.preferences = preferences.clone())
    }
}
