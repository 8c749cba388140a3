// src/store.rs
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::models::{CustomExercise, CustomExerciseRecord, Program, Workout};
use crate::provider::ProviderLink;
use crate::workout::RestTimer;

const APP_DATA_DIR: &str = "ironlog";
const DATA_ENV_VAR: &str = "IRONLOG_DATA_DIR";

// Persisted key names, one JSON file per collection.
const KEY_HISTORY: &str = "workoutHistory";
const KEY_PROGRAMS: &str = "programs";
const KEY_EXERCISES: &str = "customExercises";
const KEY_ACTIVE: &str = "activeWorkout";
const KEY_PROVIDER: &str = "providerLink";
const KEY_REST: &str = "restTimer";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not determine application data directory.")]
    DataDir,
    #[error("I/O error accessing data file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize data for key '{0}': {1}")]
    Serialize(&'static str, #[source] serde_json::Error),
}

/// Determines the directory holding the persisted collections, creating it
/// if needed. `IRONLOG_DATA_DIR` overrides the platform default.
pub fn get_data_dir() -> Result<PathBuf, StoreError> {
    let dir = if let Ok(path_str) = std::env::var(DATA_ENV_VAR) {
        PathBuf::from(path_str)
    } else {
        dirs::data_dir()
            .ok_or(StoreError::DataDir)?
            .join(APP_DATA_DIR)
    };
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Key/value persistence of the four collections. Each collection is saved
/// independently right after each mutation; there are no cross-collection
/// transactions.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Opens the store at the default (or env-overridden) data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        Ok(Self::new(get_data_dir()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_history(&self) -> Vec<Workout> {
        self.load_or_empty(KEY_HISTORY)
    }

    pub fn save_history(&self, history: &[Workout]) -> Result<(), StoreError> {
        self.save(KEY_HISTORY, &history)
    }

    pub fn load_programs(&self) -> Vec<Program> {
        self.load_or_empty(KEY_PROGRAMS)
    }

    pub fn save_programs(&self, programs: &[Program]) -> Result<(), StoreError> {
        self.save(KEY_PROGRAMS, &programs)
    }

    /// Loads the exercise library, running the record upgrade step so
    /// callers only ever see fully-typed entries.
    pub fn load_exercises(&self) -> Vec<CustomExercise> {
        let records: Vec<CustomExerciseRecord> = self.load_or_empty(KEY_EXERCISES);
        records.into_iter().map(CustomExerciseRecord::upgrade).collect()
    }

    pub fn save_exercises(&self, exercises: &[CustomExercise]) -> Result<(), StoreError> {
        let records: Vec<CustomExerciseRecord> =
            exercises.iter().map(CustomExerciseRecord::from).collect();
        self.save(KEY_EXERCISES, &records)
    }

    /// Returns the in-progress workout, or `None` if the slot is empty or
    /// unreadable.
    pub fn load_active(&self) -> Option<Workout> {
        self.load_slot(KEY_ACTIVE)
    }

    /// Persists the active slot. An absent workout removes the key entirely
    /// rather than storing a null placeholder.
    pub fn save_active(&self, workout: Option<&Workout>) -> Result<(), StoreError> {
        self.save_slot(KEY_ACTIVE, workout)
    }

    pub fn load_provider_link(&self) -> Option<ProviderLink> {
        self.load_slot(KEY_PROVIDER)
    }

    pub fn save_provider_link(&self, link: Option<&ProviderLink>) -> Result<(), StoreError> {
        self.save_slot(KEY_PROVIDER, link)
    }

    pub fn load_rest_timer(&self) -> RestTimer {
        self.load_slot(KEY_REST).unwrap_or_default()
    }

    /// An idle timer removes the key instead of storing a placeholder.
    pub fn save_rest_timer(&self, timer: RestTimer) -> Result<(), StoreError> {
        match timer {
            RestTimer::Idle => self.save_slot::<RestTimer>(KEY_REST, None),
            running => self.save_slot(KEY_REST, Some(&running)),
        }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    // Single-value slots share the collections' failure policy, except
    // that "absent" round-trips as `None` rather than an empty value.
    fn load_slot<T: DeserializeOwned>(&self, key: &'static str) -> Option<T> {
        let path = self.key_path(key);
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Discarding unparsable '{key}' data: {e}");
                    None
                }
            },
            Err(e) => {
                warn!("Could not read '{key}': {e}");
                None
            }
        }
    }

    fn save_slot<T: Serialize>(&self, key: &'static str, value: Option<&T>) -> Result<(), StoreError> {
        match value {
            Some(v) => self.save(key, v),
            None => {
                let path = self.key_path(key);
                if path.exists() {
                    fs::remove_file(path)?;
                }
                Ok(())
            }
        }
    }

    // A missing file or corrupted JSON both yield the empty collection;
    // a parse failure is logged but never fatal.
    fn load_or_empty<T: DeserializeOwned>(&self, key: &'static str) -> Vec<T> {
        let path = self.key_path(key);
        if !path.exists() {
            return Vec::new();
        }
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Could not read '{key}': {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unparsable '{key}' data: {e}");
                Vec::new()
            }
        }
    }

    fn save<T: Serialize>(&self, key: &'static str, value: &T) -> Result<(), StoreError> {
        let content =
            serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialize(key, e))?;
        fs::write(self.key_path(key), content)?;
        Ok(())
    }
}
