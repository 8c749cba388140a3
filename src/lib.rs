// src/lib.rs
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::warn;

// --- Declare modules ---
pub mod config;
pub mod models;
pub mod provider;
pub mod remote;
pub mod stats;
pub mod store;
pub mod sync;
pub mod workout;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util,
    load as load_config_util,
    save as save_config_util,
    Config,
    Error as ConfigError,
    ProviderConfig,
    SyncConfig,
};
pub use models::{
    CustomExercise, EquipmentKind, HasId, Program, Workout, WorkoutExercise, WorkoutSet,
    DEFAULT_SET_REPS, DEFAULT_SET_WEIGHT,
};
pub use provider::{ProviderActivity, ProviderClient, ProviderError, ProviderLink};
pub use remote::{Collection, RemoteError, RemoteRow, RemoteStore};
pub use stats::{bucket_heart_rate, compute_stats, estimate_1rm, ExercisePoint};
pub use store::{get_data_dir as get_data_dir_util, LocalStore, StoreError};
pub use sync::{merge_by_id, sync_collection, SyncSession};
pub use workout::{parse_set_input, RestTimer, SetField};

pub struct AppService {
    pub config: Config,
    pub config_path: PathBuf,
    pub store: LocalStore,
    pub history: Vec<Workout>,
    pub programs: Vec<Program>,
    pub exercises: Vec<CustomExercise>,
    pub active: Option<Workout>,
    pub rest_timer: RestTimer,
}

impl AppService {
    /// Initializes the application service: loads config, opens the local
    /// store and reads all collections into memory.
    /// # Errors
    /// Returns `anyhow::Error` if config/data path determination or config
    /// loading fails. Corrupted collection data is not an error; it falls
    /// back to empty.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .context(format!("Failed to load config from {config_path:?}"))?;
        let store = LocalStore::open_default().context("Failed to open local data store")?;
        Ok(Self::with_store(config, config_path, store))
    }

    /// Builds a service over an already-opened store. Collections are read
    /// eagerly; the active slot comes back as `None` if empty.
    pub fn with_store(config: Config, config_path: PathBuf, store: LocalStore) -> Self {
        let history = store.load_history();
        let programs = store.load_programs();
        let exercises = store.load_exercises();
        let active = store.load_active();
        let rest_timer = store.load_rest_timer();
        Self {
            config,
            config_path,
            store,
            history,
            programs,
            exercises,
            active,
            rest_timer,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    // --- Active workout state machine ---

    /// Starts a new workout, replacing any unfinished one. With a program
    /// name, the template's exercises are instantiated from the library
    /// (unknown names default to barbell) with one default set each.
    /// # Errors
    /// Returns `anyhow::Error` if the named program does not exist or the
    /// active slot cannot be persisted.
    pub fn start_workout(&mut self, program_name: Option<&str>) -> Result<()> {
        let now = Utc::now();
        let mut workout = match program_name {
            Some(name) => {
                let program = self
                    .programs
                    .iter()
                    .find(|p| p.name == name || p.id == name)
                    .ok_or_else(|| anyhow::anyhow!("Program '{name}' not found."))?;
                let mut w = Workout::new(&program.name, now);
                w.exercises = instantiate_exercises(program, &self.exercises);
                w
            }
            None => Workout::new("Workout", now),
        };
        workout.started_at = Some(now);
        self.active = Some(workout);
        self.persist_active()
    }

    /// Appends an exercise to the active workout; a no-op without one.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn add_exercise(&mut self, name: &str, kind: EquipmentKind) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        if let Some(active) = self.active.as_mut() {
            workout::add_exercise(active, trimmed, kind);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Removes the exercise with the given id; absent ids are ignored.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn remove_exercise(&mut self, exercise_id: &str) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::remove_exercise(active, exercise_id);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Sets the weight or rep field on one set from raw input. Empty or
    /// invalid numeric input coerces to zero; this never fails on input.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn update_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        field: SetField,
        raw: &str,
    ) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::update_set(active, exercise_index, set_index, field, raw);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Flips a set's completion flag, stamping or clearing the completion
    /// timestamp accordingly.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn toggle_set_complete(&mut self, exercise_index: usize, set_index: usize) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::toggle_set_complete(active, exercise_index, set_index, Utc::now());
            self.persist_active()?;
        }
        Ok(())
    }

    /// Appends a set cloning the previous last set (or the 20x10 default).
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn add_set(&mut self, exercise_index: usize) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::add_set(active, exercise_index);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Reorders the active workout's exercises; unknown ids are dropped.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn reorder_exercises(&mut self, id_order: &[String]) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::reorder_exercises(active, id_order);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Renames the active workout.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn rename_workout(&mut self, name: &str) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            workout::rename(active, name);
            self.persist_active()?;
        }
        Ok(())
    }

    /// Finishes the active workout: stamps the end time, moves it into
    /// history (replacing an existing entry with the same id in place,
    /// else prepending), pushes it remotely best-effort and clears the
    /// slot. A no-op without an active workout.
    /// # Errors
    /// Returns `anyhow::Error` if local persistence fails; remote failures
    /// are logged and dropped.
    pub async fn finish_workout(&mut self) -> Result<()> {
        let Some(mut finished) = self.active.take() else {
            return Ok(());
        };
        finished.ended_at = Some(Utc::now());

        match self.history.iter().position(|w| w.id == finished.id) {
            Some(pos) => self.history[pos] = finished.clone(),
            None => self.history.insert(0, finished.clone()),
        }
        self.store
            .save_history(&self.history)
            .context("Failed to persist workout history")?;
        self.persist_active()?;

        if let Some((remote, session)) = self.remote_parts() {
            let data = serde_json::to_value(&finished)
                .context("Failed to serialize finished workout")?;
            if let Err(e) = remote
                .upsert_entity(Collection::History, &session.user_id, &finished.id, &data)
                .await
            {
                warn!("Dropping remote push of finished workout: {e}");
            }
        }
        Ok(())
    }

    /// Discards the active workout without touching history.
    /// # Errors
    /// Returns `anyhow::Error` if the active slot cannot be persisted.
    pub fn cancel_workout(&mut self) -> Result<()> {
        self.active = None;
        self.persist_active()
    }

    /// Deep-copies a history entry back into the active slot for editing.
    /// The prior end timestamp is kept until `finish_workout` overwrites
    /// it; re-finishing replaces the same history entry by id.
    /// # Errors
    /// Returns `anyhow::Error` if the id is unknown or persistence fails.
    pub fn edit_history_entry(&mut self, workout_id: &str) -> Result<()> {
        let entry = self
            .history
            .iter()
            .find(|w| w.id == workout_id)
            .ok_or_else(|| anyhow::anyhow!("Workout '{workout_id}' not found in history."))?;
        self.active = Some(entry.clone());
        self.persist_active()
    }

    /// Deletes a history entry locally and best-effort remotely.
    /// # Errors
    /// Returns `anyhow::Error` if the id is unknown or persistence fails.
    pub async fn delete_history_entry(&mut self, workout_id: &str) -> Result<()> {
        let Some(pos) = self.history.iter().position(|w| w.id == workout_id) else {
            bail!("Workout '{workout_id}' not found in history.");
        };
        self.history.remove(pos);
        self.store
            .save_history(&self.history)
            .context("Failed to persist workout history")?;
        self.delete_remote(Collection::History, workout_id).await;
        Ok(())
    }

    // --- Rest timer ---

    /// Starts (or restarts) the rest countdown.
    /// # Errors
    /// Returns `anyhow::Error` if the timer cannot be persisted.
    pub fn start_rest(&mut self, seconds: i64) -> Result<()> {
        self.rest_timer.start(seconds, Utc::now());
        self.persist_rest_timer()
    }

    /// Stops the countdown and returns the timer to idle.
    /// # Errors
    /// Returns `anyhow::Error` if the timer cannot be persisted.
    pub fn end_rest(&mut self) -> Result<()> {
        self.rest_timer.end_rest();
        self.persist_rest_timer()
    }

    /// Extends a running countdown; a no-op when idle.
    /// # Errors
    /// Returns `anyhow::Error` if the timer cannot be persisted.
    pub fn add_rest_time(&mut self, seconds: i64) -> Result<()> {
        self.rest_timer.add_time(seconds);
        self.persist_rest_timer()
    }

    pub fn rest_remaining_seconds(&self) -> Option<i64> {
        self.rest_timer.remaining_seconds(Utc::now())
    }

    // --- Exercise library ---

    /// Adds a library entry.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or already taken, or
    /// persistence fails.
    pub fn create_custom_exercise(&mut self, name: &str, kind: EquipmentKind) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Exercise name cannot be empty.");
        }
        if self
            .exercises
            .iter()
            .any(|e| e.name.eq_ignore_ascii_case(trimmed))
        {
            bail!("Exercise '{trimmed}' already exists in the library.");
        }
        let exercise = CustomExercise::new(trimmed, kind);
        let id = exercise.id.clone();
        self.exercises.push(exercise);
        self.store
            .save_exercises(&self.exercises)
            .context("Failed to persist exercise library")?;
        Ok(id)
    }

    /// Renames a library entry. Programs reference exercises by name, so
    /// templates using the old name keep it; this matches the documented
    /// consistency risk and is not silently repaired.
    /// # Errors
    /// Returns `anyhow::Error` if the id is unknown, the new name is
    /// empty, or persistence fails.
    pub fn rename_custom_exercise(&mut self, id: &str, new_name: &str) -> Result<()> {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            bail!("New exercise name cannot be empty.");
        }
        let Some(exercise) = self.exercises.iter_mut().find(|e| e.id == id) else {
            bail!("Exercise '{id}' not found in the library.");
        };
        exercise.name = trimmed.to_string();
        self.store
            .save_exercises(&self.exercises)
            .context("Failed to persist exercise library")
    }

    /// Removes a library entry locally and best-effort remotely.
    /// # Errors
    /// Returns `anyhow::Error` if the id is unknown or persistence fails.
    pub async fn delete_custom_exercise(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.exercises.iter().position(|e| e.id == id) else {
            bail!("Exercise '{id}' not found in the library.");
        };
        self.exercises.remove(pos);
        self.store
            .save_exercises(&self.exercises)
            .context("Failed to persist exercise library")?;
        self.delete_remote(Collection::Exercises, id).await;
        Ok(())
    }

    // --- Programs ---

    /// Creates a workout template from an ordered list of exercise names.
    /// # Errors
    /// Returns `anyhow::Error` if the name is empty or persistence fails.
    pub fn create_program(&mut self, name: &str, exercise_names: Vec<String>) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Program name cannot be empty.");
        }
        let program = Program::new(trimmed, exercise_names);
        let id = program.id.clone();
        self.programs.push(program);
        self.store
            .save_programs(&self.programs)
            .context("Failed to persist programs")?;
        Ok(id)
    }

    /// Removes a program locally and best-effort remotely.
    /// # Errors
    /// Returns `anyhow::Error` if the id is unknown or persistence fails.
    pub async fn delete_program(&mut self, id: &str) -> Result<()> {
        let Some(pos) = self.programs.iter().position(|p| p.id == id) else {
            bail!("Program '{id}' not found.");
        };
        self.programs.remove(pos);
        self.store
            .save_programs(&self.programs)
            .context("Failed to persist programs")?;
        self.delete_remote(Collection::Programs, id).await;
        Ok(())
    }

    // --- Synchronization ---

    /// Builds the session context from the configured identity.
    /// # Errors
    /// Returns `ConfigError` if the server URL or user id is missing.
    pub fn sync_session(&self) -> Result<SyncSession, ConfigError> {
        if self.config.sync.server_url.is_none() {
            return Err(ConfigError::ServerNotSet(self.config_path.clone()));
        }
        self.config
            .sync
            .user_id
            .clone()
            .map(SyncSession::new)
            .ok_or_else(|| ConfigError::UserNotSet(self.config_path.clone()))
    }

    /// Runs the push-then-pull merge for all three collections and
    /// republishes the merged results to memory and the local store.
    /// Remote failures leave the affected collection unchanged.
    /// # Errors
    /// Returns `anyhow::Error` only if republishing locally fails.
    pub async fn sync_all(&mut self, session: &SyncSession) -> Result<()> {
        let Some(server_url) = self.config.sync.server_url.clone() else {
            bail!("Sync is not configured.");
        };
        let remote = RemoteStore::new(server_url, self.config.sync.auth_token.clone());

        self.history =
            sync_collection(&remote, session, Collection::History, &self.history).await;
        self.store
            .save_history(&self.history)
            .context("Failed to persist merged history")?;

        self.programs =
            sync_collection(&remote, session, Collection::Programs, &self.programs).await;
        self.store
            .save_programs(&self.programs)
            .context("Failed to persist merged programs")?;

        self.exercises =
            sync_collection(&remote, session, Collection::Exercises, &self.exercises).await;
        self.store
            .save_exercises(&self.exercises)
            .context("Failed to persist merged exercise library")?;

        Ok(())
    }

    // --- Statistics ---

    /// Per-session statistics for one exactly-named exercise.
    pub fn exercise_stats(&self, exercise_name: &str) -> Vec<ExercisePoint> {
        compute_stats(&self.history, exercise_name)
    }

    // --- Provider integration ---

    pub fn provider_client(&self) -> ProviderClient {
        ProviderClient::new(self.config.provider.clone())
    }

    /// Exchanges the OAuth redirect code and stores the resulting link.
    /// # Errors
    /// Returns `anyhow::Error` if unconfigured or the exchange fails.
    pub async fn connect_provider(&mut self, code: &str) -> Result<ProviderLink> {
        let user_token = self.user_bearer()?;
        let link = self
            .provider_client()
            .exchange_code(&user_token, code)
            .await
            .context("Provider token exchange failed")?;
        self.store
            .save_provider_link(Some(&link))
            .context("Failed to persist provider link")?;
        Ok(link)
    }

    /// Clears the stored provider link, if any.
    /// # Errors
    /// Returns `anyhow::Error` if persistence fails.
    pub fn disconnect_provider(&mut self) -> Result<()> {
        self.store
            .save_provider_link(None)
            .context("Failed to clear provider link")
    }

    /// Returns a valid access token, refreshing near expiry. A failed
    /// refresh clears the stored link and reports the disconnected state.
    /// # Errors
    /// Returns `ProviderError::Disconnected` (wrapped) after clearing the
    /// link, or other `anyhow::Error` variants for missing configuration.
    pub async fn provider_access_token(&mut self) -> Result<String> {
        let Some(link) = self.store.load_provider_link() else {
            bail!("No fitness service connected.");
        };
        let user_token = self.user_bearer()?;
        match self
            .provider_client()
            .valid_link(&user_token, &link, Utc::now())
            .await
        {
            Ok(fresh) => {
                if fresh != link {
                    self.store
                        .save_provider_link(Some(&fresh))
                        .context("Failed to persist refreshed provider link")?;
                }
                Ok(fresh.access_token)
            }
            Err(ProviderError::Disconnected) => {
                self.store
                    .save_provider_link(None)
                    .context("Failed to clear provider link")?;
                Err(ProviderError::Disconnected.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // --- Internals ---

    fn persist_active(&self) -> Result<()> {
        self.store
            .save_active(self.active.as_ref())
            .context("Failed to persist active workout")
    }

    fn persist_rest_timer(&self) -> Result<()> {
        self.store
            .save_rest_timer(self.rest_timer)
            .context("Failed to persist rest timer")
    }

    fn remote_parts(&self) -> Option<(RemoteStore, SyncSession)> {
        let server_url = self.config.sync.server_url.clone()?;
        let user_id = self.config.sync.user_id.clone()?;
        Some((
            RemoteStore::new(server_url, self.config.sync.auth_token.clone()),
            SyncSession::new(user_id),
        ))
    }

    // Best-effort remote delete; failures are logged and dropped.
    async fn delete_remote(&self, collection: Collection, entity_id: &str) {
        if let Some((remote, session)) = self.remote_parts() {
            if let Err(e) = remote.delete(collection, &session.user_id, entity_id).await {
                warn!("Dropping remote delete of {entity_id}: {e}");
            }
        }
    }

    fn user_bearer(&self) -> Result<String> {
        self.config
            .sync
            .auth_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No auth token configured; sign in first."))
    }
}

// --- Helper Functions ---

/// Instantiates a program's exercise names into workout entries, looking
/// each kind up in the library and defaulting to barbell when unknown.
fn instantiate_exercises(
    program: &Program,
    library: &[CustomExercise],
) -> Vec<WorkoutExercise> {
    program
        .exercise_names
        .iter()
        .map(|name| {
            let kind = library
                .iter()
                .find(|e| e.name == *name)
                .map_or(EquipmentKind::Barbell, |e| e.kind);
            WorkoutExercise::new(name, kind)
        })
        .collect()
}
