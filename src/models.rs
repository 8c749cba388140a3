// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use uuid::Uuid;

/// Weight seeded into a brand-new set when there is nothing to clone from.
pub const DEFAULT_SET_WEIGHT: f64 = 20.0;
/// Reps seeded into a brand-new set when there is nothing to clone from.
pub const DEFAULT_SET_REPS: u32 = 10;

/// Equipment classification for an exercise.
///
/// `Warmup` is the special timed variant; its sets carry a start timestamp
/// instead of meaningful weight/reps.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum EquipmentKind {
    #[default]
    Barbell,
    Dumbbell,
    Cable,
    Bodyweight,
    Machine,
    Warmup,
}

/// One logged weight-and-reps attempt within an exercise.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutSet {
    /// Unique within the owning exercise only.
    pub id: u64,
    pub weight: f64,
    pub reps: u32,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set for timed (warm-up) sets when the clock starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn new(id: u64, weight: f64, reps: u32) -> Self {
        Self {
            id,
            weight,
            reps,
            completed: false,
            completed_at: None,
            started_at: None,
        }
    }

    pub fn seeded(id: u64) -> Self {
        Self::new(id, DEFAULT_SET_WEIGHT, DEFAULT_SET_REPS)
    }
}

/// One exercise performed within a specific workout. Set order is
/// meaningful and preserved by every operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkoutExercise {
    pub id: String,
    pub name: String,
    pub kind: EquipmentKind,
    pub sets: Vec<WorkoutSet>,
}

impl WorkoutExercise {
    /// A fresh exercise entry seeded with one default set.
    pub fn new(name: &str, kind: EquipmentKind) -> Self {
        Self {
            id: generate_id(),
            name: name.to_string(),
            kind,
            sets: vec![WorkoutSet::seeded(1)],
        }
    }

    /// Next set id, unique within this exercise.
    pub fn next_set_id(&self) -> u64 {
        self.sets.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }
}

/// One training session. Active while `ended_at` is `None`; at most one
/// workout may be active at a time on a device.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Workout {
    pub id: String,
    pub name: String,
    /// Human-readable date shown in listings, frozen at creation time.
    pub display_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub exercises: Vec<WorkoutExercise>,
}

impl Workout {
    pub fn new(name: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id_at(now),
            name: name.to_string(),
            display_date: now.format("%Y-%m-%d").to_string(),
            started_at: Some(now),
            ended_at: None,
            exercises: Vec::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A named workout template. References exercises by *name*, not id, so
/// renaming a library entry does not propagate here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Program {
    pub id: String,
    pub name: String,
    pub exercise_names: Vec<String>,
}

impl Program {
    pub fn new(name: &str, exercise_names: Vec<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.to_string(),
            exercise_names,
        }
    }
}

/// A library entry defining an exercise's display name and equipment kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CustomExercise {
    pub id: String,
    pub name: String,
    pub kind: EquipmentKind,
}

impl CustomExercise {
    pub fn new(name: &str, kind: EquipmentKind) -> Self {
        Self {
            id: generate_id(),
            name: name.to_string(),
            kind,
        }
    }
}

/// On-disk shape of a library entry. Records written before the kind field
/// existed lack it; `upgrade` runs once at load time and produces the
/// fully-typed entity.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CustomExerciseRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: Option<EquipmentKind>,
}

impl CustomExerciseRecord {
    pub fn upgrade(self) -> CustomExercise {
        CustomExercise {
            id: self.id,
            name: self.name,
            kind: self.kind.unwrap_or_default(),
        }
    }
}

impl From<&CustomExercise> for CustomExerciseRecord {
    fn from(ex: &CustomExercise) -> Self {
        Self {
            id: ex.id.clone(),
            name: ex.name.clone(),
            kind: Some(ex.kind),
        }
    }
}

/// Anything the sync engine can correlate across the local/remote boundary.
pub trait HasId {
    fn entity_id(&self) -> &str;
}

impl HasId for Workout {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl HasId for Program {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl HasId for CustomExercise {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Millisecond timestamp plus a short random suffix. The timestamp keeps
/// ids roughly creation-ordered; the suffix prevents same-millisecond
/// collisions across devices.
pub fn generate_id_at(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", now.timestamp_millis(), &suffix[..8])
}

pub fn generate_id() -> String {
    generate_id_at(Utc::now())
}
