// src/workout.rs
//
// Mutation operations over the single active workout. All operations are
// pure over the in-memory `Workout`; the service layer persists after each
// one. Out-of-range indices and unknown ids are no-ops, never errors.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EquipmentKind, Workout, WorkoutExercise, WorkoutSet};

/// Which numeric field of a set an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetField {
    Weight,
    Reps,
}

/// Parses user input for a set field. Empty input coerces to zero, and so
/// does anything that fails to parse as a non-negative finite number.
pub fn parse_set_input(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v,
        _ => 0.0,
    }
}

/// Appends a new exercise with one default set.
pub fn add_exercise(workout: &mut Workout, name: &str, kind: EquipmentKind) {
    workout.exercises.push(WorkoutExercise::new(name, kind));
}

/// Removes the exercise with the given id; absent ids are ignored.
pub fn remove_exercise(workout: &mut Workout, exercise_id: &str) {
    workout.exercises.retain(|e| e.id != exercise_id);
}

/// Sets the weight or rep field on one set from raw user input.
pub fn update_set(
    workout: &mut Workout,
    exercise_index: usize,
    set_index: usize,
    field: SetField,
    raw: &str,
) {
    let Some(set) = workout
        .exercises
        .get_mut(exercise_index)
        .and_then(|e| e.sets.get_mut(set_index))
    else {
        return;
    };
    let value = parse_set_input(raw);
    match field {
        SetField::Weight => set.weight = value,
        SetField::Reps => set.reps = value as u32,
    }
}

/// Flips the completion flag. Completing stamps `now`; un-completing
/// clears the timestamp.
pub fn toggle_set_complete(
    workout: &mut Workout,
    exercise_index: usize,
    set_index: usize,
    now: DateTime<Utc>,
) {
    let Some(set) = workout
        .exercises
        .get_mut(exercise_index)
        .and_then(|e| e.sets.get_mut(set_index))
    else {
        return;
    };
    set.completed = !set.completed;
    set.completed_at = if set.completed { Some(now) } else { None };
}

/// Appends a new uncompleted set cloning the previous last set's
/// weight/reps, or seeding the defaults if the exercise has none.
pub fn add_set(workout: &mut Workout, exercise_index: usize) {
    let Some(exercise) = workout.exercises.get_mut(exercise_index) else {
        return;
    };
    let id = exercise.next_set_id();
    let set = match exercise.sets.last() {
        Some(last) => WorkoutSet::new(id, last.weight, last.reps),
        None => WorkoutSet::seeded(id),
    };
    exercise.sets.push(set);
}

/// Reorders the exercise list to match the given id sequence. Ids not
/// present in the workout are dropped silently.
pub fn reorder_exercises(workout: &mut Workout, id_order: &[String]) {
    let mut remaining = std::mem::take(&mut workout.exercises);
    let mut ordered = Vec::with_capacity(remaining.len());
    for id in id_order {
        if let Some(pos) = remaining.iter().position(|e| &e.id == id) {
            ordered.push(remaining.remove(pos));
        }
    }
    workout.exercises = ordered;
}

pub fn rename(workout: &mut Workout, name: &str) {
    workout.name = name.to_string();
}

/// The rest countdown between sets. Driven by wall-clock comparison: the
/// caller polls and compares `now` to the stored end timestamp, so no
/// special handling for system clock changes exists.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RestTimer {
    #[default]
    Idle,
    Running {
        ends_at: DateTime<Utc>,
    },
}

impl RestTimer {
    pub fn start(&mut self, seconds: i64, now: DateTime<Utc>) {
        *self = Self::Running {
            ends_at: now + Duration::seconds(seconds),
        };
    }

    pub fn end_rest(&mut self) {
        *self = Self::Idle;
    }

    /// Extends the end timestamp while running; a no-op when idle.
    pub fn add_time(&mut self, seconds: i64) {
        if let Self::Running { ends_at } = self {
            *ends_at += Duration::seconds(seconds);
        }
    }

    /// Seconds left, or `None` when idle. Clamped at zero once expired.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        match self {
            Self::Idle => None,
            Self::Running { ends_at } => Some((*ends_at - now).num_seconds().max(0)),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self, Self::Running { ends_at } if *ends_at <= now)
    }
}
