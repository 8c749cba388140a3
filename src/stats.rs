// src/stats.rs
//
// Pure statistics over the completed workout history. One output point per
// session that had at least one qualifying set; no smoothing or binning.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Workout;

/// Per-session statistics for one exercise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExercisePoint {
    pub date: DateTime<Utc>,
    pub max_weight: f64,
    /// Epley estimate, rounded to the nearest integer at output.
    pub estimated_1rm: i64,
    /// Sum of weight * reps over qualifying sets.
    pub total_volume: f64,
}

/// Epley one-rep-max estimate. Only defined for strictly positive inputs.
pub fn estimate_1rm(weight: f64, reps: u32) -> Option<f64> {
    if weight > 0.0 && reps > 0 {
        Some(weight * (1.0 + f64::from(reps) / 30.0))
    } else {
        None
    }
}

/// Derives the per-date time series for the exactly-named exercise.
///
/// Workouts are ordered by start timestamp ascending (epoch zero when
/// absent); only sets with strictly positive weight and reps qualify.
pub fn compute_stats(history: &[Workout], exercise_name: &str) -> Vec<ExercisePoint> {
    let mut workouts: Vec<&Workout> = history.iter().collect();
    workouts.sort_by_key(|w| w.started_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH));

    let mut points = Vec::new();
    for workout in workouts {
        let Some(exercise) = workout.exercises.iter().find(|e| e.name == exercise_name) else {
            continue;
        };

        let mut max_weight = 0.0f64;
        let mut best_e1rm = 0.0f64;
        let mut total_volume = 0.0f64;
        let mut qualifying = false;

        for set in &exercise.sets {
            let Some(e1rm) = estimate_1rm(set.weight, set.reps) else {
                continue;
            };
            qualifying = true;
            max_weight = max_weight.max(set.weight);
            best_e1rm = best_e1rm.max(e1rm);
            total_volume += set.weight * f64::from(set.reps);
        }

        if qualifying {
            points.push(ExercisePoint {
                date: workout.started_at.unwrap_or_else(Utc::now),
                max_weight,
                estimated_1rm: best_e1rm.round() as i64,
                total_volume,
            });
        }
    }
    points
}

/// Heart-rate zone lower bounds as fractions of max heart rate.
const ZONE_BOUNDS: [f64; 5] = [0.5, 0.6, 0.7, 0.8, 0.9];

/// Buckets per-second heart-rate samples into the five training zones.
/// Samples below 50% of max fall outside every zone and are dropped.
pub fn bucket_heart_rate(samples: &[u32], max_heart_rate: u32) -> [u32; 5] {
    let mut zones = [0u32; 5];
    if max_heart_rate == 0 {
        return zones;
    }
    for &sample in samples {
        let fraction = f64::from(sample) / f64::from(max_heart_rate);
        let zone = ZONE_BOUNDS.iter().rposition(|&bound| fraction >= bound);
        if let Some(z) = zone {
            zones[z] += 1;
        }
    }
    zones
}
