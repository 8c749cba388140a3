use anyhow::Result;
use chrono::{Duration, Utc};
use ironlog_lib::{
    bucket_heart_rate, compute_stats, AppService, Config, EquipmentKind, LocalStore, RestTimer,
    SetField, Workout,
};

// Helper to build a service over a throwaway data directory.
fn create_test_service() -> Result<AppService> {
    let dir = std::env::temp_dir().join(format!("ironlog-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let store = LocalStore::new(dir.clone());
    Ok(AppService::with_store(
        Config::default(),
        dir.join("config.toml"),
        store,
    ))
}

#[test]
fn test_persistence_round_trip() -> Result<()> {
    let mut service = create_test_service()?;

    service.create_custom_exercise("Bench Press", EquipmentKind::Barbell)?;
    service.create_program("Push Day", vec!["Bench Press".to_string()])?;
    service.start_workout(None)?;
    service.add_exercise("Bench Press", EquipmentKind::Barbell)?;

    // A second store over the same directory sees the same data.
    let reopened = LocalStore::new(service.store.root().to_path_buf());
    assert_eq!(reopened.load_exercises(), service.exercises);
    assert_eq!(reopened.load_programs(), service.programs);
    assert_eq!(reopened.load_active(), service.active);

    Ok(())
}

#[test]
fn test_empty_active_slot_loads_as_absent() -> Result<()> {
    let mut service = create_test_service()?;
    assert!(service.active.is_none());

    service.start_workout(None)?;
    let reopened = LocalStore::new(service.store.root().to_path_buf());
    assert!(reopened.load_active().is_some());

    // Clearing the slot removes the key entirely; loading yields absent,
    // not an empty workout.
    service.cancel_workout()?;
    assert!(reopened.load_active().is_none());
    assert!(!service.store.root().join("activeWorkout.json").exists());

    Ok(())
}

#[test]
fn test_corrupt_collection_falls_back_to_empty() -> Result<()> {
    let service = create_test_service()?;
    std::fs::write(
        service.store.root().join("workoutHistory.json"),
        "{not json at all",
    )?;
    assert!(service.store.load_history().is_empty());
    Ok(())
}

#[test]
fn test_library_record_upgrade_defaults_kind() -> Result<()> {
    let service = create_test_service()?;
    // A record written before the kind field existed.
    std::fs::write(
        service.store.root().join("customExercises.json"),
        r#"[{"id":"x1","name":"Row"}]"#,
    )?;
    let exercises = service.store.load_exercises();
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].kind, EquipmentKind::Barbell);
    Ok(())
}

#[test]
fn test_start_from_program_instantiates_defaults() -> Result<()> {
    let mut service = create_test_service()?;
    service.create_custom_exercise("Bench Press", EquipmentKind::Dumbbell)?;
    service.create_program(
        "Push Day",
        vec!["Bench Press".to_string(), "Overhead Press".to_string()],
    )?;

    service.start_workout(Some("Push Day"))?;
    let active = service.active.as_ref().unwrap();
    assert_eq!(active.name, "Push Day");
    assert_eq!(active.exercises.len(), 2);
    // Known name takes its library kind; unknown defaults to barbell.
    assert_eq!(active.exercises[0].kind, EquipmentKind::Dumbbell);
    assert_eq!(active.exercises[1].kind, EquipmentKind::Barbell);
    for exercise in &active.exercises {
        assert_eq!(exercise.sets.len(), 1);
        assert_eq!(exercise.sets[0].weight, 20.0);
        assert_eq!(exercise.sets[0].reps, 10);
        assert!(!exercise.sets[0].completed);
    }
    Ok(())
}

#[test]
fn test_add_set_clones_previous_last_set() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Bench", EquipmentKind::Barbell)?;
    service.add_set(0)?;

    let exercise = &service.active.as_ref().unwrap().exercises[0];
    assert_eq!(exercise.sets.len(), 2);
    assert_eq!(exercise.sets[1].weight, exercise.sets[0].weight);
    assert_eq!(exercise.sets[1].reps, exercise.sets[0].reps);
    assert_eq!(exercise.sets[1].weight, 20.0);
    assert_eq!(exercise.sets[1].reps, 10);
    assert!(!exercise.sets[1].completed);
    // Set ids stay unique within the exercise.
    assert_ne!(exercise.sets[0].id, exercise.sets[1].id);
    Ok(())
}

#[test]
fn test_update_set_coerces_invalid_input_to_zero() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Squat", EquipmentKind::Barbell)?;

    service.update_set(0, 0, SetField::Weight, "102.5")?;
    assert_eq!(service.active.as_ref().unwrap().exercises[0].sets[0].weight, 102.5);

    service.update_set(0, 0, SetField::Weight, "")?;
    assert_eq!(service.active.as_ref().unwrap().exercises[0].sets[0].weight, 0.0);

    service.update_set(0, 0, SetField::Reps, "abc")?;
    assert_eq!(service.active.as_ref().unwrap().exercises[0].sets[0].reps, 0);

    service.update_set(0, 0, SetField::Reps, "8")?;
    assert_eq!(service.active.as_ref().unwrap().exercises[0].sets[0].reps, 8);

    // Out-of-range indices are silent no-ops.
    service.update_set(5, 0, SetField::Weight, "50")?;
    service.update_set(0, 9, SetField::Reps, "5")?;
    Ok(())
}

#[test]
fn test_toggle_set_complete_is_own_inverse() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Deadlift", EquipmentKind::Barbell)?;

    service.toggle_set_complete(0, 0)?;
    {
        let set = &service.active.as_ref().unwrap().exercises[0].sets[0];
        assert!(set.completed);
        assert!(set.completed_at.is_some());
    }

    service.toggle_set_complete(0, 0)?;
    {
        let set = &service.active.as_ref().unwrap().exercises[0].sets[0];
        assert!(!set.completed);
        assert!(set.completed_at.is_none());
    }
    Ok(())
}

#[test]
fn test_reorder_drops_unknown_ids() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("A", EquipmentKind::Barbell)?;
    service.add_exercise("B", EquipmentKind::Machine)?;

    let (first, second) = {
        let exercises = &service.active.as_ref().unwrap().exercises;
        (exercises[0].id.clone(), exercises[1].id.clone())
    };

    service.reorder_exercises(&[
        "no-such-id".to_string(),
        second.clone(),
        first.clone(),
    ])?;

    let exercises = &service.active.as_ref().unwrap().exercises;
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0].id, second);
    assert_eq!(exercises[1].id, first);
    Ok(())
}

#[tokio::test]
async fn test_finish_prepends_new_and_replaces_existing_by_id() -> Result<()> {
    let mut service = create_test_service()?;

    service.start_workout(None)?;
    service.add_exercise("Bench", EquipmentKind::Barbell)?;
    service.finish_workout().await?;
    assert_eq!(service.history.len(), 1);
    assert!(service.active.is_none());
    let first_id = service.history[0].id.clone();
    assert!(service.history[0].ended_at.is_some());

    // A second, distinct workout is prepended.
    service.start_workout(None)?;
    service.finish_workout().await?;
    assert_eq!(service.history.len(), 2);
    assert_ne!(service.history[0].id, first_id);
    assert_eq!(service.history[1].id, first_id);

    // Re-finishing an edited entry replaces it in place.
    service.edit_history_entry(&first_id)?;
    service.rename_workout("Edited")?;
    service.finish_workout().await?;
    assert_eq!(service.history.len(), 2);
    assert_eq!(service.history[1].id, first_id);
    assert_eq!(service.history[1].name, "Edited");
    Ok(())
}

#[tokio::test]
async fn test_edit_keeps_end_timestamp_until_refinish() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.finish_workout().await?;
    let id = service.history[0].id.clone();
    let first_end = service.history[0].ended_at;

    service.edit_history_entry(&id)?;
    // Reopening for edit does not clear the prior end timestamp.
    assert_eq!(service.active.as_ref().unwrap().ended_at, first_end);

    service.finish_workout().await?;
    assert!(service.history[0].ended_at >= first_end);
    Ok(())
}

#[test]
fn test_cancel_discards_without_touching_history() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Curl", EquipmentKind::Dumbbell)?;
    service.cancel_workout()?;
    assert!(service.active.is_none());
    assert!(service.history.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_history_entry() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.finish_workout().await?;
    let id = service.history[0].id.clone();

    service.delete_history_entry(&id).await?;
    assert!(service.history.is_empty());
    assert!(service.delete_history_entry(&id).await.is_err());
    Ok(())
}

#[test]
fn test_duplicate_library_names_rejected() -> Result<()> {
    let mut service = create_test_service()?;
    service.create_custom_exercise("Bench Press", EquipmentKind::Barbell)?;
    assert!(service
        .create_custom_exercise("bench press", EquipmentKind::Machine)
        .is_err());
    assert!(service.create_custom_exercise("  ", EquipmentKind::Cable).is_err());
    Ok(())
}

#[test]
fn test_stats_epley_and_volume() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Bench Press", EquipmentKind::Barbell)?;
    service.update_set(0, 0, SetField::Weight, "100")?;
    service.update_set(0, 0, SetField::Reps, "10")?;

    let points = compute_stats(
        &[service.active.clone().unwrap()],
        "Bench Press",
    );
    assert_eq!(points.len(), 1);
    // Epley: round(100 * (1 + 10/30)) = 133.
    assert_eq!(points[0].estimated_1rm, 133);
    assert_eq!(points[0].max_weight, 100.0);
    assert_eq!(points[0].total_volume, 1000.0);
    Ok(())
}

#[test]
fn test_stats_ignores_zero_weight_or_reps() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_workout(None)?;
    service.add_exercise("Bench Press", EquipmentKind::Barbell)?;
    service.update_set(0, 0, SetField::Weight, "80")?;
    service.update_set(0, 0, SetField::Reps, "8")?;
    service.add_set(0)?;
    service.update_set(0, 1, SetField::Reps, "6")?;
    // A zero-rep set and a zero-weight set contribute nothing.
    service.add_set(0)?;
    service.update_set(0, 2, SetField::Reps, "0")?;
    service.add_set(0)?;
    service.update_set(0, 3, SetField::Weight, "")?;

    let points = compute_stats(&[service.active.clone().unwrap()], "Bench Press");
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].total_volume, 640.0 + 480.0);
    assert_eq!(points[0].max_weight, 80.0);
    Ok(())
}

#[test]
fn test_stats_are_input_order_independent() {
    let now = Utc::now();
    let mut older = Workout::new("A", now - Duration::days(7));
    let mut newer = Workout::new("B", now);
    for (workout, weight) in [(&mut older, 60.0), (&mut newer, 70.0)] {
        let mut exercise = ironlog_lib::WorkoutExercise::new("Squat", EquipmentKind::Barbell);
        exercise.sets[0].weight = weight;
        workout.exercises.push(exercise);
    }

    let forward = compute_stats(&[older.clone(), newer.clone()], "Squat");
    let reversed = compute_stats(&[newer, older], "Squat");
    assert_eq!(forward, reversed);
    assert_eq!(forward.len(), 2);
    // Emitted points are ordered by ascending start time either way.
    assert!(forward[0].date < forward[1].date);
    assert_eq!(forward[0].max_weight, 60.0);
}

#[test]
fn test_rest_timer_transitions() {
    let now = Utc::now();
    let mut timer = RestTimer::default();
    assert_eq!(timer.remaining_seconds(now), None);

    timer.start(60, now);
    assert_eq!(timer.remaining_seconds(now), Some(60));
    assert!(!timer.is_expired(now));

    timer.add_time(30);
    assert_eq!(timer.remaining_seconds(now), Some(90));

    // Expiry is wall-clock comparison, clamped at zero.
    let later = now + Duration::seconds(120);
    assert_eq!(timer.remaining_seconds(later), Some(0));
    assert!(timer.is_expired(later));

    timer.end_rest();
    assert_eq!(timer, RestTimer::Idle);

    // add_time on an idle timer stays idle.
    timer.add_time(30);
    assert_eq!(timer, RestTimer::Idle);
}

#[test]
fn test_rest_timer_survives_reload() -> Result<()> {
    let mut service = create_test_service()?;
    service.start_rest(90)?;
    let reopened = LocalStore::new(service.store.root().to_path_buf());
    assert!(matches!(
        reopened.load_rest_timer(),
        RestTimer::Running { .. }
    ));
    service.end_rest()?;
    assert_eq!(reopened.load_rest_timer(), RestTimer::Idle);
    Ok(())
}

#[test]
fn test_heart_rate_zone_bucketing() {
    // Max 200: 100 is exactly 50% (zone 1), 130 is 65% (zone 2),
    // 185 is 92.5% (zone 5), 90 is 45% and falls outside every zone.
    let zones = bucket_heart_rate(&[100, 130, 185, 90], 200);
    assert_eq!(zones, [1, 1, 0, 0, 1]);
    assert_eq!(bucket_heart_rate(&[150], 0), [0, 0, 0, 0, 0]);
}

#[test]
fn test_generated_ids_are_unique() {
    let now = Utc::now();
    let a = ironlog_lib::models::generate_id_at(now);
    let b = ironlog_lib::models::generate_id_at(now);
    assert_ne!(a, b);
    assert!(a.starts_with(&now.timestamp_millis().to_string()));
}
