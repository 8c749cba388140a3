// src/main.rs
mod cli;

use anyhow::{bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use std::io::stdout;

use ironlog_lib::{
    bucket_heart_rate, AppService, EquipmentKind, SetField, Workout,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // --- Check for completion generation request FIRST ---
    let cli_args = cli::parse_args();
    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service =
        AppService::initialize().context("Failed to initialize application service")?;

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }

        // --- Active workout ---
        cli::Commands::Start { program } => {
            service.start_workout(program.as_deref())?;
            if let Some(active) = &service.active {
                println!(
                    "Started workout '{}' with {} exercise(s).",
                    active.name,
                    active.exercises.len()
                );
            }
        }
        cli::Commands::AddExercise { name, kind } => {
            require_active(&service)?;
            service.add_exercise(&name, cli_kind_to_kind(kind))?;
            println!("Added '{}' ({}).", name.trim(), cli_kind_to_kind(kind));
        }
        cli::Commands::RemoveExercise { id } => {
            require_active(&service)?;
            service.remove_exercise(&id)?;
            println!("Removed exercise {id} (if present).");
        }
        cli::Commands::AddSet { exercise } => {
            require_active(&service)?;
            let index = to_index(exercise, "Exercise")?;
            service.add_set(index)?;
            println!("Added a set to exercise {exercise}.");
        }
        cli::Commands::Set {
            exercise,
            set,
            field,
            value,
        } => {
            require_active(&service)?;
            let ex_index = to_index(exercise, "Exercise")?;
            let set_index = to_index(set, "Set")?;
            let field = match field {
                cli::SetFieldCli::Weight => SetField::Weight,
                cli::SetFieldCli::Reps => SetField::Reps,
            };
            service.update_set(ex_index, set_index, field, &value)?;
            println!("Updated set {set} of exercise {exercise}.");
        }
        cli::Commands::Done { exercise, set } => {
            require_active(&service)?;
            let ex_index = to_index(exercise, "Exercise")?;
            let set_index = to_index(set, "Set")?;
            service.toggle_set_complete(ex_index, set_index)?;
            println!("Toggled set {set} of exercise {exercise}.");
        }
        cli::Commands::Reorder { ids } => {
            require_active(&service)?;
            service.reorder_exercises(&ids)?;
            println!("Reordered exercises.");
        }
        cli::Commands::Rename { name } => {
            require_active(&service)?;
            service.rename_workout(&name)?;
            println!("Renamed active workout to '{name}'.");
        }
        cli::Commands::Finish => {
            require_active(&service)?;
            let name = service
                .active
                .as_ref()
                .map(|w| w.name.clone())
                .unwrap_or_default();
            service.finish_workout().await?;
            println!("Finished '{name}'. History now holds {} workout(s).", service.history.len());
        }
        cli::Commands::Cancel => {
            require_active(&service)?;
            service.cancel_workout()?;
            println!("Discarded the active workout.");
        }
        cli::Commands::Edit { id } => {
            service.edit_history_entry(&id)?;
            println!("Workout {id} copied into the active slot for editing.");
        }
        cli::Commands::DeleteWorkout { id } => {
            service.delete_history_entry(&id).await?;
            println!("Deleted workout {id} from history.");
        }
        cli::Commands::Status => print_status(&service),

        // --- Rest timer ---
        cli::Commands::Rest { seconds } => {
            service.start_rest(seconds)?;
            println!("Resting for {seconds}s.");
        }
        cli::Commands::RestAdd { seconds } => {
            service.add_rest_time(seconds)?;
            match service.rest_remaining_seconds() {
                Some(left) => println!("Rest extended; {left}s remaining."),
                None => println!("No rest timer running."),
            }
        }
        cli::Commands::RestEnd => {
            service.end_rest()?;
            println!("Rest ended.");
        }

        // --- Listings ---
        cli::Commands::History { limit } => print_history(&service.history, limit),
        cli::Commands::Stats { exercise } => print_stats(&service, &exercise),
        cli::Commands::ListExercises => print_exercises(&service),
        cli::Commands::ListPrograms => print_programs(&service),

        // --- Library / programs ---
        cli::Commands::CreateExercise { name, kind } => {
            let id = service.create_custom_exercise(&name, cli_kind_to_kind(kind))?;
            println!("Added '{}' to the library (id: {id}).", name.trim());
        }
        cli::Commands::RenameExercise { id, name } => {
            service.rename_custom_exercise(&id, &name)?;
            println!("Renamed exercise {id} to '{}'.", name.trim());
            println!("Note: programs referencing the old name keep it.");
        }
        cli::Commands::DeleteExercise { id } => {
            service.delete_custom_exercise(&id).await?;
            println!("Deleted exercise {id} from the library.");
        }
        cli::Commands::CreateProgram { name, exercises } => {
            let id = service.create_program(&name, exercises)?;
            println!("Created program '{}' (id: {id}).", name.trim());
        }
        cli::Commands::DeleteProgram { id } => {
            service.delete_program(&id).await?;
            println!("Deleted program {id}.");
        }

        // --- Sync & provider ---
        cli::Commands::Sync => {
            let session = service.sync_session()?;
            service.sync_all(&session).await?;
            println!(
                "Sync complete: {} workout(s), {} program(s), {} exercise(s).",
                service.history.len(),
                service.programs.len(),
                service.exercises.len()
            );
        }
        cli::Commands::Connect { code } => match code {
            Some(code) => {
                let link = service.connect_provider(&code).await?;
                println!("Connected '{}' (token valid until {}).", link.provider, link.expires_at);
            }
            None => {
                let url = service.provider_client().authorize_url()?;
                println!("Visit the following URL to authorize, then re-run with --code:");
                println!("{url}");
            }
        },
        cli::Commands::Disconnect => {
            service.disconnect_provider()?;
            println!("Fitness service disconnected.");
        }
        cli::Commands::Activities => {
            let token = service.provider_access_token().await?;
            let activities = service.provider_client().list_activities(&token).await?;
            print_activities(&activities);
        }
        cli::Commands::Zones { activity_id, max_hr } => {
            let token = service.provider_access_token().await?;
            let samples = service
                .provider_client()
                .heart_rate_stream(&token, activity_id)
                .await?;
            print_zones(&samples, max_hr);
        }

        cli::Commands::DataPath => {
            println!("{}", service.store.root().display());
        }
    }

    Ok(())
}

fn cli_kind_to_kind(kind: cli::EquipmentKindCli) -> EquipmentKind {
    match kind {
        cli::EquipmentKindCli::Barbell => EquipmentKind::Barbell,
        cli::EquipmentKindCli::Dumbbell => EquipmentKind::Dumbbell,
        cli::EquipmentKindCli::Cable => EquipmentKind::Cable,
        cli::EquipmentKindCli::Bodyweight => EquipmentKind::Bodyweight,
        cli::EquipmentKindCli::Machine => EquipmentKind::Machine,
        cli::EquipmentKindCli::Warmup => EquipmentKind::Warmup,
    }
}

fn require_active(service: &AppService) -> Result<()> {
    if service.active.is_none() {
        bail!("No active workout. Start one with 'ironlog start'.");
    }
    Ok(())
}

// CLI indices are 1-based; the library is 0-based.
fn to_index(value: usize, what: &str) -> Result<usize> {
    value
        .checked_sub(1)
        .ok_or_else(|| anyhow::anyhow!("{what} index must be >= 1."))
}

fn print_status(service: &AppService) {
    match &service.active {
        None => println!("No active workout."),
        Some(active) => {
            println!("Active workout: '{}' ({})", active.name, active.display_date);
            for (ex_idx, exercise) in active.exercises.iter().enumerate() {
                println!(
                    "{}. {} [{}] (id {})",
                    ex_idx + 1,
                    exercise.name,
                    exercise.kind,
                    exercise.id
                );
                for (set_idx, set) in exercise.sets.iter().enumerate() {
                    let mark = if set.completed { "x" } else { " " };
                    println!(
                        "   [{mark}] set {}: {}kg x {}",
                        set_idx + 1,
                        set.weight,
                        set.reps
                    );
                }
            }
        }
    }
    match service.rest_remaining_seconds() {
        Some(0) => println!("Rest timer: done."),
        Some(left) => println!("Rest timer: {left}s remaining."),
        None => {}
    }
}

fn print_history(history: &[Workout], limit: usize) {
    if history.is_empty() {
        println!("No workouts logged yet.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Date", "Name", "Exercises", "Sets"]);
    for workout in history.iter().take(limit) {
        let sets: usize = workout.exercises.iter().map(|e| e.sets.len()).sum();
        table.add_row(vec![
            Cell::new(&workout.id),
            Cell::new(&workout.display_date),
            Cell::new(&workout.name),
            Cell::new(workout.exercises.len()),
            Cell::new(sets),
        ]);
    }
    println!("{table}");
}

fn print_stats(service: &AppService, exercise: &str) {
    let points = service.exercise_stats(exercise);
    if points.is_empty() {
        println!("No logged sets found for '{exercise}'.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Date", "Max weight", "Est. 1RM", "Volume"]);
    for point in points {
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d")),
            Cell::new(format!("{:.1}", point.max_weight)),
            Cell::new(point.estimated_1rm),
            Cell::new(format!("{:.0}", point.total_volume)),
        ]);
    }
    println!("{table}");
}

fn print_exercises(service: &AppService) {
    if service.exercises.is_empty() {
        println!("The exercise library is empty.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["ID", "Name", "Kind"]);
    for exercise in &service.exercises {
        table.add_row(vec![
            Cell::new(&exercise.id),
            Cell::new(&exercise.name),
            Cell::new(exercise.kind),
        ]);
    }
    println!("{table}");
}

fn print_programs(service: &AppService) {
    if service.programs.is_empty() {
        println!("No programs defined.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Name", "Exercises"]);
    for program in &service.programs {
        table.add_row(vec![
            Cell::new(&program.id),
            Cell::new(&program.name),
            Cell::new(program.exercise_names.join(", ")),
        ]);
    }
    println!("{table}");
}

fn print_activities(activities: &[ironlog_lib::ProviderActivity]) {
    if activities.is_empty() {
        println!("No recorded activities found.");
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Date", "Name", "Duration"]);
    for activity in activities {
        let minutes = activity.elapsed_time / 60;
        table.add_row(vec![
            Cell::new(activity.id),
            Cell::new(activity.start_date.format("%Y-%m-%d %H:%M")),
            Cell::new(&activity.name),
            Cell::new(format!("{minutes} min")),
        ]);
    }
    println!("{table}");
}

fn print_zones(samples: &[u32], max_hr: u32) {
    let zones = bucket_heart_rate(samples, max_hr);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Zone", "Range", "Seconds"]);
    let bounds = ["50-60%", "60-70%", "70-80%", "80-90%", "90%+"];
    for (i, (range, seconds)) in bounds.iter().zip(zones.iter()).enumerate() {
        table.add_row(vec![
            Cell::new(format!("Z{}", i + 1)),
            Cell::new(range),
            Cell::new(seconds),
        ]);
    }
    println!("{table}");
}
