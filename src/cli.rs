// src/cli.rs
use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about = "A local-first CLI to log workouts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EquipmentKindCli {
    Barbell,
    Dumbbell,
    Cable,
    Bodyweight,
    Machine,
    Warmup,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetFieldCli {
    Weight,
    Reps,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new workout, optionally from a program template
    Start {
        /// Program name or id to pre-populate the workout from
        #[arg(short, long)]
        program: Option<String>,
    },
    /// Add an exercise to the active workout
    AddExercise {
        /// Name of the exercise (e.g., "Bench Press")
        name: String,
        /// Equipment kind
        #[arg(short, long, value_enum, default_value_t = EquipmentKindCli::Barbell)]
        kind: EquipmentKindCli,
    },
    /// Remove an exercise from the active workout by id
    RemoveExercise { id: String },
    /// Append a set to an exercise (1-based index), cloning the last set
    AddSet { exercise: usize },
    /// Update one field of a set (1-based indices). Empty or invalid
    /// numeric input is stored as zero.
    Set {
        exercise: usize,
        set: usize,
        #[arg(short, long, value_enum)]
        field: SetFieldCli,
        #[arg(short, long, default_value = "")]
        value: String,
    },
    /// Toggle a set's completion flag (1-based indices)
    Done { exercise: usize, set: usize },
    /// Reorder the active workout's exercises by id sequence
    Reorder { ids: Vec<String> },
    /// Rename the active workout
    Rename { name: String },
    /// Finish the active workout and move it into history
    Finish,
    /// Discard the active workout without saving it to history
    Cancel,
    /// Copy a history entry back into the active slot for editing
    Edit { id: String },
    /// Delete a workout from history
    DeleteWorkout { id: String },
    /// Show the active workout and rest timer
    Status,
    /// Start the rest timer
    Rest {
        #[arg(default_value_t = 90)]
        seconds: i64,
    },
    /// Extend a running rest timer
    RestAdd { seconds: i64 },
    /// Stop the rest timer
    RestEnd,
    /// List workout history
    History {
        /// Show only the last N workouts
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show per-session statistics for one exercise
    Stats { exercise: String },
    /// Add an exercise to the library
    CreateExercise {
        name: String,
        #[arg(short, long, value_enum, default_value_t = EquipmentKindCli::Barbell)]
        kind: EquipmentKindCli,
    },
    /// Rename a library exercise (programs keep the old name)
    RenameExercise { id: String, name: String },
    /// Delete a library exercise
    DeleteExercise { id: String },
    /// List the exercise library
    ListExercises,
    /// Create a program from a comma-separated exercise list
    CreateProgram {
        name: String,
        /// Ordered exercise names, e.g. "Squat,Bench Press,Row"
        #[arg(short, long, value_delimiter = ',')]
        exercises: Vec<String>,
    },
    /// Delete a program
    DeleteProgram { id: String },
    /// List programs
    ListPrograms,
    /// Reconcile local collections with the configured remote store
    Sync,
    /// Connect the third-party fitness service. Without --code, prints
    /// the authorize URL to visit.
    Connect {
        /// The code query parameter from the OAuth redirect
        #[arg(long)]
        code: Option<String>,
    },
    /// Disconnect the third-party fitness service
    Disconnect,
    /// List recent activities recorded with the fitness service
    Activities,
    /// Heart-rate zone breakdown for one provider activity
    Zones {
        activity_id: u64,
        #[arg(long, default_value_t = 190)]
        max_hr: u32,
    },
    /// Show the path to the local data directory
    DataPath,
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// Function to parse CLI arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> Command {
    Cli::command()
}
