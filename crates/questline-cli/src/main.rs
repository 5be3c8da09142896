use clap::{Parser, Subcommand};
use questline_core::{Config, CrossTabBus, LearnerSession};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "questline-cli", version, about = "Questline CLI")]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize with the remote content store
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Learner progress
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Lessons
    Lesson {
        #[command(subcommand)]
        action: commands::lesson::LessonAction,
    },
    /// Homework submissions
    Homework {
        #[command(subcommand)]
        action: commands::homework::HomeworkAction,
    },
    /// Daily habits
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Personal goals
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Micro-rewards for questions and stories
    Reward {
        #[command(subcommand)]
        action: commands::reward::RewardAction,
    },
    /// List achievement badges
    Achievements,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUESTLINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Config { action } = command {
        return commands::config::run(action, json);
    }

    let config = Config::load_or_default();
    let bus = CrossTabBus::new();
    let session = LearnerSession::open(&config, &bus)?;

    let result = match command {
        Commands::Sync { action } => commands::sync::run(action, &session, json).await,
        Commands::Progress { action } => commands::progress::run(action, &session, json),
        Commands::Lesson { action } => commands::lesson::run(action, &session, json),
        Commands::Homework { action } => commands::homework::run(action, &session, json),
        Commands::Habit { action } => commands::habit::run(action, &session, json),
        Commands::Goal { action } => commands::goal::run(action, &session, json),
        Commands::Reward { action } => commands::reward::run(action, &session, json),
        Commands::Achievements => commands::achievements::run(&session, json),
        Commands::Config { .. } => Ok(()),
    };

    // Debounced profile saves are flushed here.
    session.shutdown().await;
    result
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|runtime| runtime.block_on(run(cli.command, cli.json)));

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
