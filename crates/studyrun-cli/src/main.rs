use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "studyrun")]
#[command(about = "studyrun - run block-based participant studies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the study comes from and where session data goes.
#[derive(Args, Clone)]
pub struct StudyArgs {
    /// Directory containing `<study>.toml` or `<study>.json`
    #[arg(long)]
    pub study_dir: PathBuf,

    /// Study identifier (file stem inside the study directory)
    #[arg(long)]
    pub study: String,

    /// Session data directory (defaults to the platform data dir)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.config/studyrun/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new session and answer blocks from a scripted answers file
    Run {
        #[command(flatten)]
        study: StudyArgs,

        /// TOML file mapping block ids to payload tables
        #[arg(long)]
        answers: PathBuf,

        /// Session identifier (a random one is generated if omitted)
        #[arg(long)]
        session: Option<String>,

        /// Exit the session right after this block, leaving progress for `resume`
        #[arg(long)]
        stop_after: Option<String>,
    },
    /// Continue an interrupted session from its saved progress
    Resume {
        #[command(flatten)]
        study: StudyArgs,

        #[arg(long)]
        answers: PathBuf,

        #[arg(long)]
        session: String,
    },
    /// Lint a study definition without running it
    Check {
        #[arg(long)]
        study_dir: PathBuf,

        #[arg(long)]
        study: String,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("studyrun=info,autosave=info,warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Run {
            study,
            answers,
            session,
            stop_after,
        } => commands::run::start(&study, &answers, session, stop_after).await?,
        Commands::Resume {
            study,
            answers,
            session,
        } => commands::run::resume(&study, &answers, &session).await?,
        Commands::Check { study_dir, study } => commands::check::run(&study_dir, &study).await?,
    }

    Ok(())
}
