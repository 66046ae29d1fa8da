mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, manual::ManualSubcommand, progress::ProgressSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relish",
    about = "Family operating manuals: layer baselines, milestones, and onboarding progress",
    version,
    propagate_version = true
)]
struct Cli {
    /// Family root (default: auto-detect from .relish/)
    #[arg(long, global = true, env = "RELISH_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Relish in the current directory
    Init {
        /// Family id (default: derived from the directory name)
        #[arg(long)]
        family: Option<String>,
        /// Family display name
        #[arg(long)]
        name: Option<String>,
    },

    /// Create, edit and inspect manuals
    Manual {
        #[command(subcommand)]
        subcommand: ManualSubcommand,
    },

    /// Evaluate layer baselines for a manual
    Evaluate {
        manual: String,
        /// Only this layer (name or number, e.g. triggers or 1)
        #[arg(long)]
        layer: Option<String>,
    },

    /// Track a manual's onboarding journey
    Progress {
        #[command(subcommand)]
        subcommand: ProgressSubcommand,
    },

    /// Show where onboarding should go next for a manual
    Next { manual: String },

    /// Show which focus domains a manual's baselines unlock
    Domains { manual: String },

    /// Inspect and validate the family configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { family, name } => {
            cmd::init::run(&root, family.as_deref(), name.as_deref())
        }
        Commands::Manual { subcommand } => cmd::manual::run(&root, subcommand, cli.json),
        Commands::Evaluate { manual, layer } => {
            cmd::evaluate::run(&root, &manual, layer.as_deref(), cli.json)
        }
        Commands::Progress { subcommand } => cmd::progress::run(&root, subcommand, cli.json),
        Commands::Next { manual } => cmd::next::run(&root, &manual, cli.json),
        Commands::Domains { manual } => cmd::domains::run(&root, &manual, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
