mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    alerts::AlertSubcommand, config::ConfigSubcommand, docs::DocSubcommand,
    events::EventsArgs, milestone::MilestoneSubcommand, moves::MoveSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "movetrack",
    about = "Relocation milestone tracker: moves, milestones, SLAs, and alerts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .movetrack/)
    #[arg(long, global = true, env = "MOVETRACK_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Who is making the change; recorded on audit events
    #[arg(long, global = true, env = "MOVETRACK_ACTOR")]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize movetrack in the current project
    Init,

    /// Create, list and inspect moves
    Move {
        #[command(subcommand)]
        subcommand: MoveSubcommand,
    },

    /// Plan and complete milestones
    Milestone {
        #[command(subcommand)]
        subcommand: MilestoneSubcommand,
    },

    /// Show the milestone timeline of a move
    Timeline {
        /// Move id or number (e.g. MV-000001)
        #[arg(value_name = "MOVE")]
        key: String,
    },

    /// Show SLA compliance for a move
    Sla {
        #[arg(value_name = "MOVE")]
        key: String,
    },

    /// Show the audit history of a move, newest first
    Events(EventsArgs),

    /// List, evaluate, resolve and acknowledge alerts
    Alerts {
        #[command(subcommand)]
        subcommand: AlertSubcommand,
    },

    /// Evaluate every open move and raise alerts for delayed milestones
    Sweep,

    /// Register and list documents in the local document registry
    Doc {
        #[command(subcommand)]
        subcommand: DocSubcommand,
    },

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (default: server.port from config)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let actor = cli.actor.as_deref();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Move { subcommand } => cmd::moves::run(&root, subcommand, actor, cli.json),
        Commands::Milestone { subcommand } => {
            cmd::milestone::run(&root, subcommand, actor, cli.json)
        }
        Commands::Timeline { key } => cmd::moves::timeline(&root, &key, cli.json),
        Commands::Sla { key } => cmd::moves::sla(&root, &key, cli.json),
        Commands::Events(args) => cmd::events::run(&root, args, cli.json),
        Commands::Alerts { subcommand } => cmd::alerts::run(&root, subcommand, actor, cli.json),
        Commands::Sweep => cmd::alerts::sweep(&root, cli.json),
        Commands::Doc { subcommand } => cmd::docs::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Serve { port } => cmd::serve::run(&root, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
