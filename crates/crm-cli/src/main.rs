mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    account::AccountSubcommand, activity::ActivitySubcommand, contact::ContactSubcommand,
    deal::DealSubcommand, enroll::EnrollSubcommand, sequence::SequenceSubcommand,
    task::TaskSubcommand, Globals,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "crm",
    about = "Outreach CRM: contacts, sequences, deals and quota from the terminal",
    version,
    propagate_version = true
)]
struct Cli {
    /// CRM root (default: nearest directory above cwd holding .crm/)
    #[arg(long, global = true, env = "CRM_ROOT")]
    root: Option<PathBuf>,

    /// Act as this user instead of the one in .crm/config.yaml
    #[arg(long, global = true, env = "CRM_USER")]
    user: Option<String>,

    /// Pin the clock to an RFC 3339 timestamp
    #[arg(long, global = true, env = "CRM_NOW", hide = true)]
    now: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a CRM in the current directory
    Init {
        /// Grant the session user the team forecast view
        #[arg(long)]
        manager: bool,
    },

    /// Manage accounts
    Account {
        #[command(subcommand)]
        subcommand: AccountSubcommand,
    },

    /// Manage contacts
    Contact {
        #[command(subcommand)]
        subcommand: ContactSubcommand,
    },

    /// Manage sequences and their steps
    Sequence {
        #[command(subcommand)]
        subcommand: SequenceSubcommand,
    },

    /// Enroll contacts in sequences and work their steps
    Enroll {
        #[command(subcommand)]
        subcommand: EnrollSubcommand,
    },

    /// Show sequence steps due today or earlier
    Due,

    /// Manage deals
    Deal {
        #[command(subcommand)]
        subcommand: DealSubcommand,
    },

    /// Commit, best case and funnel against this month's quota
    Quota {
        /// Aggregate across the whole team (managers only)
        #[arg(long)]
        team: bool,
    },

    /// Log and review activities
    Activity {
        #[command(subcommand)]
        subcommand: ActivitySubcommand,
    },

    /// Manage follow-up tasks
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Serve the JSON API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "3141")]
        port: u16,
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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let g = Globals {
        root: root::resolve_root(cli.root.as_deref()),
        user: cli.user,
        now: cli.now,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init { manager } => cmd::init::run(&g, manager),
        Commands::Account { subcommand } => cmd::account::run(&g, subcommand),
        Commands::Contact { subcommand } => cmd::contact::run(&g, subcommand),
        Commands::Sequence { subcommand } => cmd::sequence::run(&g, subcommand),
        Commands::Enroll { subcommand } => cmd::enroll::run(&g, subcommand),
        Commands::Due => cmd::due::run(&g),
        Commands::Deal { subcommand } => cmd::deal::run(&g, subcommand),
        Commands::Quota { team } => cmd::quota::run(&g, team),
        Commands::Activity { subcommand } => cmd::activity::run(&g, subcommand),
        Commands::Task { subcommand } => cmd::task::run(&g, subcommand),
        Commands::Serve { port } => cmd::serve::run(&g, port),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
