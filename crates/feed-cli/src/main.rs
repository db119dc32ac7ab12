mod cmd;
mod context;
mod output;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, incident::IncidentSubcommand, task::TaskSubcommand,
    thread::ThreadSubcommand,
};
use context::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "feed",
    about = "Data catalog activity feed: tasks, suggestions, conversations and incidents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.catalog-feed/config.yaml)
    #[arg(long, global = true, env = "FEED_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog API base URL, overrides api.base_url
    #[arg(long, global = true, env = "FEED_SERVER")]
    server: Option<String>,

    /// Acting user, overrides api.user
    #[arg(long, global = true, env = "FEED_USER")]
    user: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the in-memory reference catalog server
    Serve {
        /// Port to listen on (default: server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Seed YAML with entities, threads, incidents and policies
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Manage tasks and their suggestions
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Conversations, replies and reactions
    Thread {
        #[command(subcommand)]
        subcommand: ThreadSubcommand,
    },

    /// Data quality incidents
    Incident {
        #[command(subcommand)]
        subcommand: IncidentSubcommand,
    },

    /// Inspect and initialize the config file
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
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
        .init();

    let result = Context::load(cli.config.as_deref(), cli.server, cli.user).and_then(|ctx| {
        match cli.command {
            Commands::Serve { port, seed } => cmd::serve::run(&ctx, port, seed),
            Commands::Task { subcommand } => cmd::task::run(&ctx, subcommand, cli.json),
            Commands::Thread { subcommand } => cmd::thread::run(&ctx, subcommand, cli.json),
            Commands::Incident { subcommand } => cmd::incident::run(&ctx, subcommand, cli.json),
            Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        eprintln!("{}", output::error_line(&e));
        std::process::exit(1);
    }
}
