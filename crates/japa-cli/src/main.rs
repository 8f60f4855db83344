use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "japa", version, about = "Japa tap counter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one or more japas
    Tap {
        /// Number of japas to record
        #[arg(short, long, default_value = "1")]
        count: u64,
    },
    /// Print today's counters, streak and achievements
    Status,
    /// Dismiss the pending milestone message
    Ack,
    /// Clear all counters, history and achievements
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Daily history and calendar views
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Display preferences
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Sign in to or out of the shared leaderboard
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Push or pull the remote record
    Sync {
        #[command(subcommand)]
        action: commands::sync::SyncAction,
    },
    /// Community standings
    Leaderboard {
        /// Keep printing changes until interrupted
        #[arg(long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("JAPA_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Tap { count } => commands::counter::tap(count).await,
        Commands::Status => commands::counter::status(),
        Commands::Ack => commands::counter::ack(),
        Commands::Reset { yes } => commands::counter::reset(yes),
        Commands::History { action } => commands::history::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Auth { action } => commands::auth::run(action).await,
        Commands::Sync { action } => commands::sync::run(action).await,
        Commands::Leaderboard { watch } => commands::leaderboard::run(watch).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
