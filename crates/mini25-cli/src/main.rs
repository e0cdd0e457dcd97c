use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod audio;
mod commands;
mod prompt;

#[derive(Parser)]
#[command(name = "mini25", version, about = "Mini25: your little bubble of focus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the focus timer with ambient music
    Focus(commands::focus::FocusArgs),
    /// Show today/week counts and the last 7 days
    Dashboard {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Focus history management
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// List the ambient track catalog
    Tracks,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("MINI25_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Focus(args) => commands::focus::run(args),
        Commands::Dashboard { json } => commands::dashboard::run(json),
        Commands::History { action } => commands::history::run(action),
        Commands::Tracks => commands::tracks::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
