use std::path::PathBuf;

use chrono::Local;
use clap::Subcommand;
use mini25_core::{Config, CoreError, ImportOutcome};

use super::open_history;
use crate::prompt::StdinConfirm;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List sessions, newest first
    List {
        /// Print raw entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a completed focus session by hand
    Add {
        /// Task name (defaults to the configured label)
        task: Option<String>,
    },
    /// Write the history to mini25_history.json
    Export {
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Replace the history with an exported .json file
    Import {
        file: PathBuf,
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
    /// Delete every recorded session
    Clear {
        /// Do not ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut history = open_history(&config);

    match action {
        HistoryAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(history.entries())?);
            } else if history.is_empty() {
                println!("Let's get the first session done!");
            } else {
                for entry in history.recent() {
                    let when = entry
                        .completed_at_in(&Local)
                        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "unknown time".into());
                    println!("{when}  {}", entry.display_name());
                }
            }
        }
        HistoryAction::Add { task } => {
            let entry = history.append(task.as_deref().unwrap_or(""));
            println!("{}", serde_json::to_string_pretty(entry)?);
        }
        HistoryAction::Export { out } => match history.export_to(&out) {
            Ok(path) => println!("History exported to {}", path.display()),
            Err(CoreError::EmptyExport) => eprintln!("{}", CoreError::EmptyExport),
            Err(e) => return Err(e.into()),
        },
        HistoryAction::Import { file, yes } => {
            if file.extension().and_then(|ext| ext.to_str()) != Some("json") {
                return Err(format!("expected a .json file, got {}", file.display()).into());
            }
            let text = std::fs::read_to_string(&file)?;
            match history.import_all(&text, &mut StdinConfirm::new(yes)) {
                Ok(ImportOutcome::Replaced { count }) => {
                    println!("History imported successfully! ({count} sessions)");
                }
                Ok(ImportOutcome::Cancelled) => println!("Import cancelled."),
                Err(e @ CoreError::MalformedImport { .. }) => {
                    eprintln!("Looks like that file is not in the right format.");
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        HistoryAction::Clear { yes } => {
            if history.clear(&mut StdinConfirm::new(yes)) {
                println!("History cleared.");
            } else {
                println!("Nothing was deleted.");
            }
        }
    }
    Ok(())
}
