use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use limbu_core::{aggregate_month, business_insights, MonthKey};
use limbu_ledger::{export_history_csv, write_history_csv, JsonFileStore, RecordStore};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod entry_cmd;
mod llm;
mod render;
mod state;
mod tui;

use config::Config;
use llm::{LlmClient, Provider};
use state::Paths;

#[derive(Parser, Debug)]
#[command(
    name = "limbu",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LIMBU_BUILD_SHA"), ")"),
    about = "Daily sales, costs and profit for a lemonade and snack stall"
)]
struct Cli {
    /// Data directory (default: ~/.limbu)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Debug logging to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a day's sales and costs, or edit an existing entry
    Entry(entry_cmd::EntryArgs),

    /// Monthly overview: totals, daily sales vs profit, snack performance
    Dashboard {
        /// Month as YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<MonthKey>,
    },

    /// List saved entries, newest first
    History {
        #[arg(long)]
        month: Option<MonthKey>,

        /// Show at most this many entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Delete one entry by id or unique id prefix
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Delete every saved entry
    Clear {
        #[arg(long)]
        yes: bool,
    },

    /// Ask the configured model for a short business analysis of a month
    Insights {
        #[arg(long)]
        month: Option<MonthKey>,
    },

    /// Write the history as CSV (stdout unless --csv is given)
    Export {
        #[arg(long)]
        csv: Option<PathBuf>,

        #[arg(long)]
        month: Option<MonthKey>,
    },

    /// Full-screen app with Entry, Dashboard and History views
    Tui,

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// API credentials for the insight model
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config.toml if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste an API key and save it under the data directory
    PasteApiKey {
        #[arg(long, value_enum, default_value_t = Provider::Gemini)]
        provider: Provider,
    },
}

/// Stderr for commands; a file for the TUI so logs don't tear the screen.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_target(false)
                .init();
        }
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush().ok();
    let mut s = String::new();
    io::stdin().read_line(&mut s)?;
    Ok(matches!(s.trim(), "y" | "Y" | "yes"))
}

fn month_or_current(cfg: &Config, month: Option<MonthKey>) -> Result<MonthKey> {
    match month {
        Some(m) => Ok(m),
        None => cfg.current_month(),
    }
}

fn open_store(cfg: &Config, paths: &Paths) -> Result<JsonFileStore> {
    let path = cfg.store_path(paths);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    debug!(path = %path.display(), "record store");
    Ok(JsonFileStore::new(path))
}

fn llm_client(cfg: &Config, paths: &Paths) -> LlmClient {
    let auth = auth::load_auth_or_default(paths);
    LlmClient::new(&cfg.llm, auth.api_key(cfg.llm.provider))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = Paths::resolve(cli.home)?;

    let tui_log = match cli.command {
        Command::Tui => {
            paths.ensure_home()?;
            Some(paths.log_path())
        }
        _ => None,
    };
    init_logging(cli.verbose, tui_log.as_deref())?;

    let cfg = config::load_config(&paths)?;

    match cli.command {
        Command::Entry(args) => {
            let mut store = open_store(&cfg, &paths)?;
            entry_cmd::run_entry(&cfg, &mut store, &args)?;
        }

        Command::Dashboard { month } => {
            let month = month_or_current(&cfg, month)?;
            let store = open_store(&cfg, &paths)?;
            let report = aggregate_month(&store.list(), month);
            print!("{}", render::render_dashboard(&report, &cfg.stall.currency));
        }

        Command::History { month, limit } => {
            let store = open_store(&cfg, &paths)?;
            let mut records = store.list();
            if let Some(m) = month {
                records.retain(|r| m.contains(r.date));
            }
            print!("{}", render::render_history(&records, &cfg.stall.currency, limit));
        }

        Command::Delete { id, yes } => {
            let mut store = open_store(&cfg, &paths)?;
            let record = entry_cmd::resolve_id(&store.list(), &id)?;
            if !yes && !confirm(&format!("Delete entry for {}?", record.date))? {
                println!("Cancelled.");
                return Ok(());
            }
            if store.remove_by_id(&record.id)? {
                println!("Deleted entry for {}.", record.date);
            }
        }

        Command::Clear { yes } => {
            let mut store = open_store(&cfg, &paths)?;
            let n = store.list().len();
            if !yes && !confirm(&format!("Delete all {n} entries?"))? {
                println!("Cancelled.");
                return Ok(());
            }
            store.clear()?;
            println!("Cleared {n} entries.");
        }

        Command::Insights { month } => {
            let month = month_or_current(&cfg, month)?;
            let store = open_store(&cfg, &paths)?;
            let client = llm_client(&cfg, &paths);
            println!("# AI business insights: {}\n", month.label());
            println!(
                "{}",
                business_insights(&client, &store.list(), month, &cfg.stall.currency)
            );
        }

        Command::Export { csv, month } => {
            let store = open_store(&cfg, &paths)?;
            let records = store.list();
            match csv {
                Some(path) => {
                    let n = export_history_csv(&path, &records, month)?;
                    println!("Wrote {n} rows to {}", path.display());
                }
                None => {
                    write_history_csv(io::stdout().lock(), &records, month)?;
                }
            }
        }

        Command::Tui => {
            let mut store = open_store(&cfg, &paths)?;
            let client = llm_client(&cfg, &paths);
            tui::run_tui(&cfg, &mut store, &client)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(&paths)?,
            ConfigCommand::Show => config::show_config(&paths)?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteApiKey { provider } => auth::paste_api_key(&paths, provider)?,
        },
    }

    Ok(())
}
