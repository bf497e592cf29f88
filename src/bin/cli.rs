//! YTS watcher CLI
//!
//! Runs the scrape pipeline once, or keeps it running on a cron schedule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use yts_watcher::{
    error::Result,
    models::{Config, Movie},
    notifiers::Notifiers,
    pipeline::{Runner, Scheduler, normalize_cron},
    storage::{HistoryStore, LocalHistoryStore},
};

/// Entries shown by `info`.
const RECENT_LIMIT: usize = 10;

/// yts-watcher - YTS new movie notifier
#[derive(Parser, Debug)]
#[command(
    name = "yts-watcher",
    version,
    about = "Polls YTS listing pages and notifies once per new movie"
)]
struct Cli {
    /// Path to the TOML config file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once and exit
    Run,

    /// Run the pipeline on the configured schedule until Ctrl-C
    Serve {
        /// Run once immediately before waiting for the first tick
        #[arg(long)]
        run_now: bool,
    },

    /// Validate the configuration
    Validate,

    /// Show history file info
    Info,
}

/// Initialize logging; `--verbose` wins over the configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    let ignored = config.apply_env_overrides();
    init_logging(cli.verbose, &config.logging.level);
    for message in ignored {
        log::warn!("{}", message);
    }

    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::info!("No config at {}, using defaults", cli.config.display());
    }

    match cli.command {
        Command::Run => {
            config.validate()?;
            let runner = Runner::from_config(Arc::new(config))?;

            if let Err(e) = runner.run_once().await {
                if e.is_persistence_failure() {
                    log::error!("History could not be saved; no notifications were sent");
                }
                return Err(e);
            }
        }

        Command::Serve { run_now } => {
            config.validate()?;
            let schedule = config.schedule.clone();
            let runner = Arc::new(Runner::from_config(Arc::new(config))?);
            let scheduler = Scheduler::new(Arc::clone(&runner), &schedule).await?;

            if run_now {
                log::info!("Running once before the first scheduled tick");
                if let Err(e) = runner.run_once().await {
                    log::error!("Initial run failed: {}", e);
                }
            }

            scheduler.run_until_shutdown().await?;
            log::info!("Scheduler stopped");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            log::info!(
                "Schedule: {} (normalized: {})",
                config.schedule,
                normalize_cron(&config.schedule)?
            );
            log::info!("Request timeout: {}s", config.http.request_timeout_secs);
            log::info!("Sources ({}):", config.sources.len());
            for source in &config.sources {
                log::info!("  {}", source);
            }
            let notifiers = Notifiers::from_config(&config)?;
            if notifiers.is_empty() {
                log::warn!("No notifiers enabled; new movies will only be logged");
            } else {
                log::info!("Notifiers: {}", notifiers.names().join(", "));
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = LocalHistoryStore::from_config(&config.storage);
            let path = config.storage.history_path();
            log::info!("History file: {}", path.display());

            if !path.exists() {
                log::info!("No history found yet.");
                return Ok(());
            }

            let history = store.read().await?;
            log::info!("Known movies: {}", history.len());

            let mut recent: Vec<&Movie> = history.values().collect();
            recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
            for movie in recent.into_iter().take(RECENT_LIMIT) {
                log::info!("  {}", movie.format("{timestamp}  {title} ({year})"));
            }
        }
    }

    log::info!("Done!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_run_now() {
        let cli =
            Cli::try_parse_from(["yts-watcher", "-c", "/etc/yts.toml", "serve", "--run-now"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/yts.toml"));
        assert!(matches!(cli.command, Command::Serve { run_now: true }));
    }

    #[test]
    fn test_parse_defaults() {
        let cli = Cli::try_parse_from(["yts-watcher", "run"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.toml"));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Command::Run));
    }
}
