//! Pipeline entry points for the watcher.
//!
//! - `Runner::run_once`: one scrape → diff → persist → notify run
//! - `Scheduler`: triggers runs on a cron cadence

pub mod diff;
pub mod run;
pub mod schedule;

pub use diff::diff_history;
pub use run::{RunOutcome, RunPhase, RunReport, Runner};
pub use schedule::{Scheduler, normalize_cron};
