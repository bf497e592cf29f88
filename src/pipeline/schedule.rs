//! Cron trigger for the runner.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::{AppError, Result};
use crate::pipeline::run::{RunOutcome, Runner};

/// Accept 5-field cron (minute first) by prepending a zero seconds field.
///
/// Six and seven field expressions pass through unchanged.
pub fn normalize_cron(expr: &str) -> Result<String> {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => Err(AppError::schedule(format!(
            "expected 5 or 6 cron fields in '{}', found {}",
            expr.trim(),
            n
        ))),
    }
}

/// Calls `Runner::run_once` on a cron cadence.
pub struct Scheduler {
    inner: JobScheduler,
    expression: String,
}

impl Scheduler {
    /// Register the run job. Nothing fires until [`Scheduler::start`].
    pub async fn new(runner: Arc<Runner>, schedule: &str) -> Result<Self> {
        let expression = normalize_cron(schedule)?;
        let inner = JobScheduler::new().await.map_err(AppError::schedule)?;

        let job = Job::new_async(expression.as_str(), move |_uuid, _lock| {
            let runner = Arc::clone(&runner);
            Box::pin(async move {
                match runner.run_once().await {
                    Ok(RunOutcome::Completed(report)) => {
                        log::debug!(
                            "Scheduled run finished: {} new of {} scraped",
                            report.new_titles.len(),
                            report.scraped
                        );
                    }
                    Ok(RunOutcome::Skipped) => {}
                    Err(error) => log::error!("Scheduled run failed: {}", error),
                }
            })
        })
        .map_err(|e| AppError::schedule(format!("invalid schedule '{expression}': {e}")))?;

        inner.add(job).await.map_err(AppError::schedule)?;

        Ok(Self { inner, expression })
    }

    pub async fn start(&self) -> Result<()> {
        self.inner.start().await.map_err(AppError::schedule)?;
        log::info!("Scheduler started with cron '{}' (UTC)", self.expression);
        Ok(())
    }

    /// Start, then block until Ctrl-C and shut down.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        self.start().await?;

        tokio::signal::ctrl_c().await?;
        log::info!("Shutdown requested, stopping scheduler");

        self.inner.shutdown().await.map_err(AppError::schedule)?;
        Ok(())
    }
}
