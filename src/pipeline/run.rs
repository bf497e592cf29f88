// src/pipeline/run.rs

//! One scheduled scrape → diff → persist → notify run.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{Config, Movies};
use crate::notifiers::{Notifiers, NotifyReport};
use crate::pipeline::diff::diff_history;
use crate::services::{Fetcher, MovieScraper};
use crate::storage::{HistoryStore, LocalHistoryStore, merge_history};

/// Phase of a run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Diffing,
    Persisting,
    Notifying,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Fetching => "fetching",
            RunPhase::Diffing => "diffing",
            RunPhase::Persisting => "persisting",
            RunPhase::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Movies scraped across all sources, after per-title dedup
    pub scraped: usize,
    /// Titles reported as new, in title order
    pub new_titles: Vec<String>,
    /// History size after the merge
    pub history_size: usize,
    pub notified: NotifyReport,
}

/// Result of a trigger.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run was still in progress; this trigger was dropped.
    Skipped,
}

/// Runs the pipeline, at most one run at a time.
pub struct Runner {
    config: Arc<Config>,
    fetcher: Box<dyn Fetcher>,
    store: Box<dyn HistoryStore>,
    notifiers: Notifiers,
    in_flight: Mutex<()>,
}

impl Runner {
    pub fn new(
        config: Arc<Config>,
        fetcher: Box<dyn Fetcher>,
        store: Box<dyn HistoryStore>,
        notifiers: Notifiers,
    ) -> Self {
        Self {
            config,
            fetcher,
            store,
            notifiers,
            in_flight: Mutex::new(()),
        }
    }

    /// Wire the HTTP scraper, local history file and configured notifiers.
    pub fn from_config(config: Arc<Config>) -> Result<Self> {
        let fetcher = MovieScraper::new(&config)?;
        let store = LocalHistoryStore::from_config(&config.storage);
        let notifiers = Notifiers::from_config(&config)?;
        Ok(Self::new(
            config,
            Box::new(fetcher),
            Box::new(store),
            notifiers,
        ))
    }

    /// Execute one run unless another is in progress.
    ///
    /// Fails only when the merged history could not be saved; in that case
    /// notification is skipped so the same titles are not announced twice.
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            log::warn!("Previous run still in progress, dropping this trigger");
            return Ok(RunOutcome::Skipped);
        };

        log::info!("[Start] Scraper task");
        let result = self.run_phases().await;
        if let Err(error) = &result {
            log::error!("Run failed: {}", error);
        }
        log::info!("[End] Scraper task");

        result.map(RunOutcome::Completed)
    }

    async fn run_phases(&self) -> Result<RunReport> {
        let started_at = Utc::now();

        enter(RunPhase::Fetching);
        let batch = self
            .fetcher
            .fetch(&self.config.sources, self.config.http.request_timeout())
            .await;
        if batch.is_empty() {
            log::warn!(
                "Scraped 0 movies from {} sources; every source failed or listed nothing",
                self.config.sources.len()
            );
        } else {
            log::info!("Scraped {} movies", batch.len());
        }

        enter(RunPhase::Diffing);
        let history = self.store.load().await;
        let diff = diff_history(&batch, &history);
        log::info!("Found {} new movies", diff.len());

        enter(RunPhase::Persisting);
        let history = merge_history(&diff, &history);
        if let Err(error) = self.store.save(&history).await {
            log::error!(
                "History not persisted to {}, skipping notification for {} new movies",
                self.store.location(),
                diff.len()
            );
            return Err(error);
        }
        log::info!(
            "Saved {} movies to {}",
            history.len(),
            self.store.location()
        );

        enter(RunPhase::Notifying);
        let notified = self.notify(&diff).await;

        enter(RunPhase::Idle);
        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            scraped: batch.len(),
            new_titles: diff.into_keys().collect(),
            history_size: history.len(),
            notified,
        })
    }

    async fn notify(&self, diff: &Movies) -> NotifyReport {
        if diff.is_empty() {
            log::info!("No new movies, nothing to notify");
            return NotifyReport::default();
        }

        let report = self.notifiers.dispatch(diff).await;
        if !report.all_delivered() {
            log::warn!(
                "Notification failed for {}; movies stay recorded as seen",
                report.failed.join(", ")
            );
        }
        report
    }
}

fn enter(phase: RunPhase) {
    log::debug!("Run phase: {}", phase);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::Movie;
    use crate::notifiers::Notifier;

    fn movies(titles: &[&str]) -> Movies {
        titles
            .iter()
            .map(|t| (t.to_string(), Movie::new(*t, "2024", "", "", Utc::now())))
            .collect()
    }

    struct StubFetcher {
        batch: Movies,
        delay: Duration,
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, _urls: &[String], _timeout: Duration) -> Movies {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.batch.clone()
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        data: Arc<StdMutex<Option<Movies>>>,
        corrupt: bool,
        fail_save: bool,
    }

    #[async_trait]
    impl HistoryStore for MemoryStore {
        async fn read(&self) -> Result<Movies> {
            if self.corrupt {
                return Err(AppError::HistoryLoad {
                    path: "memory".into(),
                    message: "unexpected end of input".into(),
                });
            }
            Ok(self.data.lock().unwrap().clone().unwrap_or_default())
        }

        async fn save(&self, history: &Movies) -> Result<()> {
            if self.fail_save {
                return Err(AppError::HistorySave {
                    path: "memory".into(),
                    message: "read-only".into(),
                });
            }
            *self.data.lock().unwrap() = Some(history.clone());
            Ok(())
        }

        fn location(&self) -> String {
            "memory".into()
        }
    }

    struct RecordingNotifier {
        calls: Arc<StdMutex<Vec<Vec<String>>>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn notify(&self, movies: &Movies) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(movies.keys().cloned().collect());
            if self.fail {
                Err(AppError::notify("recording", "503"))
            } else {
                Ok(())
            }
        }
    }

    struct Harness {
        runner: Runner,
        stored: Arc<StdMutex<Option<Movies>>>,
        calls: Arc<StdMutex<Vec<Vec<String>>>>,
    }

    fn harness(batch: Movies, store: MemoryStore, notifier_fails: bool) -> Harness {
        let stored = Arc::clone(&store.data);
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let notifier = RecordingNotifier {
            calls: Arc::clone(&calls),
            fail: notifier_fails,
        };
        let runner = Runner::new(
            Arc::new(Config::default()),
            Box::new(StubFetcher {
                batch,
                delay: Duration::ZERO,
            }),
            Box::new(store),
            Notifiers::new(vec![Box::new(notifier)]),
        );
        Harness {
            runner,
            stored,
            calls,
        }
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::Skipped => panic!("run was skipped"),
        }
    }

    #[tokio::test]
    async fn test_first_run_notifies_everything() {
        let h = harness(movies(&["Movie A", "Movie B"]), MemoryStore::default(), false);

        let report = completed(h.runner.run_once().await.unwrap());

        assert_eq!(report.scraped, 2);
        assert_eq!(report.new_titles, vec!["Movie A", "Movie B"]);
        assert_eq!(report.history_size, 2);
        assert_eq!(h.calls.lock().unwrap().len(), 1);
        assert_eq!(h.stored.lock().unwrap().as_ref().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_known_titles_are_not_renotified() {
        let store = MemoryStore::default();
        *store.data.lock().unwrap() = Some(movies(&["Movie A", "Movie B"]));
        let h = harness(movies(&["Movie A", "Movie C"]), store, false);

        let report = completed(h.runner.run_once().await.unwrap());

        assert_eq!(report.new_titles, vec!["Movie C"]);
        assert_eq!(report.history_size, 3);
        assert_eq!(*h.calls.lock().unwrap(), vec![vec!["Movie C".to_string()]]);
    }

    #[tokio::test]
    async fn test_no_new_movies_skips_notify() {
        let store = MemoryStore::default();
        *store.data.lock().unwrap() = Some(movies(&["Movie A"]));
        let h = harness(movies(&["Movie A"]), store, false);

        let report = completed(h.runner.run_once().await.unwrap());

        assert!(report.new_titles.is_empty());
        assert_eq!(report.history_size, 1);
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_scrape_is_not_an_error() {
        let h = harness(Movies::new(), MemoryStore::default(), false);

        let report = completed(h.runner.run_once().await.unwrap());

        assert_eq!(report.scraped, 0);
        assert!(report.new_titles.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_history_treats_all_as_new() {
        let store = MemoryStore {
            corrupt: true,
            ..MemoryStore::default()
        };
        let h = harness(movies(&["Movie A", "Movie B"]), store, false);

        let report = completed(h.runner.run_once().await.unwrap());

        assert_eq!(report.new_titles.len(), 2);
    }

    #[tokio::test]
    async fn test_save_failure_skips_notification() {
        let store = MemoryStore {
            fail_save: true,
            ..MemoryStore::default()
        };
        let h = harness(movies(&["Movie A"]), store, false);

        let err = h.runner.run_once().await.unwrap_err();

        assert!(err.is_persistence_failure());
        assert!(h.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_keeps_history() {
        let h = harness(movies(&["Movie A"]), MemoryStore::default(), true);

        let report = completed(h.runner.run_once().await.unwrap());

        assert_eq!(report.notified.failed, vec!["recording".to_string()]);
        assert!(h.stored.lock().unwrap().as_ref().unwrap().contains_key("Movie A"));

        // The failed delivery is not retried on the next run.
        let report = completed(h.runner.run_once().await.unwrap());
        assert!(report.new_titles.is_empty());
        assert_eq!(h.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let runner = Runner::new(
            Arc::new(Config::default()),
            Box::new(StubFetcher {
                batch: movies(&["Movie A"]),
                delay: Duration::from_millis(50),
            }),
            Box::new(MemoryStore::default()),
            Notifiers::default(),
        );

        let (first, second) = tokio::join!(runner.run_once(), runner.run_once());

        assert!(matches!(first.unwrap(), RunOutcome::Completed(_)));
        assert!(matches!(second.unwrap(), RunOutcome::Skipped));

        // The guard is released once the run finishes.
        assert!(matches!(
            runner.run_once().await.unwrap(),
            RunOutcome::Completed(_)
        ));
    }
}
