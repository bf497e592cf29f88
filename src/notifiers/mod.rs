//! Notification channels for newly discovered movies.
//!
//! Channels are independent: one failing never stops the others, and no
//! failure propagates to the caller. By the time notifiers run, the movies
//! are already persisted as seen.

mod discord;
mod slack;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, Movies};

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;

/// A single notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name used in logs and reports.
    fn name(&self) -> &str;

    /// Deliver the new movies. Called only with a non-empty set.
    async fn notify(&self, movies: &Movies) -> Result<()>;
}

/// Outcome of dispatching to every channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

impl NotifyReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The set of enabled notification channels.
#[derive(Default)]
pub struct Notifiers {
    channels: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Build every channel whose webhook is configured.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http.request_timeout())
            .build()?;

        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if config.notifiers.discord.is_enabled() {
            channels.push(Box::new(DiscordNotifier::new(
                client.clone(),
                &config.notifiers.discord.webhook_url,
            )));
        }
        if config.notifiers.slack.is_enabled() {
            channels.push(Box::new(SlackNotifier::new(
                client,
                &config.notifiers.slack.webhook_url,
            )));
        }

        Ok(Self::new(channels))
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Send `movies` to every channel, logging failures instead of returning them.
    pub async fn dispatch(&self, movies: &Movies) -> NotifyReport {
        let mut report = NotifyReport::default();

        if movies.is_empty() {
            return report;
        }
        if self.channels.is_empty() {
            log::info!("No notifiers configured, skipping notification");
            return report;
        }

        let results = join_all(self.channels.iter().map(|c| c.notify(movies))).await;

        for (channel, result) in self.channels.iter().zip(results) {
            match result {
                Ok(()) => {
                    log::info!("Notified {} movies via {}", movies.len(), channel.name());
                    report.delivered.push(channel.name().to_string());
                }
                Err(error) => {
                    log::error!("{}", error);
                    report.failed.push(channel.name().to_string());
                }
            }
        }

        report
    }
}

/// POST a JSON payload to a webhook, treating non-2xx as a failure.
pub(crate) async fn post_json<T: Serialize + ?Sized + Sync>(
    client: &reqwest::Client,
    channel: &str,
    url: &str,
    payload: &T,
) -> Result<()> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| AppError::notify(channel, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::notify(
            channel,
            format!("webhook returned {status}: {}", body.trim()),
        ));
    }
    Ok(())
}
