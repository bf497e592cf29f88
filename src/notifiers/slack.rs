//! Slack incoming-webhook notifier.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{Movie, Movies};
use crate::notifiers::{Notifier, post_json};

/// Slack allows 50 blocks per message; one goes to the header.
const MAX_MOVIES_PER_MESSAGE: usize = 49;

/// Posts new movies to a Slack incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

/// Escape the three characters mrkdwn treats as control sequences.
fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn movie_block(movie: &Movie) -> Value {
    let title = escape_mrkdwn(&movie.title);
    let heading = if movie.link.is_empty() {
        format!("*{title}*")
    } else {
        // `|` has no escape inside link text and would end the URL part early.
        format!(
            "*<{}|{}>*",
            escape_mrkdwn(&movie.link),
            title.replace('|', "\u{2223}")
        )
    };
    let text = if movie.year.is_empty() {
        heading
    } else {
        format!("{heading}\n{}", movie.year)
    };

    let mut block = json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
    });
    if !movie.cover_image.is_empty() {
        block["accessory"] = json!({
            "type": "image",
            "image_url": movie.cover_image,
            "alt_text": movie.title,
        });
    }
    block
}

fn build_messages(movies: &Movies) -> Vec<Value> {
    let all: Vec<&Movie> = movies.values().collect();

    all.chunks(MAX_MOVIES_PER_MESSAGE)
        .map(|chunk| {
            let summary = format!("Found {} new movies", movies.len());
            let mut blocks = vec![json!({
                "type": "header",
                "text": { "type": "plain_text", "text": summary },
            })];
            blocks.extend(chunk.iter().map(|m| movie_block(m)));

            json!({ "text": summary, "blocks": blocks })
        })
        .collect()
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn name(&self) -> &str {
        "slack"
    }

    async fn notify(&self, movies: &Movies) -> Result<()> {
        for message in build_messages(movies) {
            post_json(&self.client, self.name(), &self.webhook_url, &message).await?;
        }
        Ok(())
    }
}
