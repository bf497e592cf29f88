//! Discord webhook notifier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Movie, Movies};
use crate::notifiers::{Notifier, post_json};

/// Discord rejects messages with more embeds than this.
const MAX_EMBEDS_PER_MESSAGE: usize = 10;

/// Embed accent color (YTS green).
const EMBED_COLOR: u32 = 0x6AC045;

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: String,
    embeds: Vec<Embed<'a>>,
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedImage<'a>>,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct EmbedField<'a> {
    name: &'static str,
    value: &'a str,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedImage<'a> {
    url: &'a str,
}

impl<'a> From<&'a Movie> for Embed<'a> {
    fn from(movie: &'a Movie) -> Self {
        let non_empty = |s: &'a str| (!s.is_empty()).then_some(s);

        Self {
            title: &movie.title,
            url: non_empty(movie.link.as_str()),
            color: EMBED_COLOR,
            fields: non_empty(movie.year.as_str())
                .map(|year| EmbedField {
                    name: "Year",
                    value: year,
                    inline: true,
                })
                .into_iter()
                .collect(),
            thumbnail: non_empty(movie.cover_image.as_str()).map(|url| EmbedImage { url }),
            timestamp: movie.timestamp,
        }
    }
}

/// Posts new movies to a Discord channel webhook, one embed per movie.
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(client: reqwest::Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

/// Split the movies into webhook messages within Discord's embed limit.
fn build_messages(movies: &Movies) -> Vec<WebhookMessage<'_>> {
    let all: Vec<&Movie> = movies.values().collect();
    let pages = all.len().div_ceil(MAX_EMBEDS_PER_MESSAGE);

    all.chunks(MAX_EMBEDS_PER_MESSAGE)
        .enumerate()
        .map(|(i, chunk)| {
            let content = if pages > 1 {
                format!("Found {} new movies ({}/{})", movies.len(), i + 1, pages)
            } else {
                format!("Found {} new movies", movies.len())
            };
            WebhookMessage {
                content,
                embeds: chunk.iter().map(|m| Embed::from(*m)).collect(),
            }
        })
        .collect()
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, movies: &Movies) -> Result<()> {
        for message in build_messages(movies) {
            post_json(&self.client, self.name(), &self.webhook_url, &message).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movies(count: usize) -> Movies {
        (0..count)
            .map(|i| {
                let movie = Movie::new(
                    format!("Movie {i:02}"),
                    "2024",
                    format!("https://yts.mx/movies/movie-{i}"),
                    format!("https://yts.mx/assets/{i}.jpg"),
                    Utc::now(),
                );
                (movie.title.clone(), movie)
            })
            .collect()
    }

    #[test]
    fn test_single_message() {
        let movies = movies(3);
        let messages = build_messages(&movies);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "Found 3 new movies");
        assert_eq!(messages[0].embeds.len(), 3);
    }

    #[test]
    fn test_chunks_at_embed_limit() {
        let movies = movies(23);
        let messages = build_messages(&movies);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].embeds.len(), 10);
        assert_eq!(messages[2].embeds.len(), 3);
        assert_eq!(messages[1].content, "Found 23 new movies (2/3)");
    }

    #[test]
    fn test_embed_payload() {
        let movies = movies(1);
        let json = serde_json::to_value(&build_messages(&movies)[0]).unwrap();
        let embed = &json["embeds"][0];

        assert_eq!(embed["title"], "Movie 00");
        assert_eq!(embed["url"], "https://yts.mx/movies/movie-0");
        assert_eq!(embed["fields"][0]["name"], "Year");
        assert_eq!(embed["fields"][0]["value"], "2024");
        assert_eq!(embed["thumbnail"]["url"], "https://yts.mx/assets/0.jpg");
    }

    #[test]
    fn test_embed_omits_empty_fields() {
        let movie = Movie::new("Heat", "", "", "", Utc::now());
        let json = serde_json::to_value(Embed::from(&movie)).unwrap();

        assert!(json.get("url").is_none());
        assert!(json.get("thumbnail").is_none());
        assert!(json.get("fields").is_none());
    }
}
