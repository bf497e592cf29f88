// src/services/movies.rs

//! Movie listing scraper.
//!
//! Fetches listing pages from the configured mirrors and extracts movie cards
//! using configured CSS selectors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response, StatusCode};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, ListingSelectors, Movie, Movies};
use crate::services::Fetcher;
use crate::utils::{get_domain, http, resolve_url};

/// Raw fields of one movie card, before URL resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawListing {
    pub title: String,
    pub year: String,
    pub link: String,
    pub cover_image: String,
}

/// Compiled selectors for extracting movie cards from a listing page.
#[derive(Debug, Clone)]
pub struct ListingParser {
    container: Selector,
    item: Selector,
    title: Selector,
    year: Selector,
    link: Selector,
    link_attr: String,
    cover: Selector,
    cover_attr: String,
}

impl ListingParser {
    pub fn new(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            container: parse_selector(&selectors.container_selector)?,
            item: parse_selector(&selectors.item_selector)?,
            title: parse_selector(&selectors.title_selector)?,
            year: parse_selector(&selectors.year_selector)?,
            link: parse_selector(&selectors.link_selector)?,
            link_attr: selectors.link_attr.clone(),
            cover: parse_selector(&selectors.cover_selector)?,
            cover_attr: selectors.cover_attr.clone(),
        })
    }

    /// Extract every movie card in document order.
    ///
    /// Cards without a title are skipped. Missing year, link or cover fields
    /// come back as empty strings.
    pub fn parse(&self, html: &str) -> Vec<RawListing> {
        let document = Html::parse_document(html);
        let mut listings = Vec::new();

        for container in document.select(&self.container) {
            for card in container.select(&self.item) {
                let title = child_text(&card, &self.title);
                if title.is_empty() {
                    log::debug!("Skipping movie card without a title");
                    continue;
                }

                listings.push(RawListing {
                    title,
                    year: child_text(&card, &self.year),
                    link: child_attr(&card, &self.link, &self.link_attr),
                    cover_image: child_attr(&card, &self.cover, &self.cover_attr),
                });
            }
        }

        listings
    }
}

/// Fetch adapter backed by an HTTP client and a [`ListingParser`].
pub struct MovieScraper {
    client: Client,
    parser: ListingParser,
    max_concurrent: usize,
    max_retries: u32,
}

impl MovieScraper {
    /// Create a scraper with an HTTP client built from the configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = http::create_async_client(&config.http)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &Config) -> Result<Self> {
        Ok(Self {
            client,
            parser: ListingParser::new(&config.selectors)?,
            max_concurrent: config.http.max_concurrent.max(1),
            max_retries: config.http.max_retries,
        })
    }

    /// GET `url`, retrying transient failures with exponential backoff.
    async fn get_with_retry(&self, url: &str, timeout: Duration) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            match self.client.get(url).timeout(timeout).send().await {
                Ok(response) => {
                    let status = response.status();
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        log::warn!(
                            "Retrying URL: {} after status {} (attempt {})",
                            url,
                            status.as_u16(),
                            attempt
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if (err.is_connect() || err.is_timeout()) && attempt < self.max_retries {
                        attempt += 1;
                        log::warn!(
                            "Retrying URL: {} after error: {} (attempt {})",
                            url,
                            err,
                            attempt
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(AppError::fetch(url, err));
                }
            }
        }
    }

    /// Fetch and parse a single listing page.
    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<Movies> {
        log::info!("Visiting URL: {}", url);

        let response = self.get_with_retry(url, timeout).await?;

        let status = response.status();
        log::info!("Visited URL: {} Status Code: {}", url, status.as_u16());
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("unexpected status {status}")));
        }

        // Resolve against the final URL so redirects to another mirror work.
        let base = response.url().clone();
        let body = response.text().await.map_err(|e| AppError::fetch(url, e))?;

        let listings = self.parser.parse(&body);
        let batch = collect_batch(listings, &base, Utc::now());

        log::info!(
            "Finished URL: {} ({} movies from {})",
            url,
            batch.len(),
            get_domain(base.as_str()).unwrap_or_default()
        );
        Ok(batch)
    }
}

#[async_trait]
impl Fetcher for MovieScraper {
    async fn fetch(&self, urls: &[String], timeout: Duration) -> Movies {
        // `buffered` keeps source order, so later mirrors win on title clashes.
        let pages: Vec<(String, Result<Movies>)> = stream::iter(urls.iter().cloned())
            .map(|url| async move {
                let result = self.fetch_page(&url, timeout).await;
                (url, result)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        pages
            .into_iter()
            .fold(Movies::new(), |mut movies, (url, result)| {
                match result {
                    Ok(batch) => movies.extend(batch),
                    Err(error) => log::error!("Failed to load URL: {}: {}", url, error),
                }
                movies
            })
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1 << attempt.min(5)))
}

/// Turn one page's listings into a batch, last card winning per title.
pub fn collect_batch(listings: Vec<RawListing>, base: &Url, observed_at: DateTime<Utc>) -> Movies {
    listings
        .into_iter()
        .map(|raw| into_movie(raw, base, observed_at))
        .fold(Movies::new(), |mut batch, movie| {
            batch.insert(movie.title.clone(), movie);
            batch
        })
}

fn into_movie(raw: RawListing, base: &Url, observed_at: DateTime<Utc>) -> Movie {
    let link = resolve_field(base, &raw.link, "link", &raw.title);
    let cover_image = resolve_field(base, &raw.cover_image, "cover image", &raw.title);
    Movie::new(raw.title, raw.year, link, cover_image, observed_at)
}

/// Resolve one field, leaving it empty when the reference is missing or malformed.
fn resolve_field(base: &Url, reference: &str, field: &str, title: &str) -> String {
    if reference.trim().is_empty() {
        return String::new();
    }

    match resolve_url(base, reference) {
        Ok(url) => url,
        Err(error) => {
            log::warn!("Dropping {} for \"{}\": {}", field, title, error);
            String::new()
        }
    }
}

fn child_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| normalize_whitespace(&e.text().collect::<String>()))
        .unwrap_or_default()
}

fn child_attr(element: &ElementRef, selector: &Selector, attr: &str) -> String {
    element
        .select(selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
