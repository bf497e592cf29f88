// src/utils/http.rs

//! HTTP client utilities.

use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
///
/// Every request carries the configured user agent and referrer, and is
/// bounded by the per-request timeout.
pub fn create_async_client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if !config.referrer.is_empty() {
        let referrer = HeaderValue::from_str(&config.referrer)
            .map_err(|e| AppError::config(format!("Invalid referrer header: {e}")))?;
        headers.insert(header::REFERER, referrer);
    }

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout())
        .build()?;
    Ok(client)
}
