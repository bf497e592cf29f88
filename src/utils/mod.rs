//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative reference against a base URL.
///
/// Fails with [`AppError::MalformedReference`] when the reference is not a
/// valid URL reference. Examples are a colon in the first path segment with
/// no scheme in front of it (`::bad::`), an embedded control character, or a
/// `%` not followed by two hex digits.
pub fn resolve_url(base: &Url, reference: &str) -> Result<String> {
    let reference = reference.trim();

    if reference.chars().any(|c| c.is_ascii_control()) {
        return Err(AppError::malformed_reference(
            reference,
            "invalid control character in URL",
        ));
    }

    if let Some(escape) = invalid_escape(reference) {
        return Err(AppError::malformed_reference(
            reference,
            format!("invalid URL escape \"{escape}\""),
        ));
    }

    // A colon before any '/', '?' or '#' must terminate a scheme.
    if let Some(idx) = reference.find([':', '/', '?', '#']) {
        if reference[idx..].starts_with(':') {
            let scheme = &reference[..idx];
            if scheme.is_empty() {
                return Err(AppError::malformed_reference(
                    reference,
                    "missing protocol scheme",
                ));
            }
            if !is_valid_scheme(scheme) {
                return Err(AppError::malformed_reference(
                    reference,
                    "first path segment in URL cannot contain colon",
                ));
            }
        }
    }

    base.join(reference)
        .map(|u| u.to_string())
        .map_err(|e| AppError::malformed_reference(reference, e))
}

/// First `%` sequence that is not `%` followed by two hex digits.
fn invalid_escape(reference: &str) -> Option<String> {
    let bytes = reference.as_bytes();
    bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'%')
        .find(|(i, _)| {
            !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
        })
        .map(|(i, _)| reference[i..].chars().take(3).collect())
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Extract the domain from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
