//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation of a fully merged `ProxyConfig`
//! - Check the upstream URL parses and uses an HTTP scheme
//! - Validate value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream url `{url}` is invalid: {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("upstream url `{0}` must use http or https")]
    UnsupportedScheme(String),

    #[error("timeout `{0}` must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("upstream api key contains characters not allowed in a header value")]
    InvalidApiKey,
}

/// Validate a merged configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base_url = &config.upstream.base_url;
    match Url::parse(base_url) {
        Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
            errors.push(ValidationError::UnsupportedScheme(base_url.clone()));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidUpstreamUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        }),
    }

    if let Some(key) = &config.upstream.api_key {
        if key.chars().any(|c| c.is_control()) {
            errors.push(ValidationError::InvalidApiKey);
        }
    }

    let timeouts = &config.timeouts;
    if timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("upstream"));
    }
    if timeouts.client_read_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("client_read"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
