//! # Job Request
//!
//! The immutable value a caller submits once to start a remote crawl job.
//! Provider defaults are applied here so the wire layer never sees a
//! missing field.

use serde::{Deserialize, Serialize};

use crate::application::ControllerError;

/// Provider-supplied defaults used when the caller leaves a field out
pub mod defaults {
    /// Default page budget for a crawl
    pub const MAX_PAGES: u32 = 100;

    /// Default number of server-side workers
    pub const MAX_WORKERS: u32 = 5;

    /// Subdomains are followed unless the caller opts out
    pub const INCLUDE_SUBDOMAINS: bool = true;
}

/// A fully resolved crawl job request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub url: String,
    pub max_pages: u32,
    pub max_workers: u32,
    pub include_subdomains: bool,
}

/// Optional overrides collected from the presentation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub max_pages: Option<u32>,
    pub max_workers: Option<u32>,
    pub include_subdomains: Option<bool>,
}

impl JobRequest {
    /// Creates a request for `url` with every provider default applied
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::from_options(url, JobOptions::default())
    }

    /// Resolves caller options against the provider defaults.
    ///
    /// An explicit `include_subdomains: Some(false)` is kept as `false`.
    #[must_use]
    pub fn from_options(url: impl Into<String>, options: JobOptions) -> Self {
        Self {
            url: url.into(),
            max_pages: options.max_pages.unwrap_or(defaults::MAX_PAGES),
            max_workers: options.max_workers.unwrap_or(defaults::MAX_WORKERS),
            include_subdomains: options
                .include_subdomains
                .unwrap_or(defaults::INCLUDE_SUBDOMAINS),
        }
    }

    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub const fn with_max_workers(mut self, max_workers: u32) -> Self {
        self.max_workers = max_workers;
        self
    }

    #[must_use]
    pub const fn with_include_subdomains(mut self, include_subdomains: bool) -> Self {
        self.include_subdomains = include_subdomains;
        self
    }

    /// Checks the submission preconditions
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.url.trim().is_empty() {
            return Err(ControllerError::InvalidRequest {
                field: "url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ControllerError::InvalidRequest {
                field: "maxPages",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_workers == 0 {
            return Err(ControllerError::InvalidRequest {
                field: "maxWorkers",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl JobOptions {
    /// Coerces numeric form input into a positive integer.
    ///
    /// Blank input means "use the default" and yields `Ok(None)`.
    pub fn parse_numeric(field: &'static str, text: &str) -> Result<Option<u32>, ControllerError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value: u32 = trimmed.parse().map_err(|e| ControllerError::InvalidRequest {
            field,
            reason: format!("'{trimmed}' is not a whole number ({e})"),
        })?;
        if value == 0 {
            return Err(ControllerError::InvalidRequest {
                field,
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn new_applies_provider_defaults() {
        let request = JobRequest::new("https://example.com");
        assert_eq!(request.max_pages, 100);
        assert_eq!(request.max_workers, 5);
        assert!(request.include_subdomains);
    }

    #[test]
    fn explicit_false_subdomains_is_respected() {
        let options = JobOptions {
            include_subdomains: Some(false),
            ..JobOptions::default()
        };
        let request = JobRequest::from_options("https://example.com", options);
        assert!(!request.include_subdomains);
    }

    #[rstest]
    #[case("", "url")]
    #[case("   ", "url")]
    fn empty_url_is_rejected(#[case] url: &str, #[case] field: &str) {
        let err = JobRequest::new(url).validate().unwrap_err();
        assert!(matches!(err, ControllerError::InvalidRequest { field: f, .. } if f == field));
    }

    #[test]
    fn zero_numeric_fields_are_rejected() {
        let request = JobRequest::new("https://example.com").with_max_pages(0);
        assert!(request.validate().is_err());

        let request = JobRequest::new("https://example.com").with_max_workers(0);
        assert!(request.validate().is_err());
    }

    #[rstest]
    #[case("50", Some(50))]
    #[case(" 7 ", Some(7))]
    #[case("", None)]
    fn numeric_input_is_coerced(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(JobOptions::parse_numeric("maxPages", text).unwrap(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("0")]
    #[case("-3")]
    #[case("2.5")]
    fn bad_numeric_input_is_rejected(#[case] text: &str) {
        assert!(JobOptions::parse_numeric("maxPages", text).is_err());
    }

    proptest! {
        #[test]
        fn provided_options_always_win(
            pages in 1u32..10_000,
            workers in 1u32..64,
            subdomains in any::<bool>(),
        ) {
            let options = JobOptions {
                max_pages: Some(pages),
                max_workers: Some(workers),
                include_subdomains: Some(subdomains),
            };
            let request = JobRequest::from_options("https://example.com", options);
            prop_assert_eq!(request.max_pages, pages);
            prop_assert_eq!(request.max_workers, workers);
            prop_assert_eq!(request.include_subdomains, subdomains);
            prop_assert!(request.validate().is_ok());
        }
    }
}
