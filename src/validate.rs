use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::Record;
use crate::error::HarvestError;

/// Decides whether a candidate URL is a live, fetchable PDF resource.
///
/// This is a boolean predicate with no failure channel: timeouts, connection
/// failures and malformed URLs all count as "not fetchable".
pub trait UrlValidator: Send + Sync {
    fn is_fetchable_pdf(&self, url: &str) -> bool;
}

/// Picks the URL to download for one record. The primary URL strictly takes
/// precedence over the alternative; the alternative is only probed when the
/// primary is absent or fails validation.
pub fn resolve_url(validator: &dyn UrlValidator, record: &Record) -> Option<String> {
    for candidate in [&record.primary_url, &record.alternative_url] {
        if let Some(url) = candidate
            && !url.trim().is_empty()
            && validator.is_fetchable_pdf(url)
        {
            return Some(url.clone());
        }
    }
    None
}

pub struct HttpUrlValidator {
    client: Client,
}

impl HttpUrlValidator {
    pub fn new(timeout_secs: u64) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("report-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::HttpClient(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| HarvestError::HttpClient(err.to_string()))?;
        Ok(Self { client })
    }
}

impl UrlValidator for HttpUrlValidator {
    fn is_fetchable_pdf(&self, url: &str) -> bool {
        // GET rather than HEAD: some servers misreport content type on HEAD.
        match self.client.get(url).send() {
            Ok(response) => {
                response.status() == StatusCode::OK && is_pdf_content_type(&response)
            }
            Err(err) => {
                debug!(url, error = %err, "url validation request failed");
                false
            }
        }
    }
}

fn is_pdf_content_type(response: &reqwest::blocking::Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().starts_with("application/pdf"))
        .unwrap_or(false)
}
