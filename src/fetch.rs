use std::fs::{self, File};
use std::io;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::ReportId;
use crate::error::HarvestError;

/// Retrieves a validated URL and persists the body under the destination
/// directory. One attempt per call; no retry.
pub trait PdfFetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        id: &ReportId,
        destination_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, HarvestError>;
}

pub struct HttpPdfFetcher {
    client: Client,
}

impl HttpPdfFetcher {
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

impl PdfFetcher for HttpPdfFetcher {
    fn fetch(
        &self,
        url: &str,
        id: &ReportId,
        destination_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, HarvestError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::FetchHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(HarvestError::FetchStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        fs::create_dir_all(destination_dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let destination = destination_dir.join(file_name_for(url, id));
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut file)
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(destination)
    }
}

/// Output filename: identifier prefix plus the last path segment of the URL.
/// Trailing-slash URLs fall back to `{id}.pdf` so the name never ends bare.
pub fn file_name_for(url: &str, id: &ReportId) -> String {
    let tail = url
        .rsplit('/')
        .next()
        .unwrap_or("")
        .split(['?', '#'])
        .next()
        .unwrap_or("");
    if tail.is_empty() {
        format!("{id}.pdf")
    } else {
        format!("{id}_{tail}")
    }
}
