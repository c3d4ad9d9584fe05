use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Unique key of one source record, e.g. "BR0001". Non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportId(String);

impl ReportId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReportId {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        if normalized.is_empty() {
            return Err(HarvestError::InvalidReportId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Recorded result of one download attempt. The string forms are what the
/// metadata table stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Downloaded,
    #[serde(rename = "Not downloaded")]
    NotDownloaded,
    #[serde(rename = "Processing error")]
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Downloaded => "Downloaded",
            Outcome::NotDownloaded => "Not downloaded",
            Outcome::Failed => "Processing error",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = HarvestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Downloaded" => Ok(Outcome::Downloaded),
            "Not downloaded" => Ok(Outcome::NotDownloaded),
            "Processing error" => Ok(Outcome::Failed),
            other => Err(HarvestError::InvalidOutcome(other.to_string())),
        }
    }
}

/// One input row. Read-only; URLs are `None` when the source cell is blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: ReportId,
    pub primary_url: Option<String>,
    pub alternative_url: Option<String>,
}

impl Record {
    pub fn new(
        id: ReportId,
        primary_url: Option<String>,
        alternative_url: Option<String>,
    ) -> Self {
        Self {
            id,
            primary_url,
            alternative_url,
        }
    }
}
