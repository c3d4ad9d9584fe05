use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarvestError {
    #[error("invalid report identifier: {0:?}")]
    InvalidReportId(String),

    #[error("invalid outcome value: {0:?}")]
    InvalidOutcome(String),

    #[error("missing config file report-harvest.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read source table {path}: {message}")]
    SourceRead { path: String, message: String },

    #[error("source table {path} has no column named {column:?}")]
    SourceColumn { path: String, column: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("download request failed: {0}")]
    FetchHttp(String),

    #[error("download returned status {status} for {url}")]
    FetchStatus { status: u16, url: String },

    #[error("metadata store error at {path}: {message}")]
    Store { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
