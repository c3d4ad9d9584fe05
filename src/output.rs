use std::io::{self, Write};

use serde::Serialize;
use tracing::info;

use crate::app::{AuditResult, ProgressEvent, ProgressSink, RunResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Text,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_run(result: &RunResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_audit(result: &AuditResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Progress sink for text mode: phase events go to the log stream.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        info!("{}", event.message);
    }
}

pub fn print_run_summary(result: &RunResult) {
    println!(
        "processed {} records: {} downloaded, {} not downloaded, {} failed",
        result.results.len(),
        result.downloaded,
        result.not_downloaded,
        result.failed
    );
    for row in &result.results {
        println!("  {} {}", row.identifier, row.outcome);
    }
    if result.missing.is_empty() {
        println!("audit: all source identifiers present in the metadata store");
    } else {
        println!(
            "audit warning: {} identifiers missing from the metadata store: {}",
            result.missing.len(),
            result.missing.join(", ")
        );
    }
}

pub fn print_audit_summary(result: &AuditResult) {
    println!(
        "audit: {} source identifiers, {} store identifiers",
        result.source_count, result.store_count
    );
    if result.missing.is_empty() {
        println!("all source identifiers present in the metadata store");
    } else {
        println!(
            "missing from the metadata store: {}",
            result.missing.join(", ")
        );
    }
}
