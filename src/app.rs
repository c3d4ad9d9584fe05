use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::audit::missing_identifiers;
use crate::config::ResolvedConfig;
use crate::domain::{Outcome, ReportId};
use crate::error::HarvestError;
use crate::fetch::PdfFetcher;
use crate::runner::{CancelFlag, Runner};
use crate::source::load_records;
use crate::store::MetadataStore;
use crate::validate::UrlValidator;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub results: Vec<RowResult>,
    pub downloaded: usize,
    pub not_downloaded: usize,
    pub failed: usize,
    pub missing: Vec<String>,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub identifier: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub source_count: usize,
    pub store_count: usize,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<V: UrlValidator, F: PdfFetcher> {
    store: MetadataStore,
    validator: V,
    fetcher: F,
}

impl<V: UrlValidator, F: PdfFetcher> App<V, F> {
    pub fn new(store: MetadataStore, validator: V, fetcher: F) -> Self {
        Self {
            store,
            validator,
            fetcher,
        }
    }

    /// Full pipeline: load the source table, process every record over the
    /// worker pool, then audit the store against the source. Only the source
    /// load can fail; everything per-record is contained inside the pool.
    pub fn run(
        &self,
        config: &ResolvedConfig,
        options: RunOptions,
        cancel: &CancelFlag,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, HarvestError> {
        let started_at = iso_timestamp();

        sink.event(ProgressEvent {
            message: format!("phase=Load; reading {}", config.source_path),
        });
        let records = load_records(&config.source_path, &config.columns)?;

        let workers = options.workers.unwrap_or(config.workers);
        sink.event(ProgressEvent {
            message: format!(
                "phase=Process; {} records across {} workers",
                records.len(),
                workers
            ),
        });
        let source_ids: BTreeSet<_> = records.iter().map(|record| record.id.clone()).collect();
        let results = Runner::new(workers).run(
            records,
            &self.validator,
            &self.fetcher,
            &self.store,
            &config.download_dir,
            cancel,
        );

        sink.event(ProgressEvent {
            message: "phase=Audit; comparing source against metadata store".to_string(),
        });
        let store_ids = self.store.identifiers()?;
        let missing = missing_identifiers(&source_ids, &store_ids);
        if !missing.is_empty() {
            warn!(count = missing.len(), "identifiers missing from metadata store");
        }

        let downloaded = count(&results, Outcome::Downloaded);
        let not_downloaded = count(&results, Outcome::NotDownloaded);
        let failed = count(&results, Outcome::Failed);

        Ok(RunResult {
            results: results
                .into_iter()
                .map(|(id, outcome)| RowResult {
                    identifier: id.to_string(),
                    outcome: outcome.to_string(),
                })
                .collect(),
            downloaded,
            not_downloaded,
            failed,
            missing: missing.into_iter().map(|id| id.to_string()).collect(),
            started_at,
            finished_at: iso_timestamp(),
        })
    }

    /// Standalone consistency check; no network work.
    pub fn audit(
        &self,
        config: &ResolvedConfig,
        sink: &dyn ProgressSink,
    ) -> Result<AuditResult, HarvestError> {
        sink.event(ProgressEvent {
            message: format!("phase=Audit; reading {}", config.source_path),
        });
        let records = load_records(&config.source_path, &config.columns)?;
        let source_ids: BTreeSet<_> = records.into_iter().map(|record| record.id).collect();
        let store_ids = self.store.identifiers()?;
        let missing = missing_identifiers(&source_ids, &store_ids);

        Ok(AuditResult {
            source_count: source_ids.len(),
            store_count: store_ids.len(),
            missing: missing.into_iter().map(|id| id.to_string()).collect(),
        })
    }
}

fn count(results: &[(ReportId, Outcome)], outcome: Outcome) -> usize {
    results.iter().filter(|(_, o)| *o == outcome).count()
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
