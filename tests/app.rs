use std::fs;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use report_harvester::app::{App, ProgressEvent, ProgressSink, RunOptions};
use report_harvester::config::{ResolvedConfig, SourceColumns};
use report_harvester::domain::ReportId;
use report_harvester::error::HarvestError;
use report_harvester::fetch::{PdfFetcher, file_name_for};
use report_harvester::runner::CancelFlag;
use report_harvester::store::MetadataStore;
use report_harvester::validate::UrlValidator;

struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _event: ProgressEvent) {}
}

struct SetValidator {
    valid: Vec<String>,
}

impl UrlValidator for SetValidator {
    fn is_fetchable_pdf(&self, url: &str) -> bool {
        self.valid.iter().any(|valid| valid == url)
    }
}

#[derive(Default)]
struct MockFetcher {
    calls: Arc<Mutex<usize>>,
}

impl PdfFetcher for MockFetcher {
    fn fetch(
        &self,
        url: &str,
        id: &ReportId,
        destination_dir: &Utf8Path,
    ) -> Result<Utf8PathBuf, HarvestError> {
        let mut guard = self.calls.lock().unwrap();
        *guard += 1;
        fs::create_dir_all(destination_dir.as_std_path())
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        let destination = destination_dir.join(file_name_for(url, id));
        fs::write(destination.as_std_path(), b"%PDF-1.4")
            .map_err(|err| HarvestError::Filesystem(err.to_string()))?;
        Ok(destination)
    }
}

fn write_source(dir: &tempfile::TempDir, rows: &[(&str, &str, &str)]) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("source.csv")).unwrap();
    let mut content = String::from("BRnum,Pdf_URL,Report Html Address\n");
    for (id, primary, alternative) in rows {
        content.push_str(&format!("{id},{primary},{alternative}\n"));
    }
    fs::write(path.as_std_path(), content).unwrap();
    path
}

fn config_for(dir: &tempfile::TempDir, source_path: Utf8PathBuf) -> ResolvedConfig {
    ResolvedConfig {
        source_path,
        store_path: Utf8PathBuf::from_path_buf(dir.path().join("status.csv")).unwrap(),
        download_dir: Utf8PathBuf::from_path_buf(dir.path().join("downloads")).unwrap(),
        columns: SourceColumns::default(),
        workers: 4,
        validate_timeout_secs: 1,
        fetch_timeout_secs: 1,
    }
}

#[test]
fn end_to_end_three_record_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        &dir,
        &[
            ("BR1", "https://x/a.pdf", ""),
            ("BR2", "", "https://x/b.pdf"),
            ("BR3", "bad", ""),
        ],
    );
    let config = config_for(&dir, source);

    let validator = SetValidator {
        valid: vec!["https://x/a.pdf".to_string(), "https://x/b.pdf".to_string()],
    };
    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(store, validator, MockFetcher::default());

    let result = app
        .run(&config, RunOptions::default(), &CancelFlag::new(), &NullSink)
        .unwrap();

    let pairs: Vec<(String, String)> = result
        .results
        .iter()
        .map(|row| (row.identifier.clone(), row.outcome.clone()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("BR1".to_string(), "Downloaded".to_string()),
            ("BR2".to_string(), "Downloaded".to_string()),
            ("BR3".to_string(), "Not downloaded".to_string()),
        ]
    );
    assert_eq!(result.downloaded, 2);
    assert_eq!(result.not_downloaded, 1);
    assert_eq!(result.failed, 0);
    assert!(result.missing.is_empty());

    let store = MetadataStore::new(config.store_path.clone());
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 3);
    let identifiers: Vec<String> = entries
        .iter()
        .map(|entry| entry.identifier.to_string())
        .collect();
    assert_eq!(identifiers, vec!["BR1", "BR2", "BR3"]);

    assert!(config.download_dir.join("BR1_a.pdf").as_std_path().exists());
    assert!(config.download_dir.join("BR2_b.pdf").as_std_path().exists());
    let br3_files: Vec<_> = fs::read_dir(config.download_dir.as_std_path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("BR3"))
        .collect();
    assert!(br3_files.is_empty());
}

#[test]
fn no_valid_url_means_zero_fetch_calls() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, &[("BR1", "bad", "also-bad"), ("BR2", "", "")]);
    let config = config_for(&dir, source);

    let fetcher = MockFetcher::default();
    let calls = Arc::clone(&fetcher.calls);
    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(store, SetValidator { valid: vec![] }, fetcher);

    let result = app
        .run(&config, RunOptions::default(), &CancelFlag::new(), &NullSink)
        .unwrap();

    assert_eq!(result.not_downloaded, 2);
    assert_eq!(result.downloaded, 0);
    assert_eq!(*calls.lock().unwrap(), 0);
    // Both records were still recorded in the store without any fetch.
    let store = MetadataStore::new(config.store_path.clone());
    assert_eq!(store.entries().unwrap().len(), 2);
}

#[test]
fn cancelled_run_dispatches_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, &[("BR1", "https://x/a.pdf", "")]);
    let config = config_for(&dir, source);

    let fetcher = MockFetcher::default();
    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(
        store,
        SetValidator {
            valid: vec!["https://x/a.pdf".to_string()],
        },
        fetcher,
    );

    let cancel = CancelFlag::new();
    cancel.cancel();
    let result = app
        .run(&config, RunOptions::default(), &cancel, &NullSink)
        .unwrap();

    assert!(result.results.is_empty());
    // The unprocessed identifier shows up in the audit as missing.
    assert_eq!(result.missing, vec!["BR1".to_string()]);
}

#[test]
fn audit_reports_missing_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        &dir,
        &[("BR1", "", ""), ("BR2", "", ""), ("BR3", "", "")],
    );
    let config = config_for(&dir, source);

    let store = MetadataStore::new(config.store_path.clone());
    store
        .upsert(
            &"BR1".parse().unwrap(),
            report_harvester::domain::Outcome::Downloaded,
        )
        .unwrap();
    store
        .upsert(
            &"BR3".parse().unwrap(),
            report_harvester::domain::Outcome::NotDownloaded,
        )
        .unwrap();

    let app = App::new(store, SetValidator { valid: vec![] }, MockFetcher::default());
    let result = app.audit(&config, &NullSink).unwrap();

    assert_eq!(result.source_count, 3);
    assert_eq!(result.store_count, 2);
    assert_eq!(result.missing, vec!["BR2".to_string()]);
}

#[test]
fn missing_source_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
        &dir,
        Utf8PathBuf::from_path_buf(dir.path().join("absent.csv")).unwrap(),
    );

    let store = MetadataStore::new(config.store_path.clone());
    let app = App::new(store, SetValidator { valid: vec![] }, MockFetcher::default());

    let err = app
        .run(&config, RunOptions::default(), &CancelFlag::new(), &NullSink)
        .unwrap_err();
    assert!(matches!(err, HarvestError::SourceRead { .. }));
}
