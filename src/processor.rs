use camino::Utf8Path;
use tracing::{debug, info, warn};

use crate::domain::{Outcome, Record, ReportId};
use crate::fetch::PdfFetcher;
use crate::store::MetadataStore;
use crate::validate::{UrlValidator, resolve_url};

/// Processes one record end to end: resolve a URL, download if one resolved,
/// and record the outcome. Network failures become `NotDownloaded`; nothing
/// here aborts the caller. Exactly one upsert is attempted per record, on
/// every path.
pub fn process_record(
    record: &Record,
    validator: &dyn UrlValidator,
    fetcher: &dyn PdfFetcher,
    store: &MetadataStore,
    download_dir: &Utf8Path,
) -> (ReportId, Outcome) {
    let outcome = match resolve_url(validator, record) {
        Some(url) => match fetcher.fetch(&url, &record.id, download_dir) {
            Ok(path) => {
                info!(id = %record.id, path = %path, "downloaded");
                Outcome::Downloaded
            }
            Err(err) => {
                warn!(id = %record.id, url = %url, error = %err, "download failed");
                Outcome::NotDownloaded
            }
        },
        None => {
            debug!(id = %record.id, "no valid url");
            Outcome::NotDownloaded
        }
    };

    record_outcome(store, &record.id, outcome);
    (record.id.clone(), outcome)
}

/// Upsert with the failure logged rather than propagated; per-record store
/// trouble must not stop the rest of the run.
pub fn record_outcome(store: &MetadataStore, id: &ReportId, outcome: Outcome) {
    if let Err(err) = store.upsert(id, outcome) {
        warn!(id = %id, error = %err, "metadata upsert failed");
    }
}
