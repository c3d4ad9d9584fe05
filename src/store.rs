use std::collections::BTreeSet;
use std::fs;
use std::sync::{Mutex, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{Outcome, ReportId};
use crate::error::HarvestError;

/// One row of the metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub identifier: ReportId,
    pub outcome: Outcome,
}

/// Durable mapping from report identifier to download outcome, persisted as
/// a two-column CSV file sorted ascending by identifier.
///
/// The file has no internal concurrency control: every upsert is a whole-file
/// read-modify-write, so the full sequence runs under one process-wide lock.
/// Writes go to a temp file renamed into place, which leaves either the
/// pre-write or the post-write content on disk after an interruption, never a
/// partial file.
pub struct MetadataStore {
    path: Utf8PathBuf,
    lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Replace-or-append the outcome for one identifier, keeping the file
    /// sorted and free of duplicate identifiers. Exclusive across concurrent
    /// callers for the full load-modify-sort-write sequence.
    pub fn upsert(&self, identifier: &ReportId, outcome: Outcome) -> Result<(), HarvestError> {
        // A worker that panicked while holding the lock must not wedge the
        // rest of the pool; the on-disk file is always complete.
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut entries = self.load()?;
        match entries
            .iter_mut()
            .find(|entry| entry.identifier == *identifier)
        {
            Some(entry) => entry.outcome = outcome,
            None => entries.push(MetadataEntry {
                identifier: identifier.clone(),
                outcome,
            }),
        }
        entries.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        self.write_atomic(&entries)
    }

    /// All entries currently on disk, in file order (ascending by identifier
    /// whenever the file was written by this store).
    pub fn entries(&self) -> Result<Vec<MetadataEntry>, HarvestError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load()
    }

    pub fn identifiers(&self) -> Result<BTreeSet<ReportId>, HarvestError> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|entry| entry.identifier)
            .collect())
    }

    fn load(&self) -> Result<Vec<MetadataEntry>, HarvestError> {
        if !self.path.as_std_path().exists() {
            return Ok(Vec::new());
        }
        let mut reader =
            csv::Reader::from_path(self.path.as_std_path()).map_err(|err| self.error(err))?;
        let mut entries = Vec::new();
        for entry in reader.deserialize() {
            entries.push(entry.map_err(|err| self.error(err))?);
        }
        Ok(entries)
    }

    fn write_atomic(&self, entries: &[MetadataEntry]) -> Result<(), HarvestError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent.as_std_path()).map_err(|err| self.error(err))?;
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        for entry in entries {
            writer.serialize(entry).map_err(|err| self.error(err))?;
        }
        let content = writer
            .into_inner()
            .map_err(|err| self.error(err))?;

        let tmp_path = self.path.with_extension("csv.tmp");
        fs::write(tmp_path.as_std_path(), &content).map_err(|err| self.error(err))?;
        fs::rename(tmp_path.as_std_path(), self.path.as_std_path())
            .map_err(|err| self.error(err))?;
        Ok(())
    }

    fn error(&self, err: impl std::fmt::Display) -> HarvestError {
        HarvestError::Store {
            path: self.path.to_string(),
            message: err.to_string(),
        }
    }
}
