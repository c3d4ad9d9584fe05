use camino::Utf8Path;
use csv::StringRecord;
use tracing::warn;

use crate::config::SourceColumns;
use crate::domain::{Record, ReportId};
use crate::error::HarvestError;

/// Loads all records from the source table. Any file-level problem (missing
/// file, unreadable row, missing configured column) is fatal; no per-record
/// work should begin on a partial load. Rows whose identifier cell is blank
/// cannot be keyed in the metadata store and are skipped with a warning.
pub fn load_records(
    path: &Utf8Path,
    columns: &SourceColumns,
) -> Result<Vec<Record>, HarvestError> {
    let mut reader = csv::Reader::from_path(path.as_std_path()).map_err(|err| {
        HarvestError::SourceRead {
            path: path.to_string(),
            message: err.to_string(),
        }
    })?;

    let headers = reader
        .headers()
        .map_err(|err| HarvestError::SourceRead {
            path: path.to_string(),
            message: err.to_string(),
        })?
        .clone();

    let id_idx = column_index(&headers, &columns.identifier, path)?;
    let primary_idx = column_index(&headers, &columns.primary_url, path)?;
    let alternative_idx = column_index(&headers, &columns.alternative_url, path)?;

    let mut records = Vec::new();
    for (row_number, row) in reader.records().enumerate() {
        let row = row.map_err(|err| HarvestError::SourceRead {
            path: path.to_string(),
            message: err.to_string(),
        })?;

        let id_cell = row.get(id_idx).unwrap_or("");
        let id = match id_cell.parse::<ReportId>() {
            Ok(id) => id,
            Err(_) => {
                warn!(row = row_number + 2, "skipping row with blank identifier");
                continue;
            }
        };

        records.push(Record::new(
            id,
            cell_value(&row, primary_idx),
            cell_value(&row, alternative_idx),
        ));
    }

    Ok(records)
}

fn column_index(
    headers: &StringRecord,
    name: &str,
    path: &Utf8Path,
) -> Result<usize, HarvestError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| HarvestError::SourceColumn {
            path: path.to_string(),
            column: name.to_string(),
        })
}

fn cell_value(row: &StringRecord, idx: usize) -> Option<String> {
    row.get(idx)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
