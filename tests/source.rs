use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use report_harvester::config::SourceColumns;
use report_harvester::error::HarvestError;
use report_harvester::source::load_records;

fn write_table(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("source.csv")).unwrap();
    fs::write(path.as_std_path(), content).unwrap();
    path
}

#[test]
fn loads_records_with_default_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(
        &dir,
        "BRnum,Pdf_URL,Report Html Address\nBR1,https://x/a.pdf,https://x/a.html\nBR2,,\n",
    );

    let records = load_records(&path, &SourceColumns::default()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id.as_str(), "BR1");
    assert_eq!(records[0].primary_url.as_deref(), Some("https://x/a.pdf"));
    assert_eq!(
        records[0].alternative_url.as_deref(),
        Some("https://x/a.html")
    );
    assert_eq!(records[1].primary_url, None);
    assert_eq!(records[1].alternative_url, None);
}

#[test]
fn loads_records_with_custom_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(&dir, "id,main,backup\nBR7,https://x/r.pdf,\n");
    let columns = SourceColumns {
        identifier: "id".to_string(),
        primary_url: "main".to_string(),
        alternative_url: "backup".to_string(),
    };

    let records = load_records(&path, &columns).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_str(), "BR7");
}

#[test]
fn whitespace_url_cells_load_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(
        &dir,
        "BRnum,Pdf_URL,Report Html Address\nBR1,   ,  \n",
    );

    let records = load_records(&path, &SourceColumns::default()).unwrap();
    assert_eq!(records[0].primary_url, None);
    assert_eq!(records[0].alternative_url, None);
}

#[test]
fn blank_identifier_rows_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(
        &dir,
        "BRnum,Pdf_URL,Report Html Address\n ,https://x/a.pdf,\nBR2,,\n",
    );

    let records = load_records(&path, &SourceColumns::default()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_str(), "BR2");
}

#[test]
fn missing_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_table(&dir, "BRnum,Pdf_URL\nBR1,https://x/a.pdf\n");

    let err = load_records(&path, &SourceColumns::default()).unwrap_err();
    assert_matches!(err, HarvestError::SourceColumn { column, .. } if column == "Report Html Address");
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.csv")).unwrap();

    let err = load_records(&path, &SourceColumns::default()).unwrap_err();
    assert_matches!(err, HarvestError::SourceRead { .. });
}
