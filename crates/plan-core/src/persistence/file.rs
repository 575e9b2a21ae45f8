use super::{PersistenceError, PersistenceResult};
use crate::catalog::{Catalog, Chapter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Pick the reader from the file extension (`json` or `csv`).
pub fn load_catalog<P: AsRef<Path>>(path: P) -> PersistenceResult<Catalog> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("json") => load_catalog_from_json(path),
        Some("csv") => load_catalog_from_csv(path),
        _ => Err(PersistenceError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// A JSON array of chapter objects. Both the short field names and
/// `chapter_number`/`chapter_name_arabic`/`starting_page`/`ending_page` are accepted.
pub fn load_catalog_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Catalog> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let chapters: Vec<Chapter> = serde_json::from_reader(BufReader::new(file))?;
    let catalog = Catalog::new(chapters)?;
    tracing::debug!(path = %path.display(), chapters = catalog.len(), "loaded catalog");
    Ok(catalog)
}

pub fn load_catalog_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Catalog> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut chapters = Vec::new();
    for record in reader.deserialize::<Chapter>() {
        chapters.push(record?);
    }
    let catalog = Catalog::new(chapters)?;
    tracing::debug!(path = %path.display(), chapters = catalog.len(), "loaded catalog");
    Ok(catalog)
}

/// Exported table: title, header row and day rows as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableSnapshot {
    /// `table[0]` is taken as the header.
    pub fn new(title: impl Into<String>, table: &[Vec<String>]) -> Self {
        let (header, rows) = match table.split_first() {
            Some((header, rows)) => (header.clone(), rows.to_vec()),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            title: title.into(),
            header,
            rows,
        }
    }
}

pub fn save_table_to_json<P: AsRef<Path>>(
    snapshot: &TableSnapshot,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_table_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<TableSnapshot> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Header row first, then one record per day. The title is not written.
pub fn save_table_to_csv<P: AsRef<Path>>(
    snapshot: &TableSnapshot,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&snapshot.header)?;
    for row in &snapshot.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
