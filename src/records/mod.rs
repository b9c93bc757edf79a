// Record loading and preparation
// Reads the fight/article CSV into a table and drives the cleaning pipeline


pub mod cleaning;
pub mod fights;
pub mod json;
pub mod prune;

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::{RagError, Result};

pub use cleaning::{CleanRecord, clean_records, normalize_dates};
pub use fights::{FightSummary, FocusFight, derive_outcome, filter_focus_fights, summarize};
pub use json::{JsonMap, ParseOutcome, ParseStrategy, parse_mapping, safe_parse};
pub use prune::{PruneReport, prune_missing};

/// A single row; `None` marks a missing cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row {
    cells: Vec<Option<String>>,
}

impl Row {
    #[inline]
    pub fn new(cells: Vec<Option<String>>) -> Self {
        Self { cells }
    }

    #[inline]
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }

    #[inline]
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }
}

/// Tabular view of the source file with columns taken from its header row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// One row read through the table's column names
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl<'a> RecordView<'a> {
    /// Cell value for `column`, or `None` when the column is absent or the cell is missing
    #[inline]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.row.cells.get(index)?.as_deref()
    }
}

impl Table {
    /// Build a table, padding short rows with missing cells and truncating long ones
    #[inline]
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.cells.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(rows, columns)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    #[inline]
    pub fn records(&self) -> impl Iterator<Item = RecordView<'_>> {
        self.rows.iter().map(|row| RecordView {
            columns: &self.columns,
            row,
        })
    }

    /// Missing cells per column, in column order
    #[inline]
    pub fn missing_per_column(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let missing = self
                    .rows
                    .iter()
                    .filter(|row| row.cells[index].is_none())
                    .count();
                (name.clone(), missing)
            })
            .collect()
    }

    /// Collapse rows identical across all columns, keeping the first occurrence.
    /// Returns the number of rows removed.
    #[inline]
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<Row> = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.clone()));
        let removed = before - self.rows.len();
        if removed > 0 {
            debug!("Dropped {} duplicate rows", removed);
        }
        removed
    }

    /// Replace every cell of `column` with `map(cell)`. Unknown columns are left alone.
    pub(crate) fn map_column<F>(&mut self, column: &str, mut map: F)
    where
        F: FnMut(Option<&str>) -> Option<String>,
    {
        let Some(index) = self.columns.iter().position(|c| c == column) else {
            return;
        };
        for row in &mut self.rows {
            let mapped = map(row.cells[index].as_deref());
            row.cells[index] = mapped;
        }
    }

    /// Keep only the rows whose index satisfies `keep`
    pub(crate) fn retain_indexed<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize) -> bool,
    {
        let mut index = 0;
        self.rows.retain(|_| {
            let retained = keep(index);
            index += 1;
            retained
        });
    }
}

/// Cell values read as missing, matching the usual CSV NA markers
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

#[inline]
pub fn is_missing_token(value: &str) -> bool {
    MISSING_TOKENS.contains(&value)
}

/// Load the source CSV. Only an unreadable file is an error; malformed rows are skipped.
#[inline]
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        warn!("Failed to open source file {}: {}", path.display(), e);
        RagError::Io(e)
    })?;

    let table = read_table(file)?;
    info!(
        "Loaded {} (shape: {:?}, columns: {:?})",
        path.display(),
        table.shape(),
        table.columns()
    );
    Ok(table)
}

/// Read CSV from any reader, skipping rows that cannot be parsed
#[inline]
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = match csv_reader.headers() {
        Ok(headers) => headers.iter().map(|h| h.trim().to_string()).collect(),
        Err(e) if e.is_io_error() => {
            return Err(RagError::Data(format!("Failed to read header row: {}", e)));
        }
        Err(e) => {
            warn!("Unreadable header row, treating input as empty: {}", e);
            return Ok(Table::default());
        }
    };

    if columns.iter().all(String::is_empty) {
        debug!("Input has no header row");
        return Ok(Table::default());
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => {
                return Err(RagError::Data(format!("Failed to read source rows: {}", e)));
            }
            Err(e) => {
                warn!("Skipping malformed row {}: {}", line + 2, e);
                skipped += 1;
                continue;
            }
        };

        if record.len() > width {
            warn!(
                "Skipping row {}: expected {} fields, found {}",
                line + 2,
                width,
                record.len()
            );
            skipped += 1;
            continue;
        }

        let cells = record
            .iter()
            .map(|field| (!is_missing_token(field)).then(|| field.to_string()))
            .collect();
        rows.push(Row::new(cells));
    }

    if skipped > 0 {
        info!("Skipped {} malformed rows", skipped);
    }

    Ok(Table::new(columns, rows))
}

/// Cleaned records ready for chunking, plus what happened on the way
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub records: Vec<CleanRecord>,
    pub duplicates_removed: usize,
    pub prune_report: Option<PruneReport>,
}

/// Pipeline order: normalize dates, drop duplicates, optionally prune sparse rows, then clean.
#[inline]
pub fn prepare_dataset(mut table: Table, prune_threshold: Option<f64>) -> PreparedDataset {
    normalize_dates(&mut table);
    let duplicates_removed = table.drop_duplicates();

    let (table, prune_report) = match prune_threshold {
        Some(threshold) => {
            let (pruned, report) = prune_missing(&table, threshold);
            (pruned, Some(report))
        }
        None => (table, None),
    };

    let records = clean_records(&table);
    info!(
        "Prepared {} records ({} duplicates removed)",
        records.len(),
        duplicates_removed
    );

    PreparedDataset {
        records,
        duplicates_removed,
        prune_report,
    }
}
