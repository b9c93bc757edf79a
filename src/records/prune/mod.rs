
use tracing::{debug, info};

use super::Table;

/// Missing-value percentages and the outcome of a pruning pass
#[derive(Debug, Clone, PartialEq)]
pub struct PruneReport {
    pub threshold: f64,
    /// Per column, in column order
    pub column_missing_percent: Vec<(String, f64)>,
    /// Per row, in input order
    pub row_missing_percent: Vec<f64>,
    /// Input indices of the rows that were dropped
    pub dropped_rows: Vec<usize>,
    pub shape_before: (usize, usize),
    pub shape_after: (usize, usize),
}

/// Drop rows whose missing percentage is strictly greater than `threshold`
#[inline]
pub fn prune_missing(table: &Table, threshold: f64) -> (Table, PruneReport) {
    let (row_count, column_count) = table.shape();

    let column_missing_percent = table
        .missing_per_column()
        .into_iter()
        .map(|(name, missing)| (name, percent(missing, row_count)))
        .collect::<Vec<_>>();

    let row_missing_percent = table
        .rows()
        .iter()
        .map(|row| percent(row.missing_count(), column_count))
        .collect::<Vec<_>>();

    let dropped_rows = row_missing_percent
        .iter()
        .enumerate()
        .filter(|&(_, &pct)| pct > threshold)
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    let mut pruned = table.clone();
    pruned.retain_indexed(|index| dropped_rows.binary_search(&index).is_err());

    debug!("Missing percent per column: {:?}", column_missing_percent);
    info!(
        "Rows to drop (>{}% missing): {:?}; shape {:?} -> {:?}",
        threshold,
        dropped_rows,
        table.shape(),
        pruned.shape()
    );

    let report = PruneReport {
        threshold,
        column_missing_percent,
        row_missing_percent,
        dropped_rows,
        shape_before: table.shape(),
        shape_after: pruned.shape(),
    };

    (pruned, report)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
