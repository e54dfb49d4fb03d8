//! Confusion-table formatting.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};

/// Predicted label -> gold label -> count.
pub type ConfusionTable = BTreeMap<String, BTreeMap<String, usize>>;

/// Keys ordered by descending total, ties by key.
fn by_descending_total(totals: BTreeMap<&str, usize>) -> Vec<&str> {
    let mut keys: Vec<(&str, usize)> = totals.into_iter().collect();
    keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    keys.into_iter().map(|(key, _)| key).collect()
}

/// Row keys of `table`, largest row first.
pub fn sorted_rows(table: &ConfusionTable) -> Vec<&str> {
    by_descending_total(
        table
            .iter()
            .map(|(row, cells)| (row.as_str(), cells.values().sum()))
            .collect(),
    )
}

/// Column keys of `table`, largest column first.
pub fn sorted_columns(table: &ConfusionTable) -> Vec<&str> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for cells in table.values() {
        for (column, count) in cells {
            *totals.entry(column.as_str()).or_insert(0) += count;
        }
    }
    by_descending_total(totals)
}

/// Write `table` as a separated grid: a header of column keys after an
/// empty corner cell, then one row per row key. Absent cells are `0`.
pub fn write_sorted_table<W: Write>(
    mut writer: W,
    table: &ConfusionTable,
    separator: char,
) -> io::Result<()> {
    let columns = sorted_columns(table);
    for column in &columns {
        write!(writer, "{separator}{column}")?;
    }
    writeln!(writer)?;
    for row in sorted_rows(table) {
        write!(writer, "{row}")?;
        let cells = &table[row];
        for column in &columns {
            write!(writer, "{separator}{}", cells.get(*column).copied().unwrap_or(0))?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Every label appearing in `table`, as a row or a column.
pub fn labels(table: &ConfusionTable) -> BTreeSet<&str> {
    table
        .iter()
        .flat_map(|(row, cells)| {
            std::iter::once(row.as_str()).chain(cells.keys().map(String::as_str))
        })
        .collect()
}
