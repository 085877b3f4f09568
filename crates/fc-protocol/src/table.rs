//! Tabulated result decoding
//!
//! Several commands and events return tables flattened into words:
//! `[columnCount, col1..colN, rowCount, cell(1,1)..cell(rowCount,columnCount)]`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// One table row, keyed by column name
pub type Row = HashMap<String, String>;

/// A decoded table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column names in wire order
    pub columns: Vec<String>,
    /// Rows in wire order
    pub rows: Vec<Row>,
}

impl Table {
    /// Decode a table starting at `offset`
    ///
    /// Returns the table and the offset of the first word after it.
    pub fn decode(words: &[String], offset: usize) -> Result<(Self, usize), TableError> {
        let mut pos = offset;

        let column_count = read_count(words, pos, "column")?;
        pos += 1;
        take(words, pos, column_count)?;
        let columns = words[pos..pos + column_count].to_vec();
        pos += column_count;

        let row_count = read_count(words, pos, "row")?;
        // Rows without columns carry no cells, so nothing bounds their count
        if column_count == 0 && row_count > 0 {
            return Err(TableError::InvalidCount {
                field: "row",
                offset: pos,
                value: words[pos].clone(),
            });
        }
        pos += 1;
        let cells = row_count
            .checked_mul(column_count)
            .ok_or_else(|| TableError::InvalidCount {
                field: "row",
                offset: pos - 1,
                value: words[pos - 1].clone(),
            })?;
        take(words, pos, cells)?;

        let rows = if column_count == 0 {
            Vec::new()
        } else {
            words[pos..pos + cells]
                .chunks(column_count)
                .map(|chunk| columns.iter().cloned().zip(chunk.iter().cloned()).collect())
                .collect()
        };
        pos += cells;

        Ok((Self { columns, rows }, pos))
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell values of one row in column order
    pub fn row_values<'a>(&'a self, row: &'a Row) -> impl Iterator<Item = &'a str> + 'a {
        self.columns
            .iter()
            .map(move |c| row.get(c).map(String::as_str).unwrap_or(""))
    }
}

/// Decode a table starting at the first word
pub fn tabulate(words: &[String]) -> Result<Table, TableError> {
    Table::decode(words, 0).map(|(table, _)| table)
}

fn read_count(words: &[String], offset: usize, field: &'static str) -> Result<usize, TableError> {
    let value = words.get(offset).ok_or(TableError::Truncated {
        offset,
        needed: 1,
        remaining: 0,
    })?;
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| TableError::InvalidCount {
            field,
            offset,
            value: value.clone(),
        })
}

fn take(words: &[String], offset: usize, needed: usize) -> Result<(), TableError> {
    let remaining = words.len().saturating_sub(offset);
    if remaining < needed {
        return Err(TableError::Truncated {
            offset,
            needed,
            remaining,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tabulate_players() {
        let table = tabulate(&words(&["2", "name", "score", "2", "alice", "10", "bob", "20"])).unwrap();

        assert_eq!(table.columns, vec!["name", "score"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["name"], "alice");
        assert_eq!(table.rows[0]["score"], "10");
        assert_eq!(table.rows[1]["name"], "bob");
        assert_eq!(table.rows[1]["score"], "20");
        assert_eq!(table.row_values(&table.rows[1]).collect::<Vec<_>>(), vec!["bob", "20"]);
    }

    #[test]
    fn test_decode_at_offset_reports_end() {
        let list = words(&["player.onLeave", "alice", "1", "kills", "1", "7", "trailing"]);
        let (table, end) = Table::decode(&list, 2).unwrap();

        assert_eq!(table.columns, vec!["kills"]);
        assert_eq!(table.rows[0]["kills"], "7");
        assert_eq!(end, 6);
        assert_eq!(list[end], "trailing");
    }

    #[test]
    fn test_empty_table() {
        let table = tabulate(&words(&["1", "name", "0"])).unwrap();
        assert_eq!(table.columns, vec!["name"]);
        assert!(table.is_empty());
    }

    #[test]
    fn test_negative_count() {
        let err = tabulate(&words(&["-1", "name"])).unwrap_err();
        assert!(matches!(err, TableError::InvalidCount { field: "column", offset: 0, .. }));
    }

    #[test]
    fn test_non_numeric_row_count() {
        let err = tabulate(&words(&["1", "name", "many"])).unwrap_err();
        assert!(matches!(err, TableError::InvalidCount { field: "row", offset: 2, .. }));
    }

    #[test]
    fn test_insufficient_cells() {
        let err = tabulate(&words(&["2", "name", "score", "2", "alice", "10", "bob"])).unwrap_err();
        assert_eq!(
            err,
            TableError::Truncated {
                offset: 4,
                needed: 4,
                remaining: 3
            }
        );
    }

    #[test]
    fn test_rows_without_columns_rejected() {
        let err = tabulate(&words(&["0", "1000000000000000000"])).unwrap_err();
        assert!(matches!(err, TableError::InvalidCount { field: "row", offset: 1, .. }));

        let table = tabulate(&words(&["0", "0"])).unwrap();
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_missing_row_count() {
        let err = tabulate(&words(&["1", "name"])).unwrap_err();
        assert!(matches!(err, TableError::Truncated { offset: 2, .. }));
    }
}
