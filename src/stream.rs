use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::errors::DbError;
use crate::models::schema::{Row, TableSchema};

/// Forward-only reader of one tab-delimited extract file.
///
/// Values are trimmed, embedded NUL bytes removed, and empty strings mapped
/// to NULL. Rows missing a value in any supplied primary-key column are
/// dropped before they reach a batch. The stream is restartable only by
/// reopening the file.
pub struct RowStream {
    reader: BufReader<File>,
    /// Header columns that exist in the schema, in header order. Rows are
    /// positionally aligned with this list.
    columns: Vec<String>,
    /// For each header field, the row slot it feeds, if any.
    slots: Vec<Option<usize>>,
    /// Row slot of each supplied primary-key column; None when the key
    /// column never appears in the header, which drops every row.
    pk_slots: Vec<Option<usize>>,
    batch_size: usize,
    line: Vec<u8>,
    done: bool,
}

impl RowStream {
    pub fn open(schema: &TableSchema, path: &Path, batch_size: usize) -> Result<Self, DbError> {
        let file = File::open(path).map_err(|e| DbError::Io(e.to_string()))?;
        let mut reader = BufReader::new(file);

        let mut raw = Vec::new();
        let read = reader
            .read_until(b'\n', &mut raw)
            .map_err(|e| DbError::Io(e.to_string()))?;
        let header_line = decode_line(&raw);
        let header: Vec<&str> = header_line.split('\t').collect();

        let mut columns = Vec::new();
        let mut slots = Vec::with_capacity(header.len());
        let mut unmapped = Vec::new();
        if read > 0 {
            for field in &header {
                if schema.columns.iter().any(|c| c.name == *field) {
                    slots.push(Some(columns.len()));
                    columns.push(field.to_string());
                } else {
                    slots.push(None);
                    unmapped.push(field.to_string());
                }
            }
        }
        if !unmapped.is_empty() {
            log::warn!(
                "{}: {} header columns not in schema: {:?}{}",
                schema.table_name,
                unmapped.len(),
                &unmapped[..unmapped.len().min(5)],
                if unmapped.len() > 5 { "..." } else { "" }
            );
        }

        let pk_slots = schema
            .primary_key
            .iter()
            .map(|pk| columns.iter().position(|c| c == pk))
            .collect();

        Ok(RowStream {
            reader,
            columns,
            slots,
            pk_slots,
            batch_size,
            line: Vec::new(),
            done: read == 0,
        })
    }

    /// The shared column list every yielded row is aligned with.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The next batch of rows, or None once the file is exhausted. The last
    /// batch may be partial.
    pub fn next_batch(&mut self) -> Result<Option<Vec<Row>>, DbError> {
        if self.done || self.columns.is_empty() {
            return Ok(None);
        }

        let mut rows: Vec<Row> = Vec::with_capacity(self.batch_size);
        while rows.len() < self.batch_size {
            self.line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.line)
                .map_err(|e| DbError::Io(e.to_string()))?;
            if read == 0 {
                self.done = true;
                break;
            }
            let text = decode_line(&self.line);
            if text.is_empty() {
                continue;
            }

            let mut row: Row = vec![None; self.columns.len()];
            for (field, slot) in text.split('\t').zip(self.slots.iter()) {
                if let Some(slot) = *slot {
                    let value = field.trim().replace('\0', "");
                    if !value.is_empty() {
                        row[slot] = Some(value);
                    }
                }
            }

            // A row without a complete primary key cannot be loaded; such
            // rows are dropped, not reported.
            if self
                .pk_slots
                .iter()
                .any(|slot| slot.map_or(true, |s| row[s].is_none()))
            {
                continue;
            }
            rows.push(row);
        }

        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows))
        }
    }
}

/// Decode one raw line, replacing invalid UTF-8 and dropping only the
/// trailing newline.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::TableMeta;
    use crate::models::schema::ColumnSchema;
    use std::io::Write;
    use std::path::PathBuf;

    fn schema(table: &str, columns: &[&str], primary_key: &[&str]) -> TableSchema {
        let cols = columns
            .iter()
            .map(|name| ColumnSchema {
                name: name.to_string(),
                data_type: "varchar".to_string(),
                size: None,
                is_nullable: true,
                description: None,
            })
            .collect();
        let meta = TableMeta {
            primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        };
        TableSchema::build(table, cols, &meta)
    }

    fn write_data(body: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.txt");
        File::create(&path).unwrap().write_all(body).unwrap();
        (dir, path)
    }

    #[test]
    fn rows_missing_a_primary_key_value_are_dropped() {
        let schema = schema("accounts", &["acct", "name"], &["acct"]);
        let (_dir, path) = write_data(b"acct\tname\nA1\tAlice\n\tBob\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        let rows = stream.next_batch().unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec![Some("A1".to_string()), Some("Alice".to_string())]);
        assert!(stream.next_batch().unwrap().is_none());
    }

    #[test]
    fn values_are_trimmed_nul_stripped_and_empties_become_null() {
        let schema = schema("accounts", &["acct", "name", "note"], &[]);
        let (_dir, path) = write_data(b"acct\tname\tnote\n A1 \tAl\x00ice\t   \n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        let rows = stream.next_batch().unwrap().unwrap();
        assert_eq!(
            rows[0],
            vec![Some("A1".to_string()), Some("Alice".to_string()), None]
        );
    }

    #[test]
    fn batches_are_capped_and_the_last_is_partial() {
        let schema = schema("t", &["a"], &[]);
        let (_dir, path) = write_data(b"a\n1\n2\n3\n4\n5\n");

        let mut stream = RowStream::open(&schema, &path, 2).unwrap();
        assert_eq!(stream.next_batch().unwrap().unwrap().len(), 2);
        assert_eq!(stream.next_batch().unwrap().unwrap().len(), 2);
        assert_eq!(stream.next_batch().unwrap().unwrap().len(), 1);
        assert!(stream.next_batch().unwrap().is_none());
    }

    #[test]
    fn header_columns_not_in_schema_are_ignored() {
        let schema = schema("t", &["acct"], &[]);
        let (_dir, path) = write_data(b"acct\textra\nA1\tjunk\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        assert_eq!(stream.columns(), ["acct".to_string()]);
        let rows = stream.next_batch().unwrap().unwrap();
        assert_eq!(rows[0], vec![Some("A1".to_string())]);
    }

    #[test]
    fn missing_trailing_fields_are_null() {
        let schema = schema("t", &["a", "b"], &[]);
        let (_dir, path) = write_data(b"a\tb\nonly\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        let rows = stream.next_batch().unwrap().unwrap();
        assert_eq!(rows[0], vec![Some("only".to_string()), None]);
    }

    #[test]
    fn primary_key_absent_from_header_drops_every_row() {
        let schema = schema("t", &["acct", "name"], &["acct"]);
        let (_dir, path) = write_data(b"name\nAlice\nBob\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        assert!(stream.next_batch().unwrap().is_none());
    }

    #[test]
    fn no_overlap_with_schema_yields_nothing() {
        let schema = schema("t", &["acct"], &[]);
        let (_dir, path) = write_data(b"foo\tbar\n1\t2\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        assert!(stream.columns().is_empty());
        assert!(stream.next_batch().unwrap().is_none());
    }

    #[test]
    fn blank_lines_are_skipped_and_lossy_decode_survives_bad_utf8() {
        let schema = schema("t", &["a"], &[]);
        let (_dir, path) = write_data(b"a\n\n\xFFbad\n");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        let rows = stream.next_batch().unwrap().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].as_deref(), Some("\u{FFFD}bad"));
    }

    #[test]
    fn empty_file_yields_nothing() {
        let schema = schema("t", &["a"], &[]);
        let (_dir, path) = write_data(b"");

        let mut stream = RowStream::open(&schema, &path, 500).unwrap();
        assert!(stream.next_batch().unwrap().is_none());
    }
}
