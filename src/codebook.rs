use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::errors::DbError;
use crate::models::schema::ColumnSchema;

/// Codebook sources are named `<table_name>_columns.csv`.
pub const CODEBOOK_SUFFIX: &str = "_columns.csv";

/// Commentary rows in the codebook describe the whole extract rather than a
/// column and must not become columns.
const NON_DATA_MARKER: &str = "all records";

fn position(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Parse one codebook CSV into an ordered column list.
///
/// Duplicate names keep the first occurrence, commentary rows and rows
/// without a name are skipped. A column is not-nullable only when the
/// codebook says exactly "NO"; anything else, or an absent flag, means
/// nullable.
pub fn parse_codebook(path: &Path) -> Result<Vec<ColumnSchema>, DbError> {
    let file = File::open(path).map_err(|e| DbError::Io(e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| DbError::Codebook(e.to_string()))?
        .clone();

    let name_idx = ["Column Name", "Column", "name"]
        .iter()
        .find_map(|h| position(&headers, h));
    let type_idx = position(&headers, "Data Type");
    let size_idx = position(&headers, "Size");
    let null_idx = position(&headers, "Allow Null");
    let desc_idx = position(&headers, "Description");

    let mut columns: Vec<ColumnSchema> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for record in reader.records() {
        let record = record.map_err(|e| DbError::Codebook(e.to_string()))?;

        let name = name_idx
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string();
        if name.is_empty() || seen.contains(&name) {
            continue;
        }
        if name.to_lowercase().starts_with(NON_DATA_MARKER) {
            continue;
        }
        seen.insert(name.clone());

        let data_type = type_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("varchar")
            .to_lowercase();
        let size = size_idx
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u32>().ok());
        let is_nullable = null_idx
            .and_then(|i| record.get(i))
            .map(|v| !v.trim().eq_ignore_ascii_case("NO"))
            .unwrap_or(true);
        let description = desc_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        columns.push(ColumnSchema {
            name,
            data_type,
            size,
            is_nullable,
            description,
        });
    }

    Ok(columns)
}

/// Discover and parse every codebook under `dir`, keyed by table name.
///
/// Files that fail to parse, or that yield no columns, are logged and
/// skipped; one malformed codebook never hides the rest.
pub fn discover_codebooks(dir: &Path) -> Result<BTreeMap<String, Vec<ColumnSchema>>, DbError> {
    let entries = std::fs::read_dir(dir).map_err(|e| DbError::Io(e.to_string()))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(CODEBOOK_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    let mut mapping = BTreeMap::new();
    for path in paths {
        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let table_name = match file_name.strip_suffix(CODEBOOK_SUFFIX) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        match parse_codebook(&path) {
            Ok(columns) if columns.is_empty() => {
                log::warn!("{}: no column definitions found; table skipped", path.display());
            }
            Ok(columns) => {
                mapping.insert(table_name, columns);
            }
            Err(e) => {
                log::warn!("failed to parse {}: {}", path.display(), e);
            }
        }
    }
    Ok(mapping)
}
