use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::DbError;
use crate::models::schema::ForeignKeySchema;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Everything one load run needs to know.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Root directory containing extracted data files.
    pub data_dir: PathBuf,
    /// Directory containing the per-table codebook CSVs.
    pub codebook_dir: PathBuf,
    pub database_url: String,
    /// Rows accumulated before each batch insert.
    pub batch_size: usize,
}

/// Externally supplied key and index metadata for one table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableMeta {
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySchema>,
    #[serde(default)]
    pub indexes: Vec<Vec<String>>,
}

/// Immutable mapping from table name to its supplied metadata.
///
/// Tables absent from the map have no primary key, foreign keys, or
/// indexes. The map is passed by reference into the table builder and the
/// dependency orderer; it is never process-global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaMap {
    tables: HashMap<String, TableMeta>,
}

impl SchemaMap {
    pub fn new(tables: HashMap<String, TableMeta>) -> Self {
        SchemaMap { tables }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DbError> {
        let raw = std::fs::read_to_string(path).map_err(|e| DbError::Io(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| DbError::Config(e.to_string()))
    }

    pub fn get(&self, table_name: &str) -> Option<&TableMeta> {
        self.tables.get(table_name)
    }

    /// Metadata for a table, empty for tables not in the map.
    pub fn table(&self, table_name: &str) -> TableMeta {
        self.tables.get(table_name).cloned().unwrap_or_default()
    }

    pub fn foreign_keys(&self, table_name: &str) -> &[ForeignKeySchema] {
        self.tables
            .get(table_name)
            .map(|meta| meta.foreign_keys.as_slice())
            .unwrap_or(&[])
    }
}
