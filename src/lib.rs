pub mod codebook;
pub mod db;
pub mod errors;
pub mod files;
pub mod loader;
pub mod models;
pub mod order;
pub mod stream;

pub use db::postgres::PostgresClient;
pub use db::DbClient;
pub use errors::DbError;
pub use loader::{LoadReport, TableReport};
pub use models::config::{LoadConfig, SchemaMap, TableMeta, DEFAULT_BATCH_SIZE};
pub use models::schema::{ColumnSchema, ForeignKeySchema, IndexSchema, Row, TableSchema};
