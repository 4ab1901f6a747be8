use async_trait::async_trait;

use crate::errors::DbError;
use crate::models::schema::{Row, TableSchema};

pub mod postgres;
pub mod sql;

/// Storage operations the loader needs from a relational backend.
#[async_trait]
pub trait DbClient: Send + Sync {
    async fn execute(&self, query: &str) -> Result<(), DbError>;
    async fn drop_table(&self, table_name: &str) -> Result<(), DbError>;
    async fn create_table(&self, schema: &TableSchema) -> Result<(), DbError>;
    async fn create_indexes(&self, schema: &TableSchema) -> Result<(), DbError>;
    /// Insert `rows` in a single transaction, skipping duplicate keys when
    /// the table has a primary key. Returns the number of rows committed,
    /// which excludes duplicate-suppressed rows.
    async fn try_insert_rows(
        &self,
        schema: &TableSchema,
        columns: &[String],
        rows: &[Row],
    ) -> Result<u64, DbError>;
    /// Convert every non-primary-key bounded text column of the table to
    /// unbounded text.
    async fn widen_text_columns(&self, schema: &TableSchema) -> Result<(), DbError>;
}

#[derive(Debug, PartialEq, Eq)]
enum SqlStateClass {
    ForeignKey,
    Integrity,
    Truncation,
    Other,
}

fn classify_sqlstate(code: &str) -> SqlStateClass {
    match code {
        "23503" => SqlStateClass::ForeignKey,
        "22001" => SqlStateClass::Truncation,
        c if c.starts_with("23") => SqlStateClass::Integrity,
        _ => SqlStateClass::Other,
    }
}

/// Map an insert failure onto the recovery taxonomy by SQLSTATE.
pub(crate) fn classify_insert_error(err: sqlx::Error) -> DbError {
    let class = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| classify_sqlstate(&code))
        .unwrap_or(SqlStateClass::Other);
    match class {
        SqlStateClass::ForeignKey => DbError::ForeignKey(err.to_string()),
        SqlStateClass::Integrity => DbError::Integrity(err.to_string()),
        SqlStateClass::Truncation => DbError::Truncation(err.to_string()),
        SqlStateClass::Other => DbError::Sqlx(err),
    }
}
