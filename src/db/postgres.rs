use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::db::{classify_insert_error, sql, DbClient};
use crate::errors::DbError;
use crate::models::schema::{Row, TableSchema};

/// Postgres accepts at most 65535 bind parameters per statement; wide
/// tables get their batches split across statements inside one transaction.
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PostgresClient {
    pub pool: PgPool,
}

impl PostgresClient {
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DbClient for PostgresClient {
    async fn execute(&self, query: &str) -> Result<(), DbError> {
        sqlx::query(query)
            .execute(&self.pool)
            .await
            .map_err(DbError::Sqlx)?;
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> Result<(), DbError> {
        self.execute(&sql::drop_table_sql(table_name)).await
    }

    async fn create_table(&self, schema: &TableSchema) -> Result<(), DbError> {
        self.execute(&sql::create_table_sql(schema)).await
    }

    async fn create_indexes(&self, schema: &TableSchema) -> Result<(), DbError> {
        for index in &schema.indexes {
            self.execute(&sql::create_index_sql(&schema.table_name, index))
                .await?;
        }
        Ok(())
    }

    async fn try_insert_rows(
        &self,
        schema: &TableSchema,
        columns: &[String],
        rows: &[Row],
    ) -> Result<u64, DbError> {
        if rows.is_empty() || columns.is_empty() {
            return Ok(0);
        }
        let rows_per_statement = (MAX_BIND_PARAMS / columns.len()).max(1);

        let mut tx = self.pool.begin().await.map_err(DbError::Sqlx)?;
        let mut inserted = 0u64;
        for chunk in rows.chunks(rows_per_statement) {
            let statement = sql::insert_sql(
                &schema.table_name,
                columns,
                chunk.len(),
                schema.has_primary_key(),
            );
            let mut query = sqlx::query(&statement);
            for row in chunk {
                for value in row {
                    query = query.bind(value.as_deref());
                }
            }
            let result = query
                .execute(&mut *tx)
                .await
                .map_err(classify_insert_error)?;
            inserted += result.rows_affected();
        }
        tx.commit().await.map_err(DbError::Sqlx)?;

        Ok(inserted)
    }

    async fn widen_text_columns(&self, schema: &TableSchema) -> Result<(), DbError> {
        match sql::widen_sql(schema) {
            Some(statement) => {
                log::info!("widening text columns of {}", schema.table_name);
                self.execute(&statement).await
            }
            None => {
                log::info!("{}: no text columns to widen", schema.table_name);
                Ok(())
            }
        }
    }
}
