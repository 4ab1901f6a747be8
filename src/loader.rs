use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::codebook;
use crate::db::postgres::PostgresClient;
use crate::db::DbClient;
use crate::errors::DbError;
use crate::files;
use crate::models::config::{LoadConfig, SchemaMap};
use crate::models::schema::{Row, TableSchema};
use crate::order;
use crate::stream::RowStream;

/// Outcome of one table's load.
#[derive(Debug)]
pub struct TableReport {
    pub table_name: String,
    pub rows_inserted: u64,
    pub error: Option<String>,
}

/// Per-table results of a whole run. Reported, never persisted.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub tables: Vec<TableReport>,
}

/// Insert one batch, recovering from foreign-key violations by row-level
/// isolation and from length overflows by widening the schema and retrying
/// the batch exactly once. Returns rows actually committed, which may be
/// fewer than the batch under recovery or duplicate suppression.
pub async fn insert_batch(
    client: &dyn DbClient,
    schema: &TableSchema,
    columns: &[String],
    rows: &[Row],
) -> Result<u64, DbError> {
    match client.try_insert_rows(schema, columns, rows).await {
        Ok(inserted) => Ok(inserted),
        Err(DbError::ForeignKey(cause)) => {
            log::warn!(
                "foreign key violation in {}: inserting rows individually to skip orphans ({})",
                schema.table_name,
                cause
            );
            let mut inserted = 0u64;
            for row in rows {
                match client
                    .try_insert_rows(schema, columns, std::slice::from_ref(row))
                    .await
                {
                    Ok(n) => inserted += n,
                    // The orphan (or otherwise conflicting) row is dropped.
                    Err(DbError::ForeignKey(_)) | Err(DbError::Integrity(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(inserted)
        }
        Err(DbError::Truncation(cause)) => {
            log::warn!(
                "string truncation inserting into {}: widening text columns and retrying batch ({})",
                schema.table_name,
                cause
            );
            client.widen_text_columns(schema).await?;
            // One retry only; a second failure propagates.
            client.try_insert_rows(schema, columns, rows).await
        }
        Err(e) => Err(e),
    }
}

/// Stream one data file into its table, batch by batch, in file order.
pub async fn load_table(
    client: &dyn DbClient,
    schema: &TableSchema,
    path: &Path,
    batch_size: usize,
) -> Result<u64, DbError> {
    let mut stream = RowStream::open(schema, path, batch_size)?;
    let mut inserted = 0u64;
    while let Some(rows) = stream.next_batch()? {
        inserted += insert_batch(client, schema, stream.columns(), &rows).await?;
    }
    Ok(inserted)
}

/// One full load pass against a fresh connection.
pub async fn run(config: &LoadConfig, schema_map: &SchemaMap) -> Result<LoadReport, DbError> {
    if !config.data_dir.exists() {
        return Err(DbError::Config(format!(
            "input directory does not exist: {}",
            config.data_dir.display()
        )));
    }
    let client = PostgresClient::connect(&config.database_url).await?;
    run_with_client(&client, config, schema_map).await
}

/// Discover schemas, recreate tables, locate data files, and load every
/// matched table in dependency order. A single table's failure is recorded
/// in the report and never aborts the run.
pub async fn run_with_client(
    client: &dyn DbClient,
    config: &LoadConfig,
    schema_map: &SchemaMap,
) -> Result<LoadReport, DbError> {
    let codebooks = codebook::discover_codebooks(&config.codebook_dir)?;
    if codebooks.is_empty() {
        return Err(DbError::Config(format!(
            "no codebook tables discovered under {}",
            config.codebook_dir.display()
        )));
    }

    let mut schemas: BTreeMap<String, TableSchema> = BTreeMap::new();
    for (name, columns) in codebooks {
        let meta = schema_map.table(&name);
        let schema = TableSchema::build(&name, columns, &meta);
        schemas.insert(name, schema);
    }

    // Every run starts from an empty schema for all known tables. Parents
    // are created before children so REFERENCES clauses resolve; drops run
    // in the reverse order.
    let all_tables: Vec<String> = schemas.keys().cloned().collect();
    let create_order = order::load_order(&all_tables, schema_map);
    log::info!("dropping and recreating {} tables", create_order.len());

    let mut failed: HashMap<String, String> = HashMap::new();
    for name in create_order.iter().rev() {
        if let Err(e) = client.drop_table(name).await {
            log::error!("failed to drop {}: {}", name, e);
            failed.insert(name.clone(), e.to_string());
        }
    }
    for name in &create_order {
        if failed.contains_key(name) {
            continue;
        }
        let schema = &schemas[name];
        match client.create_table(schema).await {
            Ok(()) => {
                if let Err(e) = client.create_indexes(schema).await {
                    log::warn!("failed to create indexes for {}: {}", name, e);
                }
            }
            Err(e) => {
                log::error!("failed to create {}: {}", name, e);
                failed.insert(name.clone(), e.to_string());
            }
        }
    }

    let data_files = files::find_data_files(&config.data_dir)?;
    let matched: HashSet<String> = schemas
        .keys()
        .filter(|name| data_files.contains_key(name.as_str()))
        .cloned()
        .collect();
    log::info!(
        "discovered {} data files; {} match codebook tables",
        data_files.len(),
        matched.len()
    );

    let loadable: Vec<String> = all_tables
        .iter()
        .filter(|name| matched.contains(name.as_str()) && !failed.contains_key(name.as_str()))
        .cloned()
        .collect();

    let mut report = LoadReport::default();
    for name in order::load_order(&loadable, schema_map) {
        let schema = &schemas[&name];
        let path = &data_files[&name];
        log::info!("loading {} from {}", name, path.display());
        match load_table(client, schema, path, config.batch_size).await {
            Ok(count) => {
                log::info!("loaded {} rows into {}", count, name);
                report.tables.push(TableReport {
                    table_name: name,
                    rows_inserted: count,
                    error: None,
                });
            }
            Err(e) => {
                log::error!("error loading {}: {}", name, e);
                report.tables.push(TableReport {
                    table_name: name,
                    rows_inserted: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    for (name, error) in failed {
        report.tables.push(TableReport {
            table_name: name,
            rows_inserted: 0,
            error: Some(error),
        });
    }

    log::info!("load process complete");
    Ok(report)
}
