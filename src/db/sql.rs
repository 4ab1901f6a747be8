//! SQL statement builders. Pure string construction so every statement the
//! loader can issue is testable without a database.

use crate::models::schema::{IndexSchema, TableSchema};

/// Name of the synthetic identity column used when a table declares no
/// primary key.
pub const SURROGATE_COLUMN: &str = "row_id";

/// Double-quote an identifier, escaping embedded quotes. Codebook column
/// names are mixed-case, so every identifier is quoted.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// CREATE TABLE statement for a built schema.
///
/// Single-column foreign keys render as inline REFERENCES; multi-column
/// foreign keys are not enforced by the store. The surrogate key renders as
/// a SERIAL column.
pub fn create_table_sql(schema: &TableSchema) -> String {
    let mut parts: Vec<String> = Vec::new();
    if schema.surrogate_key {
        parts.push(format!("{} SERIAL", quote_ident(SURROGATE_COLUMN)));
    }
    for col in &schema.columns {
        let mut part = format!("{} {}", quote_ident(&col.name), col.sql_type());
        if !col.is_nullable {
            part.push_str(" NOT NULL");
        }
        if let Some(fk) = schema.column_reference(&col.name) {
            part.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(&fk.parent_table),
                quote_ident(&fk.parent_columns[0])
            ));
        }
        parts.push(part);
    }

    let pk_cols: Vec<String> = if schema.surrogate_key {
        vec![quote_ident(SURROGATE_COLUMN)]
    } else {
        // Declared order of the columns, matching the DDL above.
        schema
            .columns
            .iter()
            .filter(|c| schema.is_primary_key(&c.name))
            .map(|c| quote_ident(&c.name))
            .collect()
    };
    if !pk_cols.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", pk_cols.join(", ")));
    }

    format!(
        "CREATE TABLE {} ({})",
        quote_ident(&schema.table_name),
        parts.join(", ")
    )
}

/// CASCADE so child constraints from a previous run never block recreation.
pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(table_name))
}

pub fn create_index_sql(table_name: &str, index: &IndexSchema) -> String {
    let cols: Vec<String> = index.columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "CREATE INDEX {} ON {} ({})",
        quote_ident(&index.name),
        quote_ident(table_name),
        cols.join(", ")
    )
}

/// Multi-row INSERT with positional bind placeholders.
pub fn insert_sql(
    table_name: &str,
    columns: &[String],
    row_count: usize,
    skip_duplicates: bool,
) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let mut values: Vec<String> = Vec::with_capacity(row_count);
    let mut param = 1;
    for _ in 0..row_count {
        let placeholders: Vec<String> = (0..columns.len())
            .map(|_| {
                let p = format!("${}", param);
                param += 1;
                p
            })
            .collect();
        values.push(format!("({})", placeholders.join(", ")));
    }
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table_name),
        cols.join(", "),
        values.join(", ")
    );
    if skip_duplicates {
        sql.push_str(" ON CONFLICT DO NOTHING");
    }
    sql
}

/// One ALTER TABLE converting every non-primary-key column of the table to
/// TEXT, or None when there is nothing to widen.
pub fn widen_sql(schema: &TableSchema) -> Option<String> {
    let alters: Vec<String> = schema
        .columns
        .iter()
        .filter(|c| !schema.is_primary_key(&c.name))
        .map(|c| format!("ALTER COLUMN {} TYPE TEXT", quote_ident(&c.name)))
        .collect();
    if alters.is_empty() {
        return None;
    }
    Some(format!(
        "ALTER TABLE {} {}",
        quote_ident(&schema.table_name),
        alters.join(", ")
    ))
}
