use serde::{Deserialize, Serialize};

use crate::models::config::TableMeta;

/// One row of values, positionally aligned with a batch's column list.
pub type Row = Vec<Option<String>>;

/// A column definition as parsed from a codebook source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub size: Option<u32>,
    pub is_nullable: bool,
    pub description: Option<String>,
}

impl ColumnSchema {
    /// Bounded sizes map to VARCHAR(n); everything else is stored as TEXT.
    pub fn sql_type(&self) -> String {
        match self.size {
            Some(n) if n > 0 => format!("VARCHAR({})", n),
            _ => "TEXT".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeySchema {
    pub columns: Vec<String>,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSchema {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    /// The supplied primary-key column list, verbatim. Stays empty when the
    /// table got a surrogate key, so the row streamer never filters on it.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeySchema>,
    pub indexes: Vec<IndexSchema>,
    /// Whether the DDL carries a synthetic `row_id` identity column as the
    /// sole primary key.
    pub surrogate_key: bool,
}

impl TableSchema {
    /// Combine codebook columns with supplied key and index metadata.
    ///
    /// Membership in the supplied primary key overrides the codebook's own
    /// nullability flag in both directions. An empty primary-key list gets a
    /// surrogate `row_id` identity column instead.
    pub fn build(table_name: &str, mut columns: Vec<ColumnSchema>, meta: &TableMeta) -> Self {
        for col in &mut columns {
            col.is_nullable = !meta.primary_key.contains(&col.name);
        }

        let surrogate_key = meta.primary_key.is_empty();
        if surrogate_key {
            log::warn!(
                "{} has no primary key in the schema map; adding surrogate row_id",
                table_name
            );
        }

        let indexes = meta
            .indexes
            .iter()
            .filter_map(|requested| {
                // The index name keeps the requested column list even when
                // some of those columns are unknown and get skipped.
                let name = format!("ix_{}_{}", table_name, requested.join("_"));
                let cols: Vec<String> = requested
                    .iter()
                    .filter(|c| columns.iter().any(|col| &col.name == *c))
                    .cloned()
                    .collect();
                if cols.is_empty() {
                    None
                } else {
                    Some(IndexSchema { name, columns: cols })
                }
            })
            .collect();

        TableSchema {
            table_name: table_name.to_string(),
            columns,
            primary_key: meta.primary_key.clone(),
            foreign_keys: meta.foreign_keys.clone(),
            indexes,
            surrogate_key,
        }
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.iter().any(|c| c == column)
    }

    /// Whether inserts should skip duplicate keys (declared or surrogate).
    pub fn has_primary_key(&self) -> bool {
        self.surrogate_key || !self.primary_key.is_empty()
    }

    /// The single-column foreign key attached to `column`, if any.
    ///
    /// The first definition naming the column wins; if that definition is a
    /// multi-column key, nothing is attached (composite referential
    /// integrity is not enforced by the store).
    pub fn column_reference(&self, column: &str) -> Option<&ForeignKeySchema> {
        let fk = self
            .foreign_keys
            .iter()
            .find(|fk| fk.columns.iter().any(|c| c == column))?;
        if fk.columns.len() == 1 && fk.parent_columns.len() == 1 {
            Some(fk)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, size: Option<u32>, is_nullable: bool) -> ColumnSchema {
        ColumnSchema {
            name: name.to_string(),
            data_type: "varchar".to_string(),
            size,
            is_nullable,
            description: None,
        }
    }

    fn fk(columns: &[&str], parent: &str, parent_columns: &[&str]) -> ForeignKeySchema {
        ForeignKeySchema {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            parent_table: parent.to_string(),
            parent_columns: parent_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn primary_key_membership_overrides_codebook_nullability() {
        let meta = TableMeta {
            primary_key: vec!["acct".to_string()],
            ..Default::default()
        };
        // The codebook says the opposite in both cases.
        let cols = vec![column("acct", Some(13), true), column("name", None, false)];
        let schema = TableSchema::build("owners", cols, &meta);

        assert!(!schema.columns[0].is_nullable);
        assert!(schema.columns[1].is_nullable);
        assert!(!schema.surrogate_key);
        assert!(schema.has_primary_key());
    }

    #[test]
    fn empty_primary_key_gets_surrogate() {
        let schema = TableSchema::build(
            "t_pp_e",
            vec![column("acct", None, true)],
            &TableMeta::default(),
        );

        assert!(schema.surrogate_key);
        assert!(schema.primary_key.is_empty());
        assert!(schema.has_primary_key());
        assert!(schema.columns[0].is_nullable);
    }

    #[test]
    fn single_column_foreign_key_attaches_to_column() {
        let meta = TableMeta {
            primary_key: vec!["acct".to_string(), "num".to_string()],
            foreign_keys: vec![fk(&["acct"], "real_acct", &["acct"])],
            ..Default::default()
        };
        let cols = vec![column("acct", Some(13), true), column("num", Some(3), true)];
        let schema = TableSchema::build("land", cols, &meta);

        let attached = schema.column_reference("acct").unwrap();
        assert_eq!(attached.parent_table, "real_acct");
        assert!(schema.column_reference("num").is_none());
    }

    #[test]
    fn first_matching_foreign_key_wins_even_when_composite() {
        let meta = TableMeta {
            primary_key: vec!["acct".to_string()],
            foreign_keys: vec![
                fk(&["acct", "bld_num"], "building_res", &["acct", "bld_num"]),
                fk(&["acct"], "real_acct", &["acct"]),
            ],
            ..Default::default()
        };
        let cols = vec![column("acct", Some(13), true), column("bld_num", Some(3), true)];
        let schema = TableSchema::build("fixtures", cols, &meta);

        // The composite key is found first, so no column-level reference is
        // attached; it still participates in dependency ordering.
        assert!(schema.column_reference("acct").is_none());
        assert_eq!(schema.foreign_keys.len(), 2);
    }

    #[test]
    fn indexes_skip_unknown_columns_but_keep_requested_name() {
        let meta = TableMeta {
            primary_key: vec!["acct".to_string()],
            indexes: vec![
                vec!["yr_blt".to_string()],
                vec!["nope".to_string()],
                vec!["yr_blt".to_string(), "nope".to_string()],
            ],
            ..Default::default()
        };
        let cols = vec![column("acct", Some(13), true), column("yr_blt", Some(4), true)];
        let schema = TableSchema::build("building_res", cols, &meta);

        assert_eq!(schema.indexes.len(), 2);
        assert_eq!(schema.indexes[0].name, "ix_building_res_yr_blt");
        assert_eq!(schema.indexes[1].name, "ix_building_res_yr_blt_nope");
        assert_eq!(schema.indexes[1].columns, vec!["yr_blt".to_string()]);
    }

    #[test]
    fn sql_type_bounds() {
        assert_eq!(column("a", Some(13), true).sql_type(), "VARCHAR(13)");
        assert_eq!(column("a", Some(0), true).sql_type(), "TEXT");
        assert_eq!(column("a", None, true).sql_type(), "TEXT");
    }
}
