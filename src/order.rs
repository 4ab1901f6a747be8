use std::collections::{HashMap, VecDeque};

use crate::models::config::SchemaMap;

/// Order tables so foreign-key parents come before their children.
///
/// Kahn's algorithm over the in-set dependency edges; self-references and
/// parents outside the set add no edge. Tables left unresolved when the
/// queue drains (dependency cycles) are appended in their original relative
/// order, so every table appears exactly once but referential ordering for
/// the cyclic subset is best-effort only.
pub fn load_order(tables: &[String], schema_map: &SchemaMap) -> Vec<String> {
    let index: HashMap<&str, usize> = tables
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let mut in_degree = vec![0usize; tables.len()];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];

    for (child, table) in tables.iter().enumerate() {
        for fk in schema_map.foreign_keys(table) {
            if fk.parent_table == *table {
                continue;
            }
            if let Some(&parent) = index.get(fk.parent_table.as_str()) {
                children[parent].push(child);
                in_degree[child] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut placed = vec![false; tables.len()];
    let mut order: Vec<String> = Vec::with_capacity(tables.len());

    while let Some(current) = queue.pop_front() {
        placed[current] = true;
        order.push(tables[current].clone());
        for &child in &children[current] {
            in_degree[child] -= 1;
            if in_degree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    let unresolved: Vec<&String> = (0..tables.len())
        .filter(|&i| !placed[i])
        .map(|i| &tables[i])
        .collect();
    if !unresolved.is_empty() {
        log::warn!(
            "dependency order is best-effort; unresolved tables appended in input order: {:?}",
            unresolved
        );
        order.extend(unresolved.into_iter().cloned());
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::TableMeta;
    use crate::models::schema::ForeignKeySchema;
    use std::collections::HashMap;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn with_parents(entries: &[(&str, &[&str])]) -> SchemaMap {
        let mut tables = HashMap::new();
        for (table, parents) in entries {
            let meta = TableMeta {
                foreign_keys: parents
                    .iter()
                    .map(|parent| ForeignKeySchema {
                        columns: vec!["acct".to_string()],
                        parent_table: parent.to_string(),
                        parent_columns: vec!["acct".to_string()],
                    })
                    .collect(),
                ..Default::default()
            };
            tables.insert(table.to_string(), meta);
        }
        SchemaMap::new(tables)
    }

    #[test]
    fn parents_load_before_children() {
        let map = with_parents(&[
            ("building_res", &["real_acct"]),
            ("fixtures", &["building_res"]),
        ]);
        let order = load_order(
            &names(&["fixtures", "building_res", "real_acct"]),
            &map,
        );
        assert_eq!(order, names(&["real_acct", "building_res", "fixtures"]));
    }

    #[test]
    fn independent_tables_keep_input_order() {
        let map = SchemaMap::default();
        let input = names(&["c", "a", "b"]);
        assert_eq!(load_order(&input, &map), input);
    }

    #[test]
    fn cycle_members_appear_exactly_once() {
        let map = with_parents(&[("a", &["b"]), ("b", &["a"]), ("c", &[])]);
        let order = load_order(&names(&["a", "b", "c"]), &map);
        // c resolves; the cycle is appended in input order.
        assert_eq!(order, names(&["c", "a", "b"]));
    }

    #[test]
    fn self_references_are_ignored() {
        let map = with_parents(&[("parcel_tieback", &["parcel_tieback"])]);
        let order = load_order(&names(&["parcel_tieback"]), &map);
        assert_eq!(order, names(&["parcel_tieback"]));
    }

    #[test]
    fn parents_outside_the_set_do_not_block() {
        let map = with_parents(&[("land", &["real_acct"])]);
        let order = load_order(&names(&["land"]), &map);
        assert_eq!(order, names(&["land"]));
    }

    #[test]
    fn diamond_resolves_with_shared_parent_first() {
        let map = with_parents(&[
            ("jur_value", &["real_acct"]),
            ("owners", &["real_acct"]),
            ("deeds", &["real_acct", "owners"]),
        ]);
        let order = load_order(
            &names(&["deeds", "jur_value", "owners", "real_acct"]),
            &map,
        );
        let pos = |t: &str| order.iter().position(|x| x == t).unwrap();
        assert!(pos("real_acct") < pos("jur_value"));
        assert!(pos("real_acct") < pos("owners"));
        assert!(pos("owners") < pos("deeds"));
        assert_eq!(order.len(), 4);
    }
}
