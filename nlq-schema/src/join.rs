//! Join-path search over foreign-key relationships.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::resolve::normalize;
use crate::{Catalog, Relationship};

/// One `JOIN right ON left.left_column = right.right_column` hop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub left_table: String,
    pub left_column: String,
    pub right_table: String,
    pub right_column: String,
}

impl JoinStep {
    fn forward(rel: &Relationship) -> Self {
        Self {
            left_table: rel.from_table.clone(),
            left_column: rel.from_column.clone(),
            right_table: rel.to_table.clone(),
            right_column: rel.to_column.clone(),
        }
    }

    fn backward(rel: &Relationship) -> Self {
        Self {
            left_table: rel.to_table.clone(),
            left_column: rel.to_column.clone(),
            right_table: rel.from_table.clone(),
            right_column: rel.from_column.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JoinPath {
    pub steps: Vec<JoinStep>,
}

impl JoinPath {
    /// Tables in join order, starting with the source table.
    pub fn tables(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            out.push(first.left_table.as_str());
        }
        out.extend(self.steps.iter().map(|s| s.right_table.as_str()));
        out
    }

    /// True when `hint` names a join column (`col` or `table.col`) or an
    /// intermediate table of this path.
    pub fn uses(&self, hint: &str) -> bool {
        let hint = normalize(hint);
        let tables = self.tables();
        let intermediate = tables
            .iter()
            .skip(1)
            .take(tables.len().saturating_sub(2))
            .any(|t| normalize(t) == hint);
        intermediate
            || self.steps.iter().any(|s| {
                [
                    (&s.left_table, &s.left_column),
                    (&s.right_table, &s.right_column),
                ]
                .iter()
                .any(|(t, c)| {
                    normalize(c) == hint || format!("{}.{}", normalize(t), normalize(c)) == hint
                })
            })
    }
}

impl Catalog {
    /// Every shortest path from `from` to `to`, treating each relationship as an
    /// undirected edge. Parallel relationships yield distinct paths. At most
    /// `cap` paths are returned, in deterministic order.
    pub fn shortest_join_paths(&self, from: &str, to: &str, cap: usize) -> Vec<JoinPath> {
        if from == to || cap == 0 {
            return Vec::new();
        }

        let mut adjacency: BTreeMap<&str, Vec<JoinStep>> = BTreeMap::new();
        for rel in self.relationships() {
            if rel.from_table == rel.to_table {
                continue;
            }
            adjacency
                .entry(rel.from_table.as_str())
                .or_default()
                .push(JoinStep::forward(rel));
            adjacency
                .entry(rel.to_table.as_str())
                .or_default()
                .push(JoinStep::backward(rel));
        }

        let from_source = distances(&adjacency, from);
        let from_target = distances(&adjacency, to);
        let Some(&total) = from_source.get(to) else {
            return Vec::new();
        };

        let mut paths = Vec::new();
        let mut current = Vec::new();
        enumerate(
            &adjacency,
            &from_source,
            &from_target,
            total,
            from,
            to,
            cap,
            &mut current,
            &mut paths,
        );
        paths
    }
}

fn distances<'a>(
    adjacency: &'a BTreeMap<&str, Vec<JoinStep>>,
    start: &'a str,
) -> BTreeMap<&'a str, usize> {
    let mut dist = BTreeMap::new();
    let mut queue = VecDeque::new();
    dist.insert(start, 0usize);
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        let d = dist[node];
        for step in adjacency.get(node).into_iter().flatten() {
            let next = step.right_table.as_str();
            if !dist.contains_key(next) {
                dist.insert(next, d + 1);
                queue.push_back(next);
            }
        }
    }
    dist
}

#[allow(clippy::too_many_arguments)]
fn enumerate(
    adjacency: &BTreeMap<&str, Vec<JoinStep>>,
    from_source: &BTreeMap<&str, usize>,
    from_target: &BTreeMap<&str, usize>,
    total: usize,
    node: &str,
    target: &str,
    cap: usize,
    current: &mut Vec<JoinStep>,
    paths: &mut Vec<JoinPath>,
) {
    if paths.len() >= cap {
        return;
    }
    if node == target {
        paths.push(JoinPath {
            steps: current.clone(),
        });
        return;
    }
    let Some(&here) = from_source.get(node) else {
        return;
    };
    for step in adjacency.get(node).into_iter().flatten() {
        let next = step.right_table.as_str();
        let on_shortest = from_target
            .get(next)
            .is_some_and(|rest| here + 1 + rest == total);
        if !on_shortest {
            continue;
        }
        current.push(step.clone());
        enumerate(
            adjacency,
            from_source,
            from_target,
            total,
            next,
            target,
            cap,
            current,
            paths,
        );
        current.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, ColumnType, Table};

    fn id_table(name: &str, fks: &[&str]) -> Table {
        let mut t = Table::new(name).with_column(Column::new("id", ColumnType::Number).primary_key());
        for fk in fks {
            t = t.with_column(Column::new(*fk, ColumnType::Number));
        }
        t
    }

    #[test]
    fn direct_relationship_is_one_step_either_way() {
        let catalog = Catalog::new(
            vec![id_table("customers", &[]), id_table("orders", &["customer_id"])],
            vec![Relationship::new("orders", "customer_id", "customers", "id")],
        )
        .unwrap();

        let forward = catalog.shortest_join_paths("orders", "customers", 8);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].steps[0].left_column, "customer_id");

        let backward = catalog.shortest_join_paths("customers", "orders", 8);
        assert_eq!(backward.len(), 1);
        assert_eq!(backward[0].steps[0].left_table, "customers");
        assert_eq!(backward[0].steps[0].right_column, "customer_id");
    }

    #[test]
    fn parallel_foreign_keys_are_distinct_paths() {
        let catalog = Catalog::new(
            vec![
                id_table("products", &[]),
                id_table("orders", &["product_id", "gift_product_id"]),
            ],
            vec![
                Relationship::new("orders", "product_id", "products", "id"),
                Relationship::new("orders", "gift_product_id", "products", "id"),
            ],
        )
        .unwrap();
        let paths = catalog.shortest_join_paths("orders", "products", 8);
        assert_eq!(paths.len(), 2);
        let hinted: Vec<_> = paths.iter().filter(|p| p.uses("gift_product_id")).collect();
        assert_eq!(hinted.len(), 1);
    }

    #[test]
    fn two_hop_path_goes_through_intermediate() {
        let catalog = Catalog::new(
            vec![
                id_table("customers", &[]),
                id_table("orders", &["customer_id", "product_id"]),
                id_table("products", &[]),
            ],
            vec![
                Relationship::new("orders", "customer_id", "customers", "id"),
                Relationship::new("orders", "product_id", "products", "id"),
            ],
        )
        .unwrap();
        let paths = catalog.shortest_join_paths("customers", "products", 8);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].tables(), vec!["customers", "orders", "products"]);
        assert!(paths[0].uses("orders"));
        assert!(!paths[0].uses("customers"));
    }

    #[test]
    fn disconnected_tables_have_no_path() {
        let catalog =
            Catalog::new(vec![id_table("a", &[]), id_table("b", &[])], vec![]).unwrap();
        assert!(catalog.shortest_join_paths("a", "b", 8).is_empty());
    }
}
