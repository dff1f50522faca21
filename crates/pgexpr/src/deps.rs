//! Ordering tables by foreign-key dependency.
//!
//! A column reference makes its table *require* the referenced table. The
//! create order lists every table after all tables it requires; the drop
//! order is its reverse. Tables reachable through references but missing
//! from the input are added automatically.

use crate::error::DependencyError;
use crate::schema::{Catalog, TableId};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// The requires-graph over every table reachable from the input.
struct Graph {
    /// Tables in discovery order; edges refer to positions in this list.
    nodes: Vec<TableId>,
    /// `(from, to)`: `from` requires `to`.
    edges: BTreeSet<(usize, usize)>,
}

impl Graph {
    fn build(catalog: &Catalog, tables: &[TableId]) -> Result<Self, DependencyError> {
        let mut nodes: Vec<TableId> = Vec::new();
        let mut index: HashMap<TableId, usize> = HashMap::new();
        let mut edges = BTreeSet::new();
        let mut queue = VecDeque::new();

        for &id in tables {
            if catalog.get(id).is_none() {
                return Err(DependencyError::UnknownTable(id));
            }
            if !index.contains_key(&id) {
                index.insert(id, nodes.len());
                nodes.push(id);
                queue.push_back(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            let table = catalog.get(id).ok_or(DependencyError::UnknownTable(id))?;
            let from = index[&id];

            for reference in table.columns.iter().filter_map(|c| c.reference.as_ref()) {
                let target = reference.table;
                if target == id {
                    continue;
                }
                let target_table = catalog
                    .get(target)
                    .ok_or(DependencyError::UnknownTable(target))?;

                let to = match index.get(&target) {
                    Some(&to) => to,
                    None => {
                        let to = nodes.len();
                        index.insert(target, to);
                        nodes.push(target);
                        queue.push_back(target);
                        to
                    }
                };

                if edges.contains(&(to, from)) {
                    return Err(DependencyError::Bidirectional {
                        first: table.display_name(),
                        second: target_table.display_name(),
                    });
                }
                edges.insert((from, to));
            }
        }

        Ok(Self { nodes, edges })
    }

    /// Kahn's algorithm: each round takes every remaining table that requires
    /// nothing still remaining, in discovery order.
    fn sort(mut self, catalog: &Catalog) -> Result<Vec<TableId>, DependencyError> {
        let mut remaining: BTreeSet<usize> = (0..self.nodes.len()).collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while !remaining.is_empty() {
            let ready: BTreeSet<usize> = remaining
                .iter()
                .copied()
                .filter(|&n| !self.edges.iter().any(|&(from, _)| from == n))
                .collect();

            if ready.is_empty() {
                return Err(self.cycle(catalog, &remaining));
            }

            order.extend(ready.iter().map(|&n| self.nodes[n]));
            remaining.retain(|n| !ready.contains(n));
            self.edges.retain(|(_, to)| !ready.contains(to));
        }

        Ok(order)
    }

    /// Every remaining table has an outgoing edge, so following the smallest
    /// edge from any of them must revisit a table.
    fn cycle(&self, catalog: &Catalog, remaining: &BTreeSet<usize>) -> DependencyError {
        let mut path: Vec<usize> = Vec::new();
        let mut current = remaining.first().copied();

        while let Some(n) = current {
            if let Some(start) = path.iter().position(|&p| p == n) {
                let mut names: Vec<String> =
                    path[start..].iter().map(|&p| self.name(catalog, p)).collect();
                names.push(self.name(catalog, n));
                return DependencyError::Cycle { path: names };
            }
            path.push(n);
            current = self
                .edges
                .range((n, 0)..=(n, usize::MAX))
                .map(|&(_, to)| to)
                .next();
        }

        DependencyError::Cycle {
            path: remaining.iter().map(|&n| self.name(catalog, n)).collect(),
        }
    }

    fn name(&self, catalog: &Catalog, n: usize) -> String {
        let id = self.nodes[n];
        catalog
            .get(id)
            .map_or_else(|| id.to_string(), |t| t.display_name())
    }
}

/// Tables in creation order: each after every table it references.
pub fn create_order(catalog: &Catalog, tables: &[TableId]) -> Result<Vec<TableId>, DependencyError> {
    let result = Graph::build(catalog, tables).and_then(|graph| graph.sort(catalog));

    #[cfg(feature = "tracing")]
    log_order(catalog, &result);

    result
}

#[cfg(feature = "tracing")]
fn log_order(catalog: &Catalog, result: &Result<Vec<TableId>, DependencyError>) {
    match result {
        Ok(order) => tracing::debug!(
            target: "pgexpr.deps",
            tables = ?order
                .iter()
                .filter_map(|&id| catalog.get(id).map(|t| t.display_name()))
                .collect::<Vec<_>>(),
            "resolved table order",
        ),
        Err(err) => tracing::warn!(target: "pgexpr.deps", error = %err, "cannot order tables"),
    }
}

/// Tables in drop order: the reverse of [`create_order`].
pub fn drop_order(catalog: &Catalog, tables: &[TableId]) -> Result<Vec<TableId>, DependencyError> {
    let mut order = create_order(catalog, tables)?;
    order.reverse();
    Ok(order)
}
