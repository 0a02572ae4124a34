//! Who-references-whom edges between source units.
//!
//! An edge `X -> Y` means X references Y: Y's symbols were made visible to
//! X, either through an include/inherit (merged) or because X resolved an
//! arrow into Y (not merged). Cycles are legitimate input; they are walked
//! with visited sets and never rejected.

use std::collections::VecDeque;

use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexMap;

use crate::unit::UnitId;

#[derive(Debug, Clone, Default)]
pub struct ReferenceMesh {
    /// Outgoing edges per unit, in registration order. The flag records
    /// whether the edge merged symbol tables.
    edges: FxHashMap<UnitId, IndexMap<UnitId, bool>>,
}

impl ReferenceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `to` can be reached from `from` along outgoing edges.
    /// A unit always reaches itself.
    pub fn reaches(&self, from: UnitId, to: UnitId) -> bool {
        self.reachable(from).contains(&to)
    }

    /// Breadth-first closure over outgoing edges, `start` included.
    pub fn reachable(&self, start: UnitId) -> Vec<UnitId> {
        let mut visited = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([start]);
        while let Some(unit) = queue.pop_front() {
            if !visited.insert(unit) {
                continue;
            }
            order.push(unit);
            if let Some(out) = self.edges.get(&unit) {
                queue.extend(out.keys().copied());
            }
        }
        order
    }

    /// Register `from -> to` unless `to` is already reachable from `from`.
    pub fn add_edge(&mut self, from: UnitId, to: UnitId, merged: bool) -> bool {
        if self.reaches(from, to) {
            log::trace!("{from:?} already reaches {to:?}");
            return false;
        }
        self.edges.entry(from).or_default().insert(to, merged);
        true
    }

    /// Direct references of `unit`.
    pub fn references(&self, unit: UnitId) -> impl Iterator<Item = (UnitId, bool)> + '_ {
        self.edges
            .get(&unit)
            .into_iter()
            .flat_map(|out| out.iter().map(|(to, merged)| (*to, *merged)))
    }

    /// Units with an edge to `unit`.
    pub fn referrers(&self, unit: UnitId) -> Vec<(UnitId, bool)> {
        let mut out: Vec<(UnitId, bool)> = self
            .edges
            .iter()
            .filter_map(|(from, edges)| edges.get(&unit).map(|merged| (*from, *merged)))
            .collect();
        out.sort();
        out
    }

    /// Drop and return the outgoing edges of `unit`.
    pub fn clear_references(&mut self, unit: UnitId) -> Vec<(UnitId, bool)> {
        self.edges
            .remove(&unit)
            .map(|out| out.into_iter().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: UnitId = UnitId(0);
    const B: UnitId = UnitId(1);
    const C: UnitId = UnitId(2);

    #[test]
    fn test_duplicate_edges_are_refused() {
        let mut mesh = ReferenceMesh::new();
        assert!(mesh.add_edge(A, B, true));
        assert!(!mesh.add_edge(A, B, true));
        assert_eq!(mesh.references(A).count(), 1);
    }

    #[test]
    fn test_transitive_edge_is_refused_but_cycle_is_kept() {
        let mut mesh = ReferenceMesh::new();
        assert!(mesh.add_edge(A, B, true));
        assert!(mesh.add_edge(B, C, true));
        // A already sees C through B.
        assert!(!mesh.add_edge(A, C, true));
        // Closing the loop is allowed.
        assert!(mesh.add_edge(C, A, true));
        assert_eq!(mesh.reachable(B), vec![B, C, A]);
    }

    #[test]
    fn test_clear_references_keeps_inbound_edges() {
        let mut mesh = ReferenceMesh::new();
        mesh.add_edge(A, B, true);
        mesh.add_edge(B, C, false);
        assert_eq!(mesh.clear_references(B), vec![(C, false)]);
        assert_eq!(mesh.referrers(B), vec![(A, true)]);
        assert!(!mesh.reaches(A, C));
    }
}
