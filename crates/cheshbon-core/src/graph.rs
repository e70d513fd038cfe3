//! Dependency graph.
//!
//! An edge `u -> v` means "v depends on u". Nodes are typed ids (`s:`,
//! `d:`, `c:`); edges are derived from declared `inputs`, including inputs
//! that do not resolve (a removed source must still appear as a node so its
//! surviving dependents can be found).
//!
//! Determinism rules:
//! - adjacency is `BTreeMap`/`BTreeSet`, so traversal order is the sorted
//!   id order
//! - among shortest paths of equal length, ties break by lexicographic
//!   comparison of the node-id sequence
//! - alternative-path enumeration is bounded: length at most shortest + 10,
//!   at most 10 paths counted
//!
//! Cycles indicate bad specs, not crashes. They are detected during
//! construction and reported; traversals tolerate them.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::limits::{ALT_PATH_LIMIT, ALT_PATH_SLACK};
use crate::model::{NodeId, ValidatedSpec};

/// Optional edge tag supplied by an external adapter.
///
/// Kernel semantics never depend on the tag; it is carried through so
/// reports can preserve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Flow,
    Derivation,
    Rename,
}

/// A directed dependency graph over typed node ids.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<NodeId>,
    dependents: BTreeMap<NodeId, BTreeSet<NodeId>>,
    dependencies: BTreeMap<NodeId, BTreeSet<NodeId>>,
    edge_kinds: BTreeMap<(NodeId, NodeId), EdgeKind>,
    cycles: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph of a validated spec and run cycle detection.
    pub fn from_spec(spec: &ValidatedSpec) -> Self {
        let mut g = DependencyGraph::default();
        for id in spec.spec.declared_ids() {
            g.nodes.insert(id);
        }
        for d in &spec.spec.derived {
            for input in &d.inputs {
                g.insert_edge(input.clone(), d.id.clone());
            }
        }
        for c in &spec.spec.constraints {
            for input in &c.inputs {
                g.insert_edge(input.clone(), c.id.clone());
            }
        }
        g.cycles = g.find_cycles();
        g
    }

    fn insert_edge(&mut self, from: NodeId, to: NodeId) {
        self.nodes.insert(from.clone());
        self.nodes.insert(to.clone());
        self.dependents.entry(from.clone()).or_default().insert(to.clone());
        self.dependencies.entry(to).or_default().insert(from);
    }

    /// Attach an adapter-supplied kind tag to an existing edge.
    pub fn set_edge_kind(&mut self, from: &NodeId, to: &NodeId, kind: EdgeKind) {
        if self
            .dependents
            .get(from)
            .map(|s| s.contains(to))
            .unwrap_or(false)
        {
            self.edge_kinds.insert((from.clone(), to.clone()), kind);
        }
    }

    pub fn edge_kind(&self, from: &NodeId, to: &NodeId) -> Option<EdgeKind> {
        self.edge_kinds.get(&(from.clone(), to.clone())).copied()
    }

    /// All tagged edges, sorted.
    pub fn tagged_edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId, EdgeKind)> {
        self.edge_kinds.iter().map(|((f, t), k)| (f, t, *k))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    pub fn direct_dependents(&self, id: &NodeId) -> BTreeSet<NodeId> {
        self.dependents.get(id).cloned().unwrap_or_default()
    }

    /// The inputs `id` declares, as graph edges.
    pub fn direct_dependencies(&self, id: &NodeId) -> BTreeSet<NodeId> {
        self.dependencies.get(id).cloned().unwrap_or_default()
    }

    /// BFS closure of dependents, excluding `id` itself (unless reachable
    /// through a cycle).
    pub fn transitive_dependents(&self, id: &NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<NodeId> = self.direct_dependents(id).into_iter().collect();
        while let Some(n) = queue.pop_front() {
            if seen.insert(n.clone()) {
                for next in self.direct_dependents(&n) {
                    if !seen.contains(&next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Detected cycles: each is the sorted member list of a strongly
    /// connected component with more than one node, or a self-loop.
    pub fn cycles(&self) -> &[Vec<NodeId>] {
        &self.cycles
    }

    /// The cycle containing `id`, if any.
    pub fn cycle_containing(&self, id: &NodeId) -> Option<&Vec<NodeId>> {
        self.cycles.iter().find(|c| c.binary_search(id).is_ok())
    }

    /// Deterministic shortest path from the nearest of `seeds` to `target`.
    ///
    /// Paths are compared by `(length, node-id sequence)`, so among equal
    /// lengths the lexicographically smallest sequence wins, including the
    /// choice of seed. Returns `None` when `target` is unreachable.
    pub fn shortest_path_from(
        &self,
        seeds: &BTreeSet<NodeId>,
        target: &NodeId,
    ) -> Option<Vec<NodeId>> {
        let mut heap: BinaryHeap<Reverse<(usize, Vec<NodeId>)>> = BinaryHeap::new();
        for seed in seeds {
            heap.push(Reverse((0, vec![seed.clone()])));
        }
        let mut done: BTreeSet<NodeId> = BTreeSet::new();
        while let Some(Reverse((len, path))) = heap.pop() {
            let last = path.last()?.clone();
            if &last == target {
                return Some(path);
            }
            if !done.insert(last.clone()) {
                continue;
            }
            for next in self.direct_dependents(&last) {
                if !done.contains(&next) {
                    let mut p = path.clone();
                    p.push(next);
                    heap.push(Reverse((len + 1, p)));
                }
            }
        }
        None
    }

    /// Enumerate simple paths from `seed` to `target` whose length is at
    /// most `shortest_len + ALT_PATH_SLACK`, in depth-first sorted-neighbor
    /// order, stopping after ALT_PATH_LIMIT paths.
    pub fn bounded_paths(
        &self,
        seed: &NodeId,
        target: &NodeId,
        shortest_len: usize,
    ) -> Vec<Vec<NodeId>> {
        let max_len = shortest_len + ALT_PATH_SLACK;
        let mut found = Vec::new();
        let mut prefix = vec![seed.clone()];
        self.walk_paths(seed, target, max_len, &mut prefix, &mut found);
        found
    }

    /// Number of simple paths within the enumeration bound.
    pub fn bounded_path_count(
        &self,
        seed: &NodeId,
        target: &NodeId,
        shortest_len: usize,
    ) -> usize {
        self.bounded_paths(seed, target, shortest_len).len()
    }

    fn walk_paths(
        &self,
        at: &NodeId,
        target: &NodeId,
        max_len: usize,
        prefix: &mut Vec<NodeId>,
        found: &mut Vec<Vec<NodeId>>,
    ) {
        if found.len() >= ALT_PATH_LIMIT {
            return;
        }
        if at == target {
            found.push(prefix.clone());
            return;
        }
        if prefix.len() - 1 == max_len {
            return;
        }
        for next in self.direct_dependents(at) {
            if prefix.contains(&next) {
                continue;
            }
            prefix.push(next.clone());
            self.walk_paths(&next, target, max_len, prefix, found);
            prefix.pop();
            if found.len() >= ALT_PATH_LIMIT {
                return;
            }
        }
    }

    /// Iterative Tarjan over nodes in sorted order.
    fn find_cycles(&self) -> Vec<Vec<NodeId>> {
        struct Frame {
            node: NodeId,
            neighbors: Vec<NodeId>,
            next: usize,
        }

        let mut index_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut lowlink: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut on_stack: BTreeSet<NodeId> = BTreeSet::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut next_index = 0usize;
        let mut cycles: Vec<Vec<NodeId>> = Vec::new();

        for start in &self.nodes {
            if index_of.contains_key(start) {
                continue;
            }
            let mut frames = vec![Frame {
                node: start.clone(),
                neighbors: self.direct_dependents(start).into_iter().collect(),
                next: 0,
            }];
            index_of.insert(start.clone(), next_index);
            lowlink.insert(start.clone(), next_index);
            next_index += 1;
            stack.push(start.clone());
            on_stack.insert(start.clone());

            loop {
                let step = match frames.last_mut() {
                    Some(frame) => {
                        if frame.next < frame.neighbors.len() {
                            let n = frame.neighbors[frame.next].clone();
                            frame.next += 1;
                            Ok((frame.node.clone(), n))
                        } else {
                            Err(frame.node.clone())
                        }
                    }
                    None => break,
                };
                match step {
                    Ok((cur, n)) => {
                        if !index_of.contains_key(&n) {
                            index_of.insert(n.clone(), next_index);
                            lowlink.insert(n.clone(), next_index);
                            next_index += 1;
                            stack.push(n.clone());
                            on_stack.insert(n.clone());
                            frames.push(Frame {
                                neighbors: self.direct_dependents(&n).into_iter().collect(),
                                node: n,
                                next: 0,
                            });
                        } else if on_stack.contains(&n) {
                            let l = lowlink[&cur].min(index_of[&n]);
                            lowlink.insert(cur, l);
                        }
                    }
                    Err(finished) => {
                        frames.pop();
                        if lowlink[&finished] == index_of[&finished] {
                            let mut component = Vec::new();
                            while let Some(top) = stack.pop() {
                                on_stack.remove(&top);
                                let done = top == finished;
                                component.push(top);
                                if done {
                                    break;
                                }
                            }
                            let is_self_loop = component.len() == 1
                                && self
                                    .direct_dependents(&component[0])
                                    .contains(&component[0]);
                            if component.len() > 1 || is_self_loop {
                                component.sort();
                                cycles.push(component);
                            }
                        }
                        if let Some(parent) = frames.last() {
                            let l = lowlink[&parent.node].min(lowlink[&finished]);
                            lowlink.insert(parent.node.clone(), l);
                        }
                    }
                }
            }
        }

        cycles.sort();
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{validate_spec, DerivedVariable, MappingSpec, SourceColumn};
    use serde_json::json;

    fn node(s: &str) -> NodeId {
        NodeId::parse(s).unwrap()
    }

    fn graph_of(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::default();
        for (u, v) in edges {
            g.insert_edge(node(u), node(v));
        }
        g.cycles = g.find_cycles();
        g
    }

    #[test]
    fn direct_and_transitive_dependents() {
        let g = graph_of(&[("s:A", "d:X"), ("d:X", "d:Y"), ("d:Y", "d:Z")]);
        let direct: BTreeSet<NodeId> = [node("d:X")].into();
        assert_eq!(g.direct_dependents(&node("s:A")), direct);
        let transitive: BTreeSet<NodeId> = [node("d:X"), node("d:Y"), node("d:Z")].into();
        assert_eq!(g.transitive_dependents(&node("s:A")), transitive);
        let inputs: BTreeSet<NodeId> = [node("d:Y")].into();
        assert_eq!(g.direct_dependencies(&node("d:Z")), inputs);
    }

    #[test]
    fn shortest_path_lexicographic_tie_break() {
        // Two length-2 routes from s:A to d:Z: via d:M and via d:N.
        let g = graph_of(&[("s:A", "d:M"), ("s:A", "d:N"), ("d:M", "d:Z"), ("d:N", "d:Z")]);
        let path = g
            .shortest_path_from(&[node("s:A")].into(), &node("d:Z"))
            .unwrap();
        assert_eq!(path, vec![node("s:A"), node("d:M"), node("d:Z")]);
    }

    #[test]
    fn shortest_path_prefers_shorter_over_lexicographic() {
        let g = graph_of(&[("s:A", "d:B"), ("d:B", "d:Z"), ("s:A", "d:Z")]);
        let path = g
            .shortest_path_from(&[node("s:A")].into(), &node("d:Z"))
            .unwrap();
        assert_eq!(path, vec![node("s:A"), node("d:Z")]);
    }

    #[test]
    fn nearest_seed_wins() {
        let g = graph_of(&[("s:A", "d:B"), ("d:B", "d:C"), ("d:X", "d:C")]);
        let path = g
            .shortest_path_from(&[node("s:A"), node("d:X")].into(), &node("d:C"))
            .unwrap();
        assert_eq!(path, vec![node("d:X"), node("d:C")]);
    }

    #[test]
    fn diamond_paths_enumerated_in_order() {
        let g = graph_of(&[("d:R", "d:A"), ("d:R", "d:B"), ("d:A", "d:C"), ("d:B", "d:C")]);
        let paths = g.bounded_paths(&node("d:R"), &node("d:C"), 2);
        assert_eq!(
            paths,
            vec![
                vec![node("d:R"), node("d:A"), node("d:C")],
                vec![node("d:R"), node("d:B"), node("d:C")],
            ]
        );
        assert_eq!(g.bounded_path_count(&node("d:R"), &node("d:C"), 2), 2);
    }

    #[test]
    fn path_count_capped() {
        // 5 parallel two-hop routes plus a direct edge: 6 paths, all within bound.
        let mut edges = vec![("d:R", "d:T")];
        let mids = ["d:m1", "d:m2", "d:m3", "d:m4", "d:m5"];
        for m in &mids {
            edges.push(("d:R", m));
            edges.push((m, "d:T"));
        }
        let g = graph_of(&edges);
        assert_eq!(g.bounded_path_count(&node("d:R"), &node("d:T"), 1), 6);
    }

    #[test]
    fn cycle_detected_and_sorted() {
        let g = graph_of(&[("d:A", "d:B"), ("d:B", "d:C"), ("d:C", "d:A"), ("s:X", "d:A")]);
        assert_eq!(g.cycles().len(), 1);
        assert_eq!(g.cycles()[0], vec![node("d:A"), node("d:B"), node("d:C")]);
        assert!(g.cycle_containing(&node("d:B")).is_some());
        assert!(g.cycle_containing(&node("s:X")).is_none());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let g = graph_of(&[("d:A", "d:A")]);
        assert_eq!(g.cycles().to_vec(), vec![vec![node("d:A")]]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph_of(&[("s:A", "d:X"), ("d:X", "d:Y")]);
        assert!(g.cycles().is_empty());
    }

    #[test]
    fn from_spec_includes_unresolved_inputs_as_nodes() {
        let spec = validate_spec(&MappingSpec {
            schema_version: "0.7".to_string(),
            sources: vec![SourceColumn {
                id: node("s:A"),
                name: "A".to_string(),
                ty: "string".to_string(),
            }],
            derived: vec![DerivedVariable {
                id: node("d:X"),
                name: "X".to_string(),
                ty: "string".to_string(),
                inputs: vec![node("s:A"), node("s:GONE")],
                transform_ref: None,
                params: json!({}),
            }],
            constraints: vec![],
        })
        .unwrap();
        let g = DependencyGraph::from_spec(&spec);
        assert!(g.contains(&node("s:GONE")));
        let expected: BTreeSet<NodeId> = [node("d:X")].into();
        assert_eq!(g.direct_dependents(&node("s:GONE")), expected);
    }

    #[test]
    fn edge_kind_preserved_only_for_real_edges() {
        let mut g = graph_of(&[("s:A", "d:X")]);
        g.set_edge_kind(&node("s:A"), &node("d:X"), EdgeKind::Derivation);
        g.set_edge_kind(&node("s:A"), &node("d:MISSING"), EdgeKind::Flow);
        assert_eq!(g.edge_kind(&node("s:A"), &node("d:X")), Some(EdgeKind::Derivation));
        assert_eq!(g.edge_kind(&node("s:A"), &node("d:MISSING")), None);
        assert_eq!(g.tagged_edges().count(), 1);
    }
}
