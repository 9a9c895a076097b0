//! Block-local Liveness
//!
//! Liveness is computed per basic block only. A variable's interval runs from
//! the first instruction in the block that references it to the last one;
//! values crossing block boundaries travel through memory, so nothing wider
//! is needed.
//!
//! # Interference
//!
//! Two variables interfere when, for the ordered pair `(i, j)`,
//! `end_i >= start_j && start_i <= start_j`. Checked over all ordered pairs
//! this is exactly closed-interval overlap.

use crate::backend::ir::{Instr, Variable};
use std::collections::{BTreeSet, HashSet};
use std::ops::Range;

/// Variables referenced in a block, first appearance first
pub fn collect_variables(instrs: &[Instr], range: Range<usize>) -> Vec<Variable> {
    let mut seen: HashSet<&Variable> = HashSet::new();
    let mut vars = Vec::new();

    for instr in &instrs[range] {
        for var in instr.variables() {
            if seen.insert(var) {
                vars.push(var.clone());
            }
        }
    }

    vars
}

/// First and last referencing instruction, as absolute indices
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveInterval {
    pub start: usize,
    pub end: usize,
}

impl LiveInterval {
    pub fn overlaps(&self, other: &LiveInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// One interval per variable, in the order of `vars`
///
/// A variable never referenced in the range gets `[range.start, range.start]`.
pub fn compute_liveness(vars: &[Variable], instrs: &[Instr], range: Range<usize>) -> Vec<LiveInterval> {
    vars.iter()
        .map(|var| {
            let mut interval: Option<LiveInterval> = None;
            for index in range.clone() {
                if instrs[index].references(var) {
                    interval = Some(match interval {
                        None => LiveInterval {
                            start: index,
                            end: index,
                        },
                        Some(live) => LiveInterval { end: index, ..live },
                    });
                }
            }
            interval.unwrap_or(LiveInterval {
                start: range.start,
                end: range.start,
            })
        })
        .collect()
}

/// Undirected interference graph over node indices `0..n`
#[derive(Clone, Debug, Default)]
pub struct InterferenceGraph {
    /// Adjacency sets; index `i` holds the neighbors of node `i`
    adjacency: Vec<BTreeSet<usize>>,
}

impl InterferenceGraph {
    /// A graph with `n` isolated nodes
    pub fn with_nodes(n: usize) -> Self {
        Self {
            adjacency: vec![BTreeSet::new(); n],
        }
    }

    /// Build from live intervals; node `i` is `intervals[i]`
    pub fn build(intervals: &[LiveInterval]) -> Self {
        let mut graph = Self::with_nodes(intervals.len());

        for (i, a) in intervals.iter().enumerate() {
            for (j, b) in intervals.iter().enumerate() {
                if i != j && a.end >= b.start && a.start <= b.start {
                    graph.add_edge(i, j);
                }
            }
        }

        graph
    }

    /// Add an edge between two nodes
    pub fn add_edge(&mut self, a: usize, b: usize) {
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
    }

    pub fn interferes(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    /// Get neighbors of a node
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[node].iter().copied()
    }

    /// Get the degree (number of neighbors) of a node
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Detach a node from all its neighbors; the index stays valid
    pub fn remove_node(&mut self, node: usize) {
        let neighbors = std::mem::take(&mut self.adjacency[node]);
        for n in neighbors {
            self.adjacency[n].remove(&node);
        }
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ir::{BinaryOp, InstrKind, Value};
    use crate::common::types::Type;

    fn var(name: &str) -> Variable {
        Variable::local(name, Type::LONG)
    }

    fn make_block() -> Vec<Instr> {
        // 0: a = 1
        // 1: b = 2
        // 2: c = a + b
        // 3: return c
        vec![
            Instr::new(InstrKind::Copy {
                dst: var("a"),
                src: Value::Lit(1),
            }),
            Instr::new(InstrKind::Copy {
                dst: var("b"),
                src: Value::Lit(2),
            }),
            Instr::new(InstrKind::Binary {
                result: var("c"),
                op: BinaryOp::Add,
                left: Value::Var(var("a")),
                right: Value::Var(var("b")),
            }),
            Instr::new(InstrKind::Return {
                value: Some(Value::Var(var("c"))),
                is_last: true,
            }),
        ]
    }

    #[test]
    fn test_collect_in_first_appearance_order() {
        let instrs = make_block();
        let vars = collect_variables(&instrs, 0..instrs.len());
        assert_eq!(vars, vec![var("a"), var("b"), var("c")]);
    }

    #[test]
    fn test_intervals_span_first_to_last_use() {
        let instrs = make_block();
        let vars = collect_variables(&instrs, 0..4);
        let intervals = compute_liveness(&vars, &instrs, 0..4);
        assert_eq!(
            intervals,
            vec![
                LiveInterval { start: 0, end: 2 },
                LiveInterval { start: 1, end: 2 },
                LiveInterval { start: 2, end: 3 },
            ]
        );
    }

    #[test]
    fn test_unreferenced_variable_defaults_to_block_start() {
        let instrs = make_block();
        let intervals = compute_liveness(&[var("zzz")], &instrs, 1..4);
        assert_eq!(intervals, vec![LiveInterval { start: 1, end: 1 }]);
    }

    #[test]
    fn test_interference_matches_overlap() {
        let instrs = make_block();
        let vars = collect_variables(&instrs, 0..4);
        let intervals = compute_liveness(&vars, &instrs, 0..4);
        let graph = InterferenceGraph::build(&intervals);

        // All three meet at the add
        assert!(graph.interferes(0, 1));
        assert!(graph.interferes(0, 2));
        assert!(graph.interferes(1, 2));

        let disjoint = [
            LiveInterval { start: 0, end: 1 },
            LiveInterval { start: 2, end: 3 },
        ];
        assert!(!InterferenceGraph::build(&disjoint).interferes(0, 1));
    }

    #[test]
    fn test_remove_node_detaches_edges() {
        let mut graph = InterferenceGraph::with_nodes(3);
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph.remove_node(1);
        assert_eq!(graph.degree(0), 0);
        assert_eq!(graph.degree(2), 0);
        assert_eq!(graph.len(), 3);
    }
}
