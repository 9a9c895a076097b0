//! Register Allocator
//!
//! This module implements a graph coloring register allocator for mapping the
//! variables of one basic block to x86-64 registers.
//!
//! # Algorithm
//!
//! 1. Build the interference graph from the block's live intervals
//! 2. Try an exact coloring with `k = 1, 2, ... K` colors (backtracking)
//! 3. If none exists, drop the least-used variable and retry with `K`
//! 4. Large graphs, or searches that run out of steps, fall back to a
//!    Briggs-style optimistic coloring
//!
//! Variables left without a color live in memory for the whole block.

use super::liveness::{InterferenceGraph, LiveInterval};
use crate::backend::ir::{Instr, Variable};
use crate::backend::x86_64::regs::X86Reg;
use crate::config::Config;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use tracing::warn;

/// How a coloring was found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Exact search succeeded on the full graph
    Exact,
    /// Exact search succeeded after spilling
    ExactAfterSpill,
    /// Optimistic greedy fallback
    Greedy,
}

/// Result of allocating one block
#[derive(Clone, Debug)]
pub struct Coloring {
    /// Color index per colored variable
    pub colors: HashMap<Variable, usize>,
    /// Variables left in memory, in spill order
    pub spilled: Vec<Variable>,
    /// Number of colors the search was allowed
    pub k: usize,
    pub strategy: Strategy,
}

impl Coloring {
    /// Coloring of a block without variables
    pub fn empty() -> Self {
        Self {
            colors: HashMap::new(),
            spilled: Vec::new(),
            k: 0,
            strategy: Strategy::Exact,
        }
    }

    /// Register assigned to `var`; `None` means it stays in memory
    pub fn register(&self, var: &Variable) -> Option<X86Reg> {
        self.colors.get(var).and_then(|&c| X86Reg::for_color(c))
    }

    /// Was `var` among the variables this coloring was computed for?
    pub fn contains(&self, var: &Variable) -> bool {
        self.colors.contains_key(var) || self.spilled.contains(var)
    }

    pub fn color(&self, var: &Variable) -> Option<usize> {
        self.colors.get(var).copied()
    }

    /// Number of distinct colors actually used
    pub fn colors_used(&self) -> usize {
        self.colors.values().collect::<HashSet<_>>().len()
    }
}

/// Outcome of one bounded exact search
enum Search {
    Colored(Vec<usize>),
    Uncolorable,
    OutOfBudget,
}

/// Graph coloring register allocator
pub struct GraphColoringAllocator {
    /// Number of available registers
    num_regs: usize,
    /// Graphs above this size go straight to the greedy fallback
    max_exact_nodes: usize,
    /// Step budget per exact search
    search_budget: usize,
}

impl GraphColoringAllocator {
    pub fn new(config: &Config) -> Self {
        Self {
            num_regs: X86Reg::ALLOCATABLE.len(),
            max_exact_nodes: config.max_exact_nodes,
            search_budget: config.search_budget,
        }
    }

    /// Allocate registers for the variables of one block
    ///
    /// `vars` and `intervals` are parallel; `instrs[range]` is the block,
    /// rendered to count uses when choosing what to spill.
    pub fn allocate(
        &self,
        instrs: &[Instr],
        range: Range<usize>,
        vars: &[Variable],
        intervals: &[LiveInterval],
    ) -> Coloring {
        if vars.is_empty() {
            return Coloring::empty();
        }

        let uses = count_uses(instrs, range, vars);
        let nodes: Vec<usize> = (0..vars.len()).collect();

        if vars.len() > self.max_exact_nodes {
            warn!(
                nodes = vars.len(),
                limit = self.max_exact_nodes,
                "interference graph too large for exact coloring, using greedy"
            );
            return self.greedy(vars, intervals, &uses, &nodes, Vec::new());
        }

        let graph = InterferenceGraph::build(intervals);
        for k in 1..=self.num_regs {
            match self.safe_coloring(&graph, k) {
                Search::Colored(colors) => {
                    return build_coloring(vars, &nodes, &colors, Vec::new(), k, Strategy::Exact);
                }
                Search::Uncolorable => continue,
                Search::OutOfBudget => {
                    warn!(k, "coloring search out of budget, using greedy");
                    return self.greedy(vars, intervals, &uses, &nodes, Vec::new());
                }
            }
        }

        self.spill_and_retry(vars, intervals, &uses, nodes)
    }

    /// Drop the least-used node until the rest colors with every register
    fn spill_and_retry(
        &self,
        vars: &[Variable],
        intervals: &[LiveInterval],
        uses: &[usize],
        mut remaining: Vec<usize>,
    ) -> Coloring {
        let mut spilled = Vec::new();

        while !remaining.is_empty() {
            let victim = remaining
                .iter()
                .enumerate()
                .min_by_key(|&(pos, &node)| (uses[node], pos))
                .map(|(pos, _)| pos);
            let Some(pos) = victim else { break };

            let node = remaining.remove(pos);
            warn!(variable = %vars[node], uses = uses[node], "spilling");
            spilled.push(vars[node].clone());

            let sub: Vec<LiveInterval> = remaining.iter().map(|&n| intervals[n]).collect();
            let graph = InterferenceGraph::build(&sub);
            match self.safe_coloring(&graph, self.num_regs) {
                Search::Colored(colors) => {
                    return build_coloring(
                        vars,
                        &remaining,
                        &colors,
                        spilled,
                        self.num_regs,
                        Strategy::ExactAfterSpill,
                    );
                }
                Search::Uncolorable => continue,
                Search::OutOfBudget => {
                    warn!("coloring search out of budget after spilling, using greedy");
                    return self.greedy(vars, intervals, uses, &remaining, spilled);
                }
            }
        }

        // Everything spilled
        Coloring {
            colors: HashMap::new(),
            spilled,
            k: self.num_regs,
            strategy: Strategy::ExactAfterSpill,
        }
    }

    /// Backtracking search for a `k`-coloring, nodes colored in index order
    fn safe_coloring(&self, graph: &InterferenceGraph, k: usize) -> Search {
        let mut colors: Vec<Option<usize>> = vec![None; graph.len()];
        let mut steps = 0usize;

        match self.try_color(graph, k, 0, 0, &mut colors, &mut steps) {
            Some(true) => Search::Colored(colors.into_iter().map(|c| c.unwrap_or(0)).collect()),
            Some(false) => Search::Uncolorable,
            None => Search::OutOfBudget,
        }
    }

    /// `None` when the step budget runs out
    ///
    /// Colors are introduced in order: with `opened` colors in use so far a
    /// node may take one of them or open the next. Any coloring can be
    /// renumbered into that form, so the search stays exact.
    fn try_color(
        &self,
        graph: &InterferenceGraph,
        k: usize,
        node: usize,
        opened: usize,
        colors: &mut [Option<usize>],
        steps: &mut usize,
    ) -> Option<bool> {
        if node == graph.len() {
            return Some(true);
        }

        for color in 0..k.min(opened + 1) {
            *steps += 1;
            if *steps > self.search_budget {
                return None;
            }

            let legal = graph.neighbors(node).all(|n| colors[n] != Some(color));
            if !legal {
                continue;
            }

            colors[node] = Some(color);
            let opened = opened.max(color + 1);
            if self.try_color(graph, k, node + 1, opened, colors, steps)? {
                return Some(true);
            }
            colors[node] = None;
        }

        Some(false)
    }

    /// Briggs-style optimistic coloring over `nodes`
    fn greedy(
        &self,
        vars: &[Variable],
        intervals: &[LiveInterval],
        uses: &[usize],
        nodes: &[usize],
        mut spilled: Vec<Variable>,
    ) -> Coloring {
        let sub: Vec<LiveInterval> = nodes.iter().map(|&n| intervals[n]).collect();
        let graph = InterferenceGraph::build(&sub);

        // Simplify
        let mut work = graph.clone();
        let mut removed = vec![false; nodes.len()];
        let mut stack = Vec::with_capacity(nodes.len());

        while stack.len() < nodes.len() {
            let candidate = (0..nodes.len())
                .filter(|&i| !removed[i])
                .find(|&i| work.degree(i) < self.num_regs)
                .or_else(|| {
                    // No low-degree node: push optimistically, preferring
                    // rarely used, highly connected nodes
                    (0..nodes.len())
                        .filter(|&i| !removed[i])
                        .min_by_key(|&i| (uses[nodes[i]], std::cmp::Reverse(work.degree(i)), i))
                });
            let Some(i) = candidate else { break };

            stack.push(i);
            removed[i] = true;
            work.remove_node(i);
        }

        // Select
        let mut colors: Vec<Option<usize>> = vec![None; nodes.len()];
        while let Some(i) = stack.pop() {
            let taken: HashSet<usize> = graph.neighbors(i).filter_map(|n| colors[n]).collect();
            colors[i] = (0..self.num_regs).find(|c| !taken.contains(c));
        }

        let mut assigned = HashMap::new();
        for (i, color) in colors.into_iter().enumerate() {
            let var = &vars[nodes[i]];
            match color {
                Some(c) => {
                    assigned.insert(var.clone(), c);
                }
                None => {
                    warn!(variable = %var, uses = uses[nodes[i]], "spilling");
                    spilled.push(var.clone());
                }
            }
        }

        Coloring {
            colors: assigned,
            spilled,
            k: self.num_regs,
            strategy: Strategy::Greedy,
        }
    }
}

fn build_coloring(
    vars: &[Variable],
    nodes: &[usize],
    colors: &[usize],
    spilled: Vec<Variable>,
    k: usize,
    strategy: Strategy,
) -> Coloring {
    let colors = nodes
        .iter()
        .zip(colors)
        .map(|(&n, &c)| (vars[n].clone(), c))
        .collect();
    Coloring {
        colors,
        spilled,
        k,
        strategy,
    }
}

/// Whole-token occurrences of each variable in the block's IR text
fn count_uses(instrs: &[Instr], range: Range<usize>, vars: &[Variable]) -> Vec<usize> {
    let text: String = instrs[range]
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("\n");

    let mut tokens: HashMap<&str, usize> = HashMap::new();
    for token in text
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .filter(|t| !t.is_empty())
    {
        *tokens.entry(token).or_default() += 1;
    }

    vars.iter()
        .map(|v| tokens.get(v.to_string().as_str()).copied().unwrap_or(0))
        .collect()
}
