//! Dataflow framework with worklist-based fixpoint solver
//!
//! [`FixpointSolver`] propagates facts over a CFG until no node's output
//! changes, honoring back-edges. [`CoeffectPropagation`] is the engine's
//! analysis instance: it merges predecessor context maps and applies the
//! providers and cleaners recorded for each node, restricted to families
//! that are verified somewhere in the function.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use ambit_core::cfg::{CfgNode, ControlFlowGraph, Direction, NodeId};
use ambit_core::coeffect::{ContextInfo, Family};

use crate::collection::NodeActions;

/// Generic trait for dataflow analyses over a CFG.
pub trait DataflowAnalysis {
    /// The type of facts being propagated.
    type Fact: Clone + PartialEq;

    fn direction(&self) -> Direction;

    /// Initial fact for the entry (forward) or exit (backward) node.
    fn initial_fact(&self) -> Self::Fact;

    /// Bottom element of the fact lattice.
    fn bottom(&self) -> Self::Fact;

    /// Joins facts arriving from multiple predecessors (or successors).
    fn join(&self, facts: &[Self::Fact]) -> Self::Fact;

    /// Computes a node's output fact from its input fact.
    fn transfer(&self, node: &CfgNode, input: &Self::Fact) -> Self::Fact;
}

/// Tuning knobs for the fixpoint computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Upper bound on node visits before the solver gives up. Guards
    /// pathological graphs and non-monotone transfer functions.
    pub max_iterations: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
        }
    }
}

/// Result of a fixpoint computation.
#[derive(Debug)]
pub struct FixpointResult<F> {
    /// Facts at node input: the join over predecessor outputs (forward)
    /// or successor inputs (backward).
    pub in_facts: IndexMap<NodeId, F>,
    /// Facts at node output.
    pub out_facts: IndexMap<NodeId, F>,
    /// Number of node visits performed.
    pub iterations: usize,
    /// False if the solver stopped at the iteration cap instead of
    /// stabilizing.
    pub converged: bool,
}

/// Worklist-based fixpoint solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixpointSolver {
    options: ResolveOptions,
}

impl FixpointSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn solve<A: DataflowAnalysis>(
        &self,
        analysis: &A,
        graph: &ControlFlowGraph,
    ) -> FixpointResult<A::Fact> {
        match analysis.direction() {
            Direction::Forward => self.solve_forward(analysis, graph),
            Direction::Backward => self.solve_backward(analysis, graph),
        }
    }

    fn solve_forward<A: DataflowAnalysis>(
        &self,
        analysis: &A,
        graph: &ControlFlowGraph,
    ) -> FixpointResult<A::Fact> {
        let mut in_facts: IndexMap<NodeId, A::Fact> = IndexMap::new();
        let mut out_facts: IndexMap<NodeId, A::Fact> = IndexMap::new();

        for node in graph.nodes() {
            in_facts.insert(node.id, analysis.bottom());
            out_facts.insert(node.id, analysis.bottom());
        }
        in_facts.insert(graph.entry, analysis.initial_fact());

        let mut worklist: VecDeque<NodeId> = graph.reverse_postorder().into_iter().collect();
        let mut in_worklist: IndexSet<NodeId> = worklist.iter().copied().collect();

        let mut iterations = 0;
        let mut converged = true;

        while let Some(node_id) = worklist.pop_front() {
            in_worklist.swap_remove(&node_id);
            iterations += 1;

            if iterations > self.options.max_iterations {
                converged = false;
                break;
            }

            let Some(node) = graph.node(node_id) else {
                continue;
            };

            let pred_facts: Vec<A::Fact> = node
                .predecessors
                .iter()
                .filter_map(|pred| out_facts.get(pred).cloned())
                .collect();

            let new_in = if pred_facts.is_empty() {
                if node_id == graph.entry {
                    analysis.initial_fact()
                } else {
                    analysis.bottom()
                }
            } else {
                analysis.join(&pred_facts)
            };

            let new_out = analysis.transfer(node, &new_in);

            // The input cache is refreshed even when the output is stable;
            // verification reads it after the fixpoint.
            in_facts.insert(node_id, new_in);

            let changed = out_facts.get(&node_id) != Some(&new_out);
            if changed {
                out_facts.insert(node_id, new_out);

                for &succ in &node.successors {
                    if in_worklist.insert(succ) {
                        worklist.push_back(succ);
                    }
                }
            }
        }

        debug!(iterations, converged, "forward fixpoint finished");
        FixpointResult {
            in_facts,
            out_facts,
            iterations,
            converged,
        }
    }

    fn solve_backward<A: DataflowAnalysis>(
        &self,
        analysis: &A,
        graph: &ControlFlowGraph,
    ) -> FixpointResult<A::Fact> {
        let mut in_facts: IndexMap<NodeId, A::Fact> = IndexMap::new();
        let mut out_facts: IndexMap<NodeId, A::Fact> = IndexMap::new();

        for node in graph.nodes() {
            in_facts.insert(node.id, analysis.bottom());
            out_facts.insert(node.id, analysis.bottom());
        }
        out_facts.insert(graph.exit, analysis.initial_fact());

        let mut worklist: VecDeque<NodeId> = graph.postorder().into_iter().collect();
        let mut in_worklist: IndexSet<NodeId> = worklist.iter().copied().collect();

        let mut iterations = 0;
        let mut converged = true;

        while let Some(node_id) = worklist.pop_front() {
            in_worklist.swap_remove(&node_id);
            iterations += 1;

            if iterations > self.options.max_iterations {
                converged = false;
                break;
            }

            let Some(node) = graph.node(node_id) else {
                continue;
            };

            let succ_facts: Vec<A::Fact> = node
                .successors
                .iter()
                .filter_map(|succ| in_facts.get(succ).cloned())
                .collect();

            let new_out = if succ_facts.is_empty() {
                if node_id == graph.exit {
                    analysis.initial_fact()
                } else {
                    analysis.bottom()
                }
            } else {
                analysis.join(&succ_facts)
            };

            let new_in = analysis.transfer(node, &new_out);

            out_facts.insert(node_id, new_out);

            let changed = in_facts.get(&node_id) != Some(&new_in);
            if changed {
                in_facts.insert(node_id, new_in);

                for &pred in &node.predecessors {
                    if in_worklist.insert(pred) {
                        worklist.push_back(pred);
                    }
                }
            }
        }

        debug!(iterations, converged, "backward fixpoint finished");
        FixpointResult {
            in_facts,
            out_facts,
            iterations,
            converged,
        }
    }
}

/// Forward propagation of coeffect context maps.
pub struct CoeffectPropagation<'a> {
    actions: &'a NodeActions,
    verified: &'a IndexSet<Family>,
}

impl<'a> CoeffectPropagation<'a> {
    pub fn new(actions: &'a NodeActions, verified: &'a IndexSet<Family>) -> Self {
        Self { actions, verified }
    }
}

impl DataflowAnalysis for CoeffectPropagation<'_> {
    type Fact = ContextInfo;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn initial_fact(&self) -> ContextInfo {
        ContextInfo::new()
    }

    fn bottom(&self) -> ContextInfo {
        ContextInfo::new()
    }

    fn join(&self, facts: &[ContextInfo]) -> ContextInfo {
        let Some((first, rest)) = facts.split_first() else {
            return ContextInfo::new();
        };
        rest.iter().fold(first.clone(), |acc, fact| acc.merge(fact))
    }

    fn transfer(&self, node: &CfgNode, input: &ContextInfo) -> ContextInfo {
        let mut info = input.clone();
        for actions in self.actions.get(node.id) {
            if let Some(provider) = &actions.provider {
                if self.verified.contains(&provider.family()) {
                    info = info.apply_provider(provider.as_ref());
                }
            }
            if let Some(cleaner) = &actions.cleaner {
                if self.verified.contains(&cleaner.family()) {
                    info = info.apply_cleaner(cleaner.as_ref());
                }
            }
        }
        info
    }
}
