//! Control-flow graph data model
//!
//! The engine never builds graphs from syntax; an upstream control-flow
//! builder assembles one [`ControlFlowGraph`] per function body, including
//! the boundary nodes of in-place lambdas inlined into their call sites.
//! Cycles (loop back-edges) are supported.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::syntax::{ExprId, FuncId, Span};

/// Unique identifier for a CFG node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// What a CFG node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Entry of a function body. Inlined in-place lambdas contribute their
    /// own enter nodes inside the caller's graph.
    Enter(FuncId),
    /// Exit of a function body.
    Exit(FuncId),
    /// A call expression.
    Call(ExprId),
    /// Any other statement or expression; carries no actions.
    Stmt,
}

/// A node in the CFG, optionally anchored to a source span.
#[derive(Debug)]
pub struct CfgNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub predecessors: Vec<NodeId>,
    pub successors: Vec<NodeId>,
}

impl CfgNode {
    fn new(id: NodeId, kind: NodeKind, span: Option<Span>) -> Self {
        Self {
            id,
            kind,
            span,
            predecessors: Vec::new(),
            successors: Vec::new(),
        }
    }
}

/// Direction of a graph traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Control-flow graph of one function body.
#[derive(Debug)]
pub struct ControlFlowGraph {
    /// The function this graph was built for.
    pub function: FuncId,
    nodes: IndexMap<NodeId, CfgNode>,
    pub entry: NodeId,
    pub exit: NodeId,
    next_node_id: usize,
}

impl ControlFlowGraph {
    /// Creates a graph with the function's enter and exit boundary nodes,
    /// both anchored at the function's span.
    pub fn new(function: FuncId, span: Option<Span>) -> Self {
        let mut graph = Self {
            function,
            nodes: IndexMap::new(),
            entry: NodeId(0),
            exit: NodeId(0),
            next_node_id: 0,
        };
        graph.entry = graph.add_node(NodeKind::Enter(function), span);
        graph.exit = graph.add_node(NodeKind::Exit(function), span);
        graph
    }

    pub fn add_node(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, CfgNode::new(id, kind, span));
        id
    }

    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&to) {
            return Err(ModelError::UnknownNode(to));
        }
        let Some(from_node) = self.nodes.get_mut(&from) else {
            return Err(ModelError::UnknownNode(from));
        };
        if !from_node.successors.contains(&to) {
            from_node.successors.push(to);
        }
        if let Some(to_node) = self.nodes.get_mut(&to) {
            if !to_node.predecessors.contains(&from) {
                to_node.predecessors.push(from);
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CfgNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Visits every node exactly once: insertion order for forward
    /// traversals, reverse insertion order for backward ones.
    pub fn traverse<F>(&self, direction: Direction, mut visit: F)
    where
        F: FnMut(&CfgNode),
    {
        match direction {
            Direction::Forward => {
                for node in self.nodes.values() {
                    visit(node);
                }
            }
            Direction::Backward => {
                for node in self.nodes.values().rev() {
                    visit(node);
                }
            }
        }
    }

    /// Nodes reachable from entry in reverse postorder (useful for forward
    /// dataflow).
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        let mut postorder = self.postorder();
        postorder.reverse();
        postorder
    }

    /// Nodes reachable from entry in postorder (useful for backward
    /// dataflow).
    pub fn postorder(&self) -> Vec<NodeId> {
        let mut visited = IndexSet::new();
        let mut result = Vec::new();
        self.dfs_postorder(self.entry, &mut visited, &mut result);
        result
    }

    fn dfs_postorder(
        &self,
        node: NodeId,
        visited: &mut IndexSet<NodeId>,
        postorder: &mut Vec<NodeId>,
    ) {
        if !visited.insert(node) {
            return;
        }
        if let Some(n) = self.nodes.get(&node) {
            for &succ in &n.successors {
                self.dfs_postorder(succ, visited, postorder);
            }
        }
        postorder.push(node);
    }
}
