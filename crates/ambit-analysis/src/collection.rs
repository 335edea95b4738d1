//! Action collection pass
//!
//! A forward, full traversal of the CFG that extracts the contract actions
//! applicable to each node. Every node is visited exactly once; no merging
//! happens here, only per-node extraction. Nodes absent from the resulting
//! map simply carry no actions.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use ambit_core::cfg::{CfgNode, ControlFlowGraph, Direction, NodeId, NodeKind};
use ambit_core::coeffect::{Actions, Family};
use ambit_core::contract::{ActionExtractors, EffectScope};
use ambit_core::syntax::{ExprId, FuncId, Function, Module, Symbol};

use crate::attribution::LambdaAttribution;

/// Ordered actions collected per CFG node. Append-only during collection,
/// read-only afterward.
#[derive(Debug, Default)]
pub struct NodeActions {
    actions: IndexMap<NodeId, Vec<Actions>>,
}

impl NodeActions {
    pub fn get(&self, node: NodeId) -> &[Actions] {
        self.actions.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[Actions])> {
        self.actions.iter().map(|(id, list)| (*id, list.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Families with at least one verifier anywhere in the function.
    /// Families outside this set cannot affect any diagnostic and are
    /// dropped from propagation entirely.
    pub fn verified_families(&self) -> IndexSet<Family> {
        let mut families = IndexSet::new();
        for actions in self.actions.values().flatten() {
            if let Some(verifier) = &actions.verifier {
                families.insert(verifier.family());
            }
        }
        families
    }

    pub(crate) fn push(&mut self, node: NodeId, actions: Actions) {
        self.actions.entry(node).or_default().push(actions);
    }
}

/// Collects the applicable actions for every node of `graph`.
pub fn collect_actions(
    module: &Module,
    graph: &ControlFlowGraph,
    attribution: &LambdaAttribution,
) -> NodeActions {
    let mut collected = NodeActions::default();
    graph.traverse(Direction::Forward, |node| match node.kind {
        NodeKind::Enter(func) => {
            collect_boundary(module, attribution, node, func, Boundary::Enter, &mut collected);
        }
        NodeKind::Exit(func) => {
            collect_boundary(module, attribution, node, func, Boundary::Exit, &mut collected);
        }
        NodeKind::Call(expr) => {
            collect_call(module, graph, node, expr, &mut collected);
        }
        NodeKind::Stmt => {}
    });
    debug!(
        nodes = collected.len(),
        families = collected.verified_families().len(),
        "collected context actions"
    );
    collected
}

enum Boundary {
    Enter,
    Exit,
}

fn collect_boundary(
    module: &Module,
    attribution: &LambdaAttribution,
    node: &CfgNode,
    func: FuncId,
    boundary: Boundary,
    out: &mut NodeActions,
) {
    let Some(function) = module.function(func) else {
        return;
    };
    let extract = |extractors: &ActionExtractors, owner: &Function| match boundary {
        Boundary::Enter => extractors.on_owner_enter.as_ref().and_then(|e| e(owner)),
        Boundary::Exit => extractors.on_owner_exit.as_ref().and_then(|e| e(owner)),
    };
    if function.is_in_place_lambda() {
        // The effect lives on the function the lambda was passed to, scoped
        // to the parameter the lambda was bound to.
        let Some((owner_id, param_symbol)) = attribution.owner_of(func) else {
            return;
        };
        let Some(owner) = module.function(owner_id) else {
            return;
        };
        collect_lambda_effects(node, owner, param_symbol, out, |extractors| {
            extract(extractors, owner)
        });
    } else {
        collect_direct_effects(node, function, out, |extractors| {
            extract(extractors, function)
        });
    }
}

fn collect_call(
    module: &Module,
    graph: &ControlFlowGraph,
    node: &CfgNode,
    expr: ExprId,
    out: &mut NodeActions,
) {
    let Some(call) = module.call(expr) else {
        return;
    };
    if call.is_invoke {
        // Invoking a stored function value: lambda-scoped effects of the
        // enclosing function apply, matched by the receiver's symbol.
        let Some(receiver) = call.receiver else {
            return;
        };
        let Some(enclosing) = module.function(graph.function) else {
            return;
        };
        collect_lambda_effects(node, enclosing, receiver, out, |extractors| {
            extractors.on_owner_call.as_ref().and_then(|e| e(call))
        });
    } else {
        let Some(callee) = call
            .callee
            .and_then(|symbol| module.function_by_symbol(symbol))
        else {
            return;
        };
        collect_direct_effects(node, callee, out, |extractors| {
            extractors.on_owner_call.as_ref().and_then(|e| e(call))
        });
    }
}

fn collect_direct_effects(
    node: &CfgNode,
    function: &Function,
    out: &mut NodeActions,
    extract: impl Fn(&ActionExtractors) -> Option<Actions>,
) {
    for effect in &function.effects {
        if effect.scope != EffectScope::Direct {
            continue;
        }
        if let Some(actions) = extract(&effect.extractors) {
            out.push(node.id, actions);
        }
    }
}

fn collect_lambda_effects(
    node: &CfgNode,
    owner: &Function,
    param_symbol: Symbol,
    out: &mut NodeActions,
    extract: impl Fn(&ActionExtractors) -> Option<Actions>,
) {
    for effect in &owner.effects {
        let EffectScope::Lambda { param_index } = effect.scope else {
            continue;
        };
        if owner.param_symbol(param_index) != Some(param_symbol) {
            continue;
        }
        if let Some(actions) = extract(&effect.extractors) {
            out.push(node.id, actions);
        }
    }
}
