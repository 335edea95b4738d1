//! Lambda attribution pass
//!
//! One traversal of a function body that records, for every anonymous
//! function passed in place as a call argument, which owning function and
//! which formal parameter it was bound to. Built before any CFG traversal
//! and read-only afterward.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use ambit_core::syntax::{argument_mapping, Call, Expr, ExprId, FuncId, Function, Module, Symbol};

/// Mapping from an in-place lambda to its owner function and the formal
/// parameter symbol it was bound to. Lambdas without an entry are
/// standalone; lambda-scoped effects never fire for them.
#[derive(Debug, Default)]
pub struct LambdaAttribution {
    owners: IndexMap<FuncId, (FuncId, Symbol)>,
}

impl LambdaAttribution {
    /// Collects attributions from `function`'s body, descending into nested
    /// lambda bodies and call arguments.
    pub fn collect(module: &Module, function: &Function) -> Self {
        let mut collector = Collector {
            module,
            visited: IndexSet::new(),
            owners: IndexMap::new(),
        };
        collector.visit_body(&function.body);
        debug!(
            function = function.name.as_str(),
            lambdas = collector.owners.len(),
            "collected lambda attribution"
        );
        Self {
            owners: collector.owners,
        }
    }

    pub fn owner_of(&self, lambda: FuncId) -> Option<(FuncId, Symbol)> {
        self.owners.get(&lambda).copied()
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

struct Collector<'m> {
    module: &'m Module,
    /// Expressions already visited; a well-formed arena is acyclic, but the
    /// guard keeps a malformed one from recursing forever.
    visited: IndexSet<ExprId>,
    owners: IndexMap<FuncId, (FuncId, Symbol)>,
}

impl Collector<'_> {
    fn visit_body(&mut self, body: &[ExprId]) {
        for &expr in body {
            self.visit_expr(expr);
        }
    }

    fn visit_expr(&mut self, id: ExprId) {
        if !self.visited.insert(id) {
            return;
        }
        match self.module.expr(id) {
            Some(Expr::Call(call)) => self.visit_call(call),
            Some(Expr::Lambda(func)) => {
                if let Some(lambda) = self.module.function(*func) {
                    self.visit_body(&lambda.body);
                }
            }
            Some(Expr::Opaque) | None => {}
        }
    }

    fn visit_call(&mut self, call: &Call) {
        if let Some(callee) = call
            .callee
            .and_then(|symbol| self.module.function_by_symbol(symbol))
        {
            let mapping = argument_mapping(call, callee);
            for arg in &call.args {
                let Some(Expr::Lambda(lambda_id)) = self.module.expr(arg.value) else {
                    continue;
                };
                let Some(lambda) = self.module.function(*lambda_id) else {
                    continue;
                };
                if !lambda.is_in_place_lambda() {
                    continue;
                }
                // An argument the mapping could not place leaves its lambda
                // ownerless; not an error.
                let Some(&index) = mapping.as_ref().and_then(|m| m.get(&arg.value)) else {
                    continue;
                };
                let Some(symbol) = callee.param_symbol(index) else {
                    continue;
                };
                self.owners.insert(*lambda_id, (callee.id, symbol));
            }
        }
        for arg in &call.args {
            self.visit_expr(arg.value);
        }
    }
}
