//! Demo: verify resource-held obligations over a branching function body

use std::collections::BTreeSet;

use ambit_analysis::Analyzer;
use ambit_core::cfg::{ControlFlowGraph, NodeKind};
use ambit_core::coeffect::{
    Actions, Context, ContextCleaner, ContextProvider, ContextVerifier, Family, FamilyOps,
};
use ambit_core::contract::{ActionExtractors, EffectDecl};
use ambit_core::diagnostics::{DiagnosticBuffer, VerificationError};
use ambit_core::syntax::{Call, Expr, ExprId, FuncId, FuncKind, Function, Module, Span, Symbol};

/// Set of resources currently held.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeldResources(BTreeSet<String>);

#[derive(Debug)]
struct ResourceFamily;

impl FamilyOps for ResourceFamily {
    fn name(&self) -> &str {
        "resources"
    }

    fn empty(&self) -> Context {
        Context::new(HeldResources(BTreeSet::new()))
    }

    fn combine(&self, a: &Context, b: &Context) -> Context {
        let a = a.downcast_ref::<HeldResources>().expect("resource context");
        let b = b.downcast_ref::<HeldResources>().expect("resource context");
        Context::new(HeldResources(a.0.union(&b.0).cloned().collect()))
    }
}

#[derive(Debug)]
struct Acquire {
    family: Family,
    resource: &'static str,
}

impl ContextProvider for Acquire {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn provide(&self, context: &Context) -> Context {
        let mut held = context
            .downcast_ref::<HeldResources>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        held.insert(self.resource.to_string());
        Context::new(HeldResources(held))
    }
}

#[derive(Debug)]
struct Release {
    family: Family,
    resource: &'static str,
}

impl ContextCleaner for Release {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn cleanup(&self, context: &Context) -> Context {
        let mut held = context
            .downcast_ref::<HeldResources>()
            .map(|r| r.0.clone())
            .unwrap_or_default();
        held.remove(self.resource);
        Context::new(HeldResources(held))
    }
}

#[derive(Debug)]
struct RequireHeld {
    family: Family,
    resource: &'static str,
}

impl ContextVerifier for RequireHeld {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>> {
        let held = context
            .downcast_ref::<HeldResources>()
            .is_some_and(|r| r.0.contains(self.resource));
        if held {
            vec![]
        } else {
            vec![Box::new(ambit_core::diagnostics::MissingContext)]
        }
    }
}

fn function(id: u32, name: &str, effects: Vec<EffectDecl>) -> Function {
    Function {
        id: FuncId(id),
        name: name.to_string(),
        symbol: Symbol(id),
        params: Default::default(),
        kind: FuncKind::Declared,
        span: Some(Span::new(id * 50, id * 50 + 10)),
        effects,
        body: vec![],
    }
}

fn on_call(actions: Actions) -> EffectDecl {
    EffectDecl::direct(
        ActionExtractors::builder()
            .on_owner_call(move |_| Some(actions.clone()))
            .build(),
    )
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let family = Family::new(ResourceFamily);

    // fn process() {
    //     if flaky() { open_file(); write_file() }
    //     else { write_file() }            // handle never acquired here
    //     close_file()
    // }
    let mut module = Module::new();
    module.add_function(function(0, "process", vec![]))?;
    module.add_function(function(
        1,
        "open_file",
        vec![on_call(Actions::providing(Acquire {
            family: family.clone(),
            resource: "file",
        }))],
    ))?;
    module.add_function(function(
        2,
        "write_file",
        vec![on_call(Actions::verifying(RequireHeld {
            family: family.clone(),
            resource: "file",
        }))],
    ))?;
    module.add_function(function(
        3,
        "close_file",
        vec![on_call(Actions::cleaning(Release {
            family: family.clone(),
            resource: "file",
        }))],
    ))?;

    module.add_expr(
        ExprId(0),
        Expr::Call(Call::direct(Symbol(1), vec![], Some(Span::new(10, 21)))),
    )?;
    module.add_expr(
        ExprId(1),
        Expr::Call(Call::direct(Symbol(2), vec![], Some(Span::new(22, 34)))),
    )?;
    module.add_expr(
        ExprId(2),
        Expr::Call(Call::direct(Symbol(2), vec![], Some(Span::new(40, 52)))),
    )?;
    module.add_expr(
        ExprId(3),
        Expr::Call(Call::direct(Symbol(3), vec![], Some(Span::new(56, 68)))),
    )?;

    let mut graph = ControlFlowGraph::new(FuncId(0), Some(Span::new(0, 70)));
    let open = graph.add_node(NodeKind::Call(ExprId(0)), Some(Span::new(10, 21)));
    let write_ok = graph.add_node(NodeKind::Call(ExprId(1)), Some(Span::new(22, 34)));
    let write_bug = graph.add_node(NodeKind::Call(ExprId(2)), Some(Span::new(40, 52)));
    let close = graph.add_node(NodeKind::Call(ExprId(3)), Some(Span::new(56, 68)));
    graph.add_edge(graph.entry, open)?;
    graph.add_edge(open, write_ok)?;
    graph.add_edge(write_ok, close)?;
    graph.add_edge(graph.entry, write_bug)?;
    graph.add_edge(write_bug, close)?;
    graph.add_edge(close, graph.exit)?;

    let mut sink = DiagnosticBuffer::new();
    let summary = Analyzer::new(&module).analyze(&graph, &mut sink);

    println!("summary: {}", serde_json::to_string_pretty(&summary)?);
    println!(
        "diagnostics: {}",
        serde_json::to_string_pretty(sink.diagnostics())?
    );

    Ok(())
}
