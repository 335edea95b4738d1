//! Analyzer orchestrator
//!
//! Wires the passes together per function body: attribution, collection,
//! fixpoint resolution, then verification and reporting. No state persists
//! between calls; each function starts from an empty context.

use tracing::debug;

use ambit_core::cfg::ControlFlowGraph;
use ambit_core::diagnostics::{
    Diagnostic, DiagnosticKind, DiagnosticSink, MissingContext, ObligationViolation,
    UnexpectedContext, VerificationError,
};
use ambit_core::syntax::{Module, Span};
use serde::{Deserialize, Serialize};

use crate::attribution::LambdaAttribution;
use crate::collection::collect_actions;
use crate::resolver::{CoeffectPropagation, FixpointSolver, ResolveOptions};

/// What one `analyze` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Diagnostics reported to the sink.
    pub diagnostics: usize,
    /// Node visits the fixpoint performed; zero when skipped.
    pub iterations: usize,
    /// False if the fixpoint stopped at the iteration cap.
    pub converged: bool,
    /// True when no family had a verifier and the resolver never ran.
    pub skipped: bool,
}

impl AnalysisSummary {
    fn skipped() -> Self {
        Self {
            diagnostics: 0,
            iterations: 0,
            converged: true,
            skipped: true,
        }
    }
}

/// Analyzes one function body's CFG against its module's contract effects.
#[derive(Debug)]
pub struct Analyzer<'m> {
    module: &'m Module,
    options: ResolveOptions,
}

impl<'m> Analyzer<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(module: &'m Module, options: ResolveOptions) -> Self {
        Self { module, options }
    }

    /// Runs the full pipeline for `graph` and reports verification failures
    /// to `sink`. Graphs whose function is unknown to the module are skipped.
    pub fn analyze(
        &self,
        graph: &ControlFlowGraph,
        sink: &mut dyn DiagnosticSink,
    ) -> AnalysisSummary {
        let Some(function) = self.module.function(graph.function) else {
            return AnalysisSummary::skipped();
        };

        let attribution = LambdaAttribution::collect(self.module, function);
        let actions = collect_actions(self.module, graph, &attribution);

        let verified = actions.verified_families();
        if verified.is_empty() {
            debug!(
                function = function.name.as_str(),
                "no verifiable families, resolver skipped"
            );
            return AnalysisSummary::skipped();
        }

        let propagation = CoeffectPropagation::new(&actions, &verified);
        let result = FixpointSolver::with_options(self.options).solve(&propagation, graph);

        let mut reported = 0;
        for (node_id, node_actions) in actions.iter() {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            // Verify against the merged predecessor context the resolver
            // computed for this node.
            let Some(info) = result.in_facts.get(&node_id) else {
                continue;
            };
            for actions in node_actions {
                let Some(verifier) = &actions.verifier else {
                    continue;
                };
                let errors = verifier.verify(&info.get(&verifier.family()));
                // Errors on nodes without a source anchor are dropped.
                let Some(span) = node.span else {
                    continue;
                };
                for error in errors {
                    if let Some(diagnostic) = to_diagnostic(error.as_ref(), span) {
                        sink.report(diagnostic);
                        reported += 1;
                    }
                }
            }
        }

        debug!(
            function = function.name.as_str(),
            diagnostics = reported,
            iterations = result.iterations,
            "analysis finished"
        );
        AnalysisSummary {
            diagnostics: reported,
            iterations: result.iterations,
            converged: result.converged,
            skipped: false,
        }
    }
}

/// Converts a verification error into a reportable diagnostic. Unrecognized
/// error types yield `None` and are dropped, so families may introduce new
/// error kinds without breaking the reporter.
fn to_diagnostic(error: &dyn VerificationError, span: Span) -> Option<Diagnostic> {
    let any = error.as_any();
    if any.is::<MissingContext>() {
        Some(Diagnostic {
            kind: DiagnosticKind::MissingContext,
            span,
            payload: None,
        })
    } else if any.is::<UnexpectedContext>() {
        Some(Diagnostic {
            kind: DiagnosticKind::UnexpectedContext,
            span,
            payload: None,
        })
    } else if let Some(violation) = any.downcast_ref::<ObligationViolation>() {
        Some(Diagnostic {
            kind: DiagnosticKind::ObligationViolation,
            span,
            payload: Some(violation.description.clone()),
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct AlienError;

    impl VerificationError for AlienError {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn known_errors_map_to_diagnostic_kinds() {
        let span = Span::new(0, 1);
        assert_eq!(
            to_diagnostic(&MissingContext, span).map(|d| d.kind),
            Some(DiagnosticKind::MissingContext)
        );
        assert_eq!(
            to_diagnostic(&UnexpectedContext, span).map(|d| d.kind),
            Some(DiagnosticKind::UnexpectedContext)
        );

        let violation = ObligationViolation::new("IOException");
        let diagnostic = to_diagnostic(&violation, span).unwrap();
        assert_eq!(diagnostic.kind, DiagnosticKind::ObligationViolation);
        assert_eq!(diagnostic.payload.as_deref(), Some("IOException"));
    }

    #[test]
    fn unknown_error_kind_is_dropped() {
        assert!(to_diagnostic(&AlienError, Span::new(0, 1)).is_none());
    }

    #[test]
    fn unknown_graph_function_is_skipped() {
        use ambit_core::diagnostics::DiagnosticBuffer;
        use ambit_core::syntax::FuncId;

        let module = Module::new();
        let graph = ControlFlowGraph::new(FuncId(0), None);
        let mut sink = DiagnosticBuffer::new();

        let summary = Analyzer::new(&module).analyze(&graph, &mut sink);
        assert!(summary.skipped);
        assert!(sink.is_empty());
    }
}
