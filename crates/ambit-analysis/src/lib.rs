//! # Ambit Analysis
//!
//! Flow-sensitive coeffect analysis passes for the Ambit engine.
//!
//! Per function body the pipeline is strictly sequential:
//!
//! 1. **[`attribution`]** - map in-place lambdas to their owner function and
//!    formal parameter
//! 2. **[`collection`]** - extract contract actions per CFG node
//! 3. **[`resolver`]** - propagate context maps to a fixpoint (skipped when
//!    no family is verified anywhere in the function)
//! 4. **[`analyzer`]** - verify contexts and report diagnostics
//!
//! ## Quick Start
//!
//! ```rust
//! use ambit_analysis::prelude::*;
//! use ambit_core::{ControlFlowGraph, DiagnosticBuffer, FuncId, Module};
//!
//! let module = Module::new();
//! let graph = ControlFlowGraph::new(FuncId(0), None);
//! let mut sink = DiagnosticBuffer::new();
//!
//! let summary = Analyzer::new(&module).analyze(&graph, &mut sink);
//! assert!(summary.skipped);
//! ```

pub mod analyzer;
pub mod attribution;
pub mod collection;
pub mod resolver;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analyzer::{AnalysisSummary, Analyzer};
    pub use crate::attribution::LambdaAttribution;
    pub use crate::collection::{collect_actions, NodeActions};
    pub use crate::resolver::{
        CoeffectPropagation, DataflowAnalysis, FixpointResult, FixpointSolver, ResolveOptions,
    };
}

// Re-export main types at crate root for convenience
pub use analyzer::{AnalysisSummary, Analyzer};
pub use attribution::LambdaAttribution;
pub use collection::{collect_actions, NodeActions};
pub use resolver::{CoeffectPropagation, DataflowAnalysis, FixpointResult, FixpointSolver, ResolveOptions};
