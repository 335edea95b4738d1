//! # Ambit Core
//!
//! Data model for the Ambit coeffect verification engine.
//!
//! A coeffect is an ambient contextual obligation — "exception type X is
//! expected to be handled", "resource R must currently be held" — that must
//! hold at a program point. This crate defines the family-agnostic fact
//! model, the contract effect declarations that introduce facts, and the
//! interface data handed over by upstream collaborators (syntax subset,
//! control-flow graphs, diagnostics).
//!
//! ## Modules
//!
//! - **[`coeffect`]** - Families, contexts, and context actions
//! - **[`contract`]** - Effect declarations and action extractors
//! - **[`syntax`]** - The syntax subset the analysis inspects
//! - **[`cfg`]** - Control-flow graph data model
//! - **[`diagnostics`]** - Verification errors and structured diagnostics
//! - **[`error`]** - Model construction errors
//!
//! The analysis passes themselves live in the `ambit-analysis` crate.

pub mod cfg;
pub mod coeffect;
pub mod contract;
pub mod diagnostics;
pub mod error;
pub mod syntax;

// Re-export main types at crate root for convenience
pub use cfg::{CfgNode, ControlFlowGraph, Direction, NodeId, NodeKind};
pub use coeffect::{
    Actions, Context, ContextCleaner, ContextInfo, ContextProvider, ContextValue, ContextVerifier,
    Family, FamilyOps,
};
pub use contract::{ActionExtractors, ActionExtractorsBuilder, EffectDecl, EffectScope};
pub use diagnostics::{
    Diagnostic, DiagnosticBuffer, DiagnosticKind, DiagnosticSink, MissingContext,
    ObligationViolation, UnexpectedContext, VerificationError,
};
pub use error::{ModelError, Result};
pub use syntax::{
    argument_mapping, Argument, Call, Expr, ExprId, FuncId, FuncKind, Function, Module, Param,
    Span, Symbol,
};
