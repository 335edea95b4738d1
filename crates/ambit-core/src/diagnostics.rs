//! Verification errors and structured diagnostics
//!
//! Verification errors form an open set: families may define their own error
//! types. The engine recognizes the two standard kinds plus the generic
//! payload-carrying [`ObligationViolation`]; reporters drop anything else,
//! so a family introducing a new error kind never crashes the pipeline.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::Span;

/// A violation produced by a context verifier.
///
/// Open set; downcast via `as_any` to recognize concrete kinds.
pub trait VerificationError: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A fact that was required at this point is not in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingContext;

impl VerificationError for MissingContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A fact that must not hold at this point is in the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnexpectedContext;

impl VerificationError for UnexpectedContext {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A family-specific semantic violation, e.g. an exception type that may
/// propagate unhandled. The description becomes the diagnostic payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObligationViolation {
    pub description: String,
}

impl ObligationViolation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

impl VerificationError for ObligationViolation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Diagnostic categories the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingContext,
    UnexpectedContext,
    ObligationViolation,
}

/// A structured diagnostic anchored at a source location.
///
/// The engine never formats user-facing text; presentation is the sink's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

/// Accepts diagnostics for later presentation.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// A sink that buffers diagnostics in order of arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticBuffer {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticSink for DiagnosticBuffer {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}
