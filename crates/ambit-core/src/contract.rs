//! Contract effect declarations and action extractors
//!
//! The contract parser (an upstream collaborator) turns source annotations
//! into [`EffectDecl`] values attached to functions. Each declaration carries
//! an [`ActionExtractors`] triple; the collection pass invokes the extractor
//! matching the CFG node kind to obtain the [`Actions`] for that node.

use std::fmt;

use crate::coeffect::Actions;
use crate::syntax::{Call, Function};

pub type OwnerCallExtractor = Box<dyn Fn(&Call) -> Option<Actions> + Send + Sync>;
pub type OwnerEnterExtractor = Box<dyn Fn(&Function) -> Option<Actions> + Send + Sync>;
pub type OwnerExitExtractor = Box<dyn Fn(&Function) -> Option<Actions> + Send + Sync>;

/// Optional extractor triple for one effect declaration.
///
/// `on_owner_call` receives the call expression; the enter/exit extractors
/// receive the owner function. Each yields zero or one `Actions`.
#[derive(Default)]
pub struct ActionExtractors {
    pub on_owner_call: Option<OwnerCallExtractor>,
    pub on_owner_enter: Option<OwnerEnterExtractor>,
    pub on_owner_exit: Option<OwnerExitExtractor>,
}

impl ActionExtractors {
    pub fn builder() -> ActionExtractorsBuilder {
        ActionExtractorsBuilder::default()
    }
}

impl fmt::Debug for ActionExtractors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionExtractors")
            .field("on_owner_call", &self.on_owner_call.is_some())
            .field("on_owner_enter", &self.on_owner_enter.is_some())
            .field("on_owner_exit", &self.on_owner_exit.is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct ActionExtractorsBuilder {
    on_owner_call: Option<OwnerCallExtractor>,
    on_owner_enter: Option<OwnerEnterExtractor>,
    on_owner_exit: Option<OwnerExitExtractor>,
}

impl ActionExtractorsBuilder {
    pub fn on_owner_call(
        mut self,
        extractor: impl Fn(&Call) -> Option<Actions> + Send + Sync + 'static,
    ) -> Self {
        self.on_owner_call = Some(Box::new(extractor));
        self
    }

    pub fn on_owner_enter(
        mut self,
        extractor: impl Fn(&Function) -> Option<Actions> + Send + Sync + 'static,
    ) -> Self {
        self.on_owner_enter = Some(Box::new(extractor));
        self
    }

    pub fn on_owner_exit(
        mut self,
        extractor: impl Fn(&Function) -> Option<Actions> + Send + Sync + 'static,
    ) -> Self {
        self.on_owner_exit = Some(Box::new(extractor));
        self
    }

    pub fn build(self) -> ActionExtractors {
        ActionExtractors {
            on_owner_call: self.on_owner_call,
            on_owner_enter: self.on_owner_enter,
            on_owner_exit: self.on_owner_exit,
        }
    }
}

/// Where a contract effect applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectScope {
    /// Applies unconditionally to the declaring function and its call sites.
    Direct,
    /// Applies to the lambda bound to the parameter at `param_index`, once
    /// that lambda's boundary nodes appear in a caller's graph.
    Lambda { param_index: usize },
}

/// One declared contract effect.
#[derive(Debug)]
pub struct EffectDecl {
    pub scope: EffectScope,
    pub extractors: ActionExtractors,
}

impl EffectDecl {
    pub fn direct(extractors: ActionExtractors) -> Self {
        Self {
            scope: EffectScope::Direct,
            extractors,
        }
    }

    pub fn lambda(param_index: usize, extractors: ActionExtractors) -> Self {
        Self {
            scope: EffectScope::Lambda { param_index },
            extractors,
        }
    }
}
