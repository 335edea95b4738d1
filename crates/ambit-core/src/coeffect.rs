//! Coeffect families, contexts, and context actions
//!
//! Implements the fact model of the engine:
//! - `Family` identifies one category of coeffect and owns its merge rule
//! - `Context` is the immutable fact value for one family at one program point
//! - `ContextInfo` maps families to contexts and joins at CFG merge points
//! - `Actions` bundles the optional provider/verifier/cleaner capabilities
//!   extracted from a contract effect

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::diagnostics::VerificationError;

/// A dynamically typed, immutable fact value.
///
/// Implemented automatically for any `Any + Debug + PartialEq + Send + Sync`
/// type, so family authors define a plain struct and get dynamic equality
/// (needed for fixed-point change detection) for free.
pub trait ContextValue: Any + fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn ContextValue) -> bool;
}

impl<T> ContextValue for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn ContextValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|o| self == o)
    }
}

/// The current fact value for one family at one program point.
///
/// Cheap to clone; the underlying value is shared and never mutated.
#[derive(Clone, Debug)]
pub struct Context(Arc<dyn ContextValue>);

impl Context {
    pub fn new<T: ContextValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Downcast to the family's concrete context type.
    pub fn downcast_ref<T: ContextValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(other.0.as_ref())
    }
}

impl Eq for Context {}

/// Capability interface of one coeffect family.
///
/// `combine` must be associative and commutative, and `empty` must be its
/// identity: `combine(empty, x) == x`. These laws are a precondition on
/// family authors, not checked at runtime; a non-conforming combiner makes
/// fixed-point results dependent on CFG visitation order.
pub trait FamilyOps: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// The identity context for this family.
    fn empty(&self) -> Context;

    /// Joins two contexts at a CFG merge point.
    fn combine(&self, a: &Context, b: &Context) -> Context;
}

/// Identity tag for one category of coeffect.
///
/// Families are compared and hashed by identity, not by name: two `Family`
/// handles are equal only if they share the same `FamilyOps` allocation.
/// Identity is stable for the lifetime of an analysis run.
#[derive(Clone)]
pub struct Family(Arc<dyn FamilyOps>);

impl Family {
    pub fn new(ops: impl FamilyOps + 'static) -> Self {
        Self(Arc::new(ops))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn empty(&self) -> Context {
        self.0.empty()
    }

    pub fn combine(&self, a: &Context, b: &Context) -> Context {
        self.0.combine(a, b)
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Family {}

impl Hash for Family {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Family").field(&self.name()).finish()
    }
}

/// Adds or extends facts for its family.
pub trait ContextProvider: fmt::Debug + Send + Sync {
    fn family(&self) -> Family;
    fn provide(&self, context: &Context) -> Context;
}

/// Inspects facts for its family and yields violations. Read-only.
pub trait ContextVerifier: fmt::Debug + Send + Sync {
    fn family(&self) -> Family;
    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>>;
}

/// Retracts or resets facts for its family.
pub trait ContextCleaner: fmt::Debug + Send + Sync {
    fn family(&self) -> Family;
    fn cleanup(&self, context: &Context) -> Context;
}

/// The optional capability triple extracted from one contract effect.
///
/// Any subset of the three capabilities may be present; a single CFG node
/// may accumulate many `Actions`.
#[derive(Clone, Debug, Default)]
pub struct Actions {
    pub provider: Option<Arc<dyn ContextProvider>>,
    pub verifier: Option<Arc<dyn ContextVerifier>>,
    pub cleaner: Option<Arc<dyn ContextCleaner>>,
}

impl Actions {
    pub fn providing(provider: impl ContextProvider + 'static) -> Self {
        Self {
            provider: Some(Arc::new(provider)),
            ..Self::default()
        }
    }

    pub fn verifying(verifier: impl ContextVerifier + 'static) -> Self {
        Self {
            verifier: Some(Arc::new(verifier)),
            ..Self::default()
        }
    }

    pub fn cleaning(cleaner: impl ContextCleaner + 'static) -> Self {
        Self {
            cleaner: Some(Arc::new(cleaner)),
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn with_verifier(mut self, verifier: impl ContextVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn with_cleaner(mut self, cleaner: impl ContextCleaner + 'static) -> Self {
        self.cleaner = Some(Arc::new(cleaner));
        self
    }
}

/// Immutable mapping from family to context for one program point.
///
/// At most one entry per family; looking up an absent family yields that
/// family's empty context, never a missing value. Cloning is copy-on-write
/// at the granularity of the whole map, which is cheap at the sizes one
/// function's analysis produces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextInfo {
    entries: IndexMap<Family, Context>,
}

impl ContextInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The context for `family`, or its empty context if absent.
    pub fn get(&self, family: &Family) -> Context {
        self.entries
            .get(family)
            .cloned()
            .unwrap_or_else(|| family.empty())
    }

    pub fn families(&self) -> impl Iterator<Item = &Family> {
        self.entries.keys()
    }

    /// Joins two maps at a CFG merge point.
    ///
    /// Entries present on only one side are combined with the family's empty
    /// context, which leaves them unchanged under the identity law.
    pub fn merge(&self, other: &ContextInfo) -> ContextInfo {
        let mut result = self.clone();
        for (family, context) in &other.entries {
            let merged = match self.entries.get(family) {
                Some(existing) => family.combine(existing, context),
                None => family.combine(&family.empty(), context),
            };
            result.entries.insert(family.clone(), merged);
        }
        result
    }

    pub fn apply_provider(&self, provider: &dyn ContextProvider) -> ContextInfo {
        let family = provider.family();
        let next = provider.provide(&self.get(&family));
        self.with(family, next)
    }

    pub fn apply_cleaner(&self, cleaner: &dyn ContextCleaner) -> ContextInfo {
        let family = cleaner.family();
        let next = cleaner.cleanup(&self.get(&family));
        self.with(family, next)
    }

    fn with(&self, family: Family, context: Context) -> ContextInfo {
        let mut result = self.clone();
        result.entries.insert(family, context);
        result
    }
}
