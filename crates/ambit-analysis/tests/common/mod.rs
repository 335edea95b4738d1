//! Shared fixtures: two conforming coeffect families plus module builders.
//!
//! The union family models may-facts (a fact is present once any path
//! provided it); the path-counting family models must-facts (a fact only
//! holds when every path reaching the node provided it).

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use ambit_core::coeffect::{
    Actions, Context, ContextCleaner, ContextProvider, ContextVerifier, Family, FamilyOps,
};
use ambit_core::contract::{ActionExtractors, EffectDecl};
use ambit_core::diagnostics::{
    MissingContext, ObligationViolation, UnexpectedContext, VerificationError,
};
use ambit_core::syntax::{FuncId, FuncKind, Function, Param, Span, Symbol};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactSet(pub BTreeSet<String>);

#[derive(Debug)]
struct UnionFamily(&'static str);

impl FamilyOps for UnionFamily {
    fn name(&self) -> &str {
        self.0
    }

    fn empty(&self) -> Context {
        Context::new(FactSet(BTreeSet::new()))
    }

    fn combine(&self, a: &Context, b: &Context) -> Context {
        let a = a.downcast_ref::<FactSet>().unwrap();
        let b = b.downcast_ref::<FactSet>().unwrap();
        Context::new(FactSet(a.0.union(&b.0).cloned().collect()))
    }
}

pub fn union_family(name: &'static str) -> Family {
    Family::new(UnionFamily(name))
}

#[derive(Debug)]
pub struct AddFact {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextProvider for AddFact {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn provide(&self, context: &Context) -> Context {
        let mut facts = context.downcast_ref::<FactSet>().unwrap().0.clone();
        facts.insert(self.fact.to_string());
        Context::new(FactSet(facts))
    }
}

#[derive(Debug)]
pub struct DropFact {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextCleaner for DropFact {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn cleanup(&self, context: &Context) -> Context {
        let mut facts = context.downcast_ref::<FactSet>().unwrap().0.clone();
        facts.remove(self.fact);
        Context::new(FactSet(facts))
    }
}

#[derive(Debug)]
pub struct RequireFact {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextVerifier for RequireFact {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>> {
        let facts = context.downcast_ref::<FactSet>().unwrap();
        if facts.0.contains(self.fact) {
            vec![]
        } else {
            vec![Box::new(MissingContext)]
        }
    }
}

#[derive(Debug)]
pub struct ForbidFact {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextVerifier for ForbidFact {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>> {
        let facts = context.downcast_ref::<FactSet>().unwrap();
        if facts.0.contains(self.fact) {
            vec![Box::new(UnexpectedContext)]
        } else {
            vec![]
        }
    }
}

/// Reports the exception type as a payload-carrying violation when it is
/// not marked handled in the context.
#[derive(Debug)]
pub struct ExpectHandled {
    pub family: Family,
    pub exception: &'static str,
}

impl ContextVerifier for ExpectHandled {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>> {
        let facts = context.downcast_ref::<FactSet>().unwrap();
        if facts.0.contains(self.exception) {
            vec![]
        } else {
            vec![Box::new(ObligationViolation::new(self.exception))]
        }
    }
}

/// An error type the reporter does not recognize.
#[derive(Debug, PartialEq)]
pub struct AlienError;

impl VerificationError for AlienError {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Always yields an error kind the reporter must drop.
#[derive(Debug)]
pub struct AlienVerifier {
    pub family: Family,
}

impl ContextVerifier for AlienVerifier {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, _context: &Context) -> Vec<Box<dyn VerificationError>> {
        vec![Box::new(AlienError)]
    }
}

/// Must-facts: a fact holds only when provided on every path reaching the
/// node. Contexts count paths and per-fact provisions; combining adds both,
/// so the all-zero context is the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFacts {
    pub paths: u32,
    pub facts: BTreeMap<String, u32>,
}

#[derive(Debug)]
struct PathFamily(&'static str);

impl FamilyOps for PathFamily {
    fn name(&self) -> &str {
        self.0
    }

    fn empty(&self) -> Context {
        Context::new(PathFacts {
            paths: 0,
            facts: BTreeMap::new(),
        })
    }

    fn combine(&self, a: &Context, b: &Context) -> Context {
        let a = a.downcast_ref::<PathFacts>().unwrap();
        let b = b.downcast_ref::<PathFacts>().unwrap();
        let mut facts = a.facts.clone();
        for (fact, count) in &b.facts {
            *facts.entry(fact.clone()).or_insert(0) += count;
        }
        Context::new(PathFacts {
            paths: a.paths + b.paths,
            facts,
        })
    }
}

pub fn path_family(name: &'static str) -> Family {
    Family::new(PathFamily(name))
}

/// Marks one traversed path; fired at function entry.
#[derive(Debug)]
pub struct EnterPath {
    pub family: Family,
}

impl ContextProvider for EnterPath {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn provide(&self, context: &Context) -> Context {
        let current = context.downcast_ref::<PathFacts>().unwrap();
        Context::new(PathFacts {
            paths: current.paths + 1,
            facts: current.facts.clone(),
        })
    }
}

/// Marks the fact as provided on every path seen so far.
#[derive(Debug)]
pub struct ProvideOnPath {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextProvider for ProvideOnPath {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn provide(&self, context: &Context) -> Context {
        let current = context.downcast_ref::<PathFacts>().unwrap();
        let mut facts = current.facts.clone();
        facts.insert(self.fact.to_string(), current.paths);
        Context::new(PathFacts {
            paths: current.paths,
            facts,
        })
    }
}

/// Fails unless the fact was provided on every incoming path.
#[derive(Debug)]
pub struct MustHold {
    pub family: Family,
    pub fact: &'static str,
}

impl ContextVerifier for MustHold {
    fn family(&self) -> Family {
        self.family.clone()
    }

    fn verify(&self, context: &Context) -> Vec<Box<dyn VerificationError>> {
        let current = context.downcast_ref::<PathFacts>().unwrap();
        let held = current.paths > 0 && current.facts.get(self.fact) == Some(&current.paths);
        if held {
            vec![]
        } else {
            vec![Box::new(MissingContext)]
        }
    }
}

// --- module builders -------------------------------------------------------

pub fn declared(id: u32, symbol: u32, params: Vec<Param>, effects: Vec<EffectDecl>) -> Function {
    Function {
        id: FuncId(id),
        name: format!("f{id}"),
        symbol: Symbol(symbol),
        params: params.into(),
        kind: FuncKind::Declared,
        span: Some(Span::new(id * 100, id * 100 + 10)),
        effects,
        body: vec![],
    }
}

pub fn in_place_lambda(id: u32, symbol: u32) -> Function {
    Function {
        id: FuncId(id),
        name: format!("lambda{id}"),
        symbol: Symbol(symbol),
        params: Default::default(),
        kind: FuncKind::Lambda { in_place: true },
        span: Some(Span::new(id * 100, id * 100 + 10)),
        effects: vec![],
        body: vec![],
    }
}

pub fn on_call(actions: Actions) -> EffectDecl {
    EffectDecl::direct(
        ActionExtractors::builder()
            .on_owner_call(move |_| Some(actions.clone()))
            .build(),
    )
}

pub fn on_enter(actions: Actions) -> EffectDecl {
    EffectDecl::direct(
        ActionExtractors::builder()
            .on_owner_enter(move |_| Some(actions.clone()))
            .build(),
    )
}

pub fn on_exit(actions: Actions) -> EffectDecl {
    EffectDecl::direct(
        ActionExtractors::builder()
            .on_owner_exit(move |_| Some(actions.clone()))
            .build(),
    )
}

pub fn lambda_on_call(param_index: usize, actions: Actions) -> EffectDecl {
    EffectDecl::lambda(
        param_index,
        ActionExtractors::builder()
            .on_owner_call(move |_| Some(actions.clone()))
            .build(),
    )
}

pub fn lambda_on_enter(param_index: usize, actions: Actions) -> EffectDecl {
    EffectDecl::lambda(
        param_index,
        ActionExtractors::builder()
            .on_owner_enter(move |_| Some(actions.clone()))
            .build(),
    )
}

pub fn lambda_on_exit(param_index: usize, actions: Actions) -> EffectDecl {
    EffectDecl::lambda(
        param_index,
        ActionExtractors::builder()
            .on_owner_exit(move |_| Some(actions.clone()))
            .build(),
    )
}
