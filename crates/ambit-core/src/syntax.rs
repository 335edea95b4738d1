//! Syntax subset consumed by the analysis
//!
//! The engine does not parse or resolve source code. Upstream collaborators
//! hand it a [`Module`]: an arena of functions and expressions in which call
//! expressions already carry their resolution results (callee symbol, invoke
//! flag, receiver symbol). Only the shapes the analysis inspects are modeled;
//! everything else is [`Expr::Opaque`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::contract::{EffectDecl, EffectScope};
use crate::error::{ModelError, Result};

/// Identity of a declared callable or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub u32);

/// Identity of a function, named or anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FuncId(pub u32);

/// Identity of an expression in the module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExprId(pub u32);

/// A half-open byte range in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// A formal parameter of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub symbol: Symbol,
}

impl Param {
    pub fn new(name: impl Into<String>, symbol: Symbol) -> Self {
        Self {
            name: name.into(),
            symbol,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncKind {
    /// A named, declared function.
    Declared,
    /// An anonymous function. `in_place` lambdas are guaranteed to be inlined
    /// into their call site rather than stored or escaping.
    Lambda { in_place: bool },
}

/// One function known to the module, with its contract effects attached by
/// the upstream contract parser.
#[derive(Debug)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    pub symbol: Symbol,
    pub params: SmallVec<[Param; 4]>,
    pub kind: FuncKind,
    pub span: Option<Span>,
    pub effects: Vec<EffectDecl>,
    /// Top-level expressions of the body, in source order. May be empty for
    /// functions whose bodies are irrelevant to the caller under analysis.
    pub body: Vec<ExprId>,
}

impl Function {
    pub fn is_in_place_lambda(&self) -> bool {
        matches!(self.kind, FuncKind::Lambda { in_place: true })
    }

    /// The symbol of the parameter at `index`, if the function has one.
    pub fn param_symbol(&self, index: usize) -> Option<Symbol> {
        self.params.get(index).map(|p| p.symbol)
    }
}

/// An argument expression, possibly wrapped with an argument label.
/// Unwrapping the label wrapper means taking `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub label: Option<String>,
    pub value: ExprId,
}

impl Argument {
    pub fn positional(value: ExprId) -> Self {
        Self { label: None, value }
    }

    pub fn labeled(label: impl Into<String>, value: ExprId) -> Self {
        Self {
            label: Some(label.into()),
            value,
        }
    }
}

/// A call expression with its resolution results.
///
/// `callee` is `None` when resolution failed upstream; such calls are
/// skipped by the analysis. Invoke calls (`is_invoke`) call a stored
/// function value through `receiver` rather than a named callee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub callee: Option<Symbol>,
    pub is_invoke: bool,
    pub receiver: Option<Symbol>,
    pub args: Vec<Argument>,
    pub span: Option<Span>,
}

impl Call {
    pub fn direct(callee: Symbol, args: Vec<Argument>, span: Option<Span>) -> Self {
        Self {
            callee: Some(callee),
            is_invoke: false,
            receiver: None,
            args,
            span,
        }
    }

    pub fn invoke(receiver: Symbol, args: Vec<Argument>, span: Option<Span>) -> Self {
        Self {
            callee: None,
            is_invoke: true,
            receiver: Some(receiver),
            args,
            span,
        }
    }
}

/// An expression in the module arena.
#[derive(Debug)]
pub enum Expr {
    Call(Call),
    /// An anonymous function literal.
    Lambda(FuncId),
    /// Syntax the analysis never inspects.
    Opaque,
}

/// Arena of functions and expressions handed to the engine by the host.
/// Read-only during analysis.
#[derive(Debug, Default)]
pub struct Module {
    functions: IndexMap<FuncId, Function>,
    exprs: IndexMap<ExprId, Expr>,
    by_symbol: IndexMap<Symbol, FuncId>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, validating its lambda-scoped effect indices
    /// against the function's arity.
    pub fn add_function(&mut self, function: Function) -> Result<FuncId> {
        if self.functions.contains_key(&function.id) {
            return Err(ModelError::DuplicateFunction(function.id));
        }
        for effect in &function.effects {
            if let EffectScope::Lambda { param_index } = effect.scope {
                if param_index >= function.params.len() {
                    return Err(ModelError::ParamIndexOutOfRange {
                        function: function.id,
                        index: param_index,
                        arity: function.params.len(),
                    });
                }
            }
        }
        let id = function.id;
        self.by_symbol.insert(function.symbol, id);
        self.functions.insert(id, function);
        Ok(id)
    }

    pub fn add_expr(&mut self, id: ExprId, expr: Expr) -> Result<ExprId> {
        if self.exprs.contains_key(&id) {
            return Err(ModelError::DuplicateExpr(id));
        }
        self.exprs.insert(id, expr);
        Ok(id)
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(&id)
    }

    pub fn function_by_symbol(&self, symbol: Symbol) -> Option<&Function> {
        self.by_symbol
            .get(&symbol)
            .and_then(|id| self.functions.get(id))
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(&id)
    }

    /// The expression at `id`, if it is a call.
    pub fn call(&self, id: ExprId) -> Option<&Call> {
        match self.exprs.get(&id) {
            Some(Expr::Call(call)) => Some(call),
            _ => None,
        }
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }
}

/// Maps each argument expression of `call` to the formal parameter index it
/// binds on `callee`: positionally for unlabeled arguments, by name for
/// labeled ones.
///
/// Arguments that cannot be matched (unknown label) are absent from the map;
/// lambdas passed through them are simply treated as ownerless downstream.
/// Returns `None` when the call cannot be mapped at all (more positional
/// arguments than parameters).
pub fn argument_mapping(call: &Call, callee: &Function) -> Option<IndexMap<ExprId, usize>> {
    let mut mapping = IndexMap::new();
    let mut next_positional = 0usize;
    for arg in &call.args {
        match &arg.label {
            Some(label) => {
                if let Some(index) = callee.params.iter().position(|p| p.name == *label) {
                    mapping.insert(arg.value, index);
                }
            }
            None => {
                if next_positional >= callee.params.len() {
                    return None;
                }
                mapping.insert(arg.value, next_positional);
                next_positional += 1;
            }
        }
    }
    Some(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_function(id: u32, symbol: u32, params: Vec<Param>) -> Function {
        Function {
            id: FuncId(id),
            name: format!("f{id}"),
            symbol: Symbol(symbol),
            params: SmallVec::from_vec(params),
            kind: FuncKind::Declared,
            span: None,
            effects: vec![],
            body: vec![],
        }
    }

    #[test]
    fn module_rejects_duplicate_function_ids() {
        let mut module = Module::new();
        module.add_function(make_function(0, 0, vec![])).unwrap();
        let err = module.add_function(make_function(0, 1, vec![])).unwrap_err();
        assert_eq!(err, ModelError::DuplicateFunction(FuncId(0)));
    }

    #[test]
    fn module_rejects_duplicate_expr_ids() {
        let mut module = Module::new();
        module.add_expr(ExprId(0), Expr::Opaque).unwrap();
        let err = module.add_expr(ExprId(0), Expr::Opaque).unwrap_err();
        assert_eq!(err, ModelError::DuplicateExpr(ExprId(0)));
    }

    #[test]
    fn module_rejects_effect_on_missing_param() {
        use crate::contract::{ActionExtractors, EffectDecl};

        let mut function = make_function(0, 0, vec![Param::new("block", Symbol(10))]);
        function.effects.push(EffectDecl::lambda(3, ActionExtractors::default()));

        let err = Module::new().add_function(function).unwrap_err();
        assert_eq!(
            err,
            ModelError::ParamIndexOutOfRange {
                function: FuncId(0),
                index: 3,
                arity: 1,
            }
        );
    }

    #[test]
    fn lookup_by_symbol() {
        let mut module = Module::new();
        module.add_function(make_function(0, 7, vec![])).unwrap();
        assert_eq!(
            module.function_by_symbol(Symbol(7)).map(|f| f.id),
            Some(FuncId(0))
        );
        assert!(module.function_by_symbol(Symbol(8)).is_none());
    }

    #[test]
    fn mapping_positional_arguments() {
        let callee = make_function(
            0,
            0,
            vec![Param::new("a", Symbol(1)), Param::new("b", Symbol(2))],
        );
        let call = Call::direct(
            Symbol(0),
            vec![Argument::positional(ExprId(10)), Argument::positional(ExprId(11))],
            None,
        );

        let mapping = argument_mapping(&call, &callee).unwrap();
        assert_eq!(mapping.get(&ExprId(10)), Some(&0));
        assert_eq!(mapping.get(&ExprId(11)), Some(&1));
    }

    #[test]
    fn mapping_labeled_arguments_by_name() {
        let callee = make_function(
            0,
            0,
            vec![Param::new("a", Symbol(1)), Param::new("block", Symbol(2))],
        );
        let call = Call::direct(
            Symbol(0),
            vec![
                Argument::labeled("block", ExprId(10)),
                Argument::positional(ExprId(11)),
            ],
            None,
        );

        let mapping = argument_mapping(&call, &callee).unwrap();
        assert_eq!(mapping.get(&ExprId(10)), Some(&1));
        assert_eq!(mapping.get(&ExprId(11)), Some(&0));
    }

    #[test]
    fn mapping_skips_unknown_label() {
        let callee = make_function(0, 0, vec![Param::new("a", Symbol(1))]);
        let call = Call::direct(
            Symbol(0),
            vec![Argument::labeled("nope", ExprId(10))],
            None,
        );

        let mapping = argument_mapping(&call, &callee).unwrap();
        assert!(mapping.is_empty());
    }

    #[test]
    fn mapping_fails_on_positional_overflow() {
        let callee = make_function(0, 0, vec![]);
        let call = Call::direct(Symbol(0), vec![Argument::positional(ExprId(10))], None);
        assert!(argument_mapping(&call, &callee).is_none());
    }

    #[test]
    fn in_place_lambda_detection() {
        let mut function = make_function(0, 0, vec![]);
        assert!(!function.is_in_place_lambda());

        function.kind = FuncKind::Lambda { in_place: false };
        assert!(!function.is_in_place_lambda());

        function.kind = FuncKind::Lambda { in_place: true };
        assert!(function.is_in_place_lambda());
    }
}
