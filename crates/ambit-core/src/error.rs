//! Model construction errors

use thiserror::Error;

use crate::cfg::NodeId;
use crate::syntax::{ExprId, FuncId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate function id {0:?}")]
    DuplicateFunction(FuncId),

    #[error("duplicate expression id {0:?}")]
    DuplicateExpr(ExprId),

    #[error("edge references unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error(
        "effect declaration on {function:?} references parameter {index}, \
         but the function has {arity} parameters"
    )]
    ParamIndexOutOfRange {
        function: FuncId,
        index: usize,
        arity: usize,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
