//! Error types for steward-core
//!
//! The taxonomy follows the pipeline: syntax and evaluation errors abort
//! the compile with nothing applied; graph errors abort before any
//! resource is touched; individual sync failures are *not* errors at this
//! level, they are recorded in the apply outcome.

use std::fmt;
use steward_lang::ParseError;
use steward_resource::ResourceId;
use thiserror::Error;

/// Where in a manifest an evaluation error originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub source_name: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.source_name, self.line, self.column)
    }
}

/// Fatal errors while evaluating a parsed manifest.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("{at}: unknown resource type '{name}'")]
    UnknownType { at: Location, name: String },

    #[error("{at}: unknown class '{name}'")]
    UnknownClass { at: Location, name: String },

    #[error("{at}: '{attribute}' is not a valid attribute of {type_name}")]
    UnknownAttribute {
        at: Location,
        type_name: String,
        attribute: String,
    },

    #[error("{at}: {id} is already declared with conflicting values")]
    DuplicateResource { at: Location, id: ResourceId },

    #[error("{at}: {kind} '{name}' is already defined")]
    AlreadyDefined {
        at: Location,
        kind: &'static str,
        name: String,
    },

    #[error("{at}: class inheritance cycle: {chain}")]
    InheritanceCycle { at: Location, chain: String },

    #[error("{at}: invalid value for metaparameter '{name}': {message}")]
    BadMetaparam {
        at: Location,
        name: String,
        message: String,
    },

    #[error("{at}: define '{define}' has no argument '{argument}'")]
    UnknownArgument {
        at: Location,
        define: String,
        argument: String,
    },

    #[error("{at}: missing required argument '{argument}' for '{define}'")]
    MissingArgument {
        at: Location,
        define: String,
        argument: String,
    },

    #[error("{at}: no selector arm matches '{value}'")]
    SelectorNoMatch { at: Location, value: String },
}

impl EvalError {
    /// The manifest position the error points at.
    pub fn location(&self) -> &Location {
        match self {
            EvalError::UnknownType { at, .. }
            | EvalError::UnknownClass { at, .. }
            | EvalError::UnknownAttribute { at, .. }
            | EvalError::DuplicateResource { at, .. }
            | EvalError::AlreadyDefined { at, .. }
            | EvalError::InheritanceCycle { at, .. }
            | EvalError::BadMetaparam { at, .. }
            | EvalError::UnknownArgument { at, .. }
            | EvalError::MissingArgument { at, .. }
            | EvalError::SelectorNoMatch { at, .. } => at,
        }
    }
}

/// Fatal errors while building the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("dependency cycle involving: {}", .members.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", "))]
    Cycle { members: Vec<ResourceId> },

    #[error("{from} references undeclared resource {to}")]
    UnknownReference { from: ResourceId, to: ResourceId },
}

/// Errors on the transaction handle itself. Per-resource sync failures
/// are reported in [`ApplyOutcome`](crate::transaction::ApplyOutcome),
/// not here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has already been rolled back")]
    AlreadyRolledBack,
}

/// Any error that aborts compilation of a manifest.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl CompileError {
    pub fn line(&self) -> u32 {
        match self {
            CompileError::Parse(e) => e.line,
            CompileError::Eval(e) => e.location().line,
        }
    }

    pub fn column(&self) -> u32 {
        match self {
            CompileError::Parse(e) => e.column,
            CompileError::Eval(e) => e.location().column,
        }
    }
}
