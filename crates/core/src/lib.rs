//! steward-core: manifest compilation and transactional apply
//!
//! The pipeline runs in stages, each one fallible and side-effect free
//! until the transaction:
//!
//! 1. [`steward_lang::parse`] turns manifest text into an AST
//! 2. [`evaluate`] resolves it into a [`ResolvedModel`] of concrete
//!    resources
//! 3. [`ResourceGraph::build`] orders the model by its dependencies
//! 4. [`Transaction::apply`] syncs the host and journals every change,
//!    ready for [`Transaction::rollback`]
//!
//! [`compile`] wraps the first two stages.

mod error;
mod eval;
mod graph;
mod model;
mod scope;
mod transaction;

pub use error::{CompileError, EvalError, GraphError, Location, TransactionError};
pub use eval::{evaluate, DuplicatePolicy, EvalOptions};
pub use graph::ResourceGraph;
pub use model::ResolvedModel;
pub use transaction::{
    ApplyOutcome, ChangeRecord, FailedReversal, ResourceEvent, RollbackOutcome, Transaction,
};

// The resource-layer types callers need alongside the engine.
pub use steward_resource::{
    Provider, ProviderSet, ResourceId, ResourceSpec, TypeMetadata, TypeRegistry, Value,
};

/// Parse and evaluate a manifest in one step.
pub fn compile(
    text: &str,
    source_name: &str,
    registry: &TypeRegistry,
    options: EvalOptions,
) -> Result<ResolvedModel, CompileError> {
    let ast = steward_lang::parse(text, source_name)?;
    let model = evaluate(&ast, registry, options)?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_parse_error_carries_position() {
        let err = compile(
            "file { broken",
            "main.std",
            &TypeRegistry::builtin(),
            EvalOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
        assert_eq!(err.line(), 1);
    }

    #[test]
    fn test_compile_eval_error_carries_position() {
        let err = compile(
            "\nwidget { \"x\": }",
            "main.std",
            &TypeRegistry::builtin(),
            EvalOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Eval(EvalError::UnknownType { .. })));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_compile_produces_model() {
        let model = compile(
            r#"file { "/tmp/x": mode => 644 }"#,
            "main.std",
            &TypeRegistry::builtin(),
            EvalOptions::default(),
        )
        .unwrap();
        assert_eq!(model.len(), 1);
    }
}
