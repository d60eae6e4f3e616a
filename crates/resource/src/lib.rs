//! steward-resource: resource model and provider capabilities
//!
//! This crate defines what a resource *is* (values, specifications,
//! identities), what resource types *look like* (the type registry), and
//! how the engine touches the host (the provider capability interface).
//! The built-in `file` and `exec` providers live here, along with an
//! in-memory provider used by tests.

mod error;
mod exec;
mod file;
pub mod mem;
mod provider;
mod registry;
mod spec;
mod value;

pub use error::ProviderError;
pub use exec::ExecProvider;
pub use file::FileProvider;
pub use provider::{CurrentState, Provider, ProviderSet};
pub use registry::{is_metaparameter, TypeMetadata, TypeRegistry, METAPARAMETERS};
pub use spec::{Metaparams, ResourceId, ResourceSpec};
pub use value::Value;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
