//! Built-in `exec` resource provider
//!
//! Runs a shell command and checks its exit status against the `returns`
//! property (default `0`). The namevar is `command`. The `creates`
//! parameter names a path whose existence means the command already ran;
//! without it, an exec is considered out of sync on every apply.
//!
//! A run cannot be un-run: syncing `returns` back to `notrun` during
//! rollback is a deliberate no-op.

use crate::error::ProviderError;
use crate::provider::{CurrentState, Provider};
use crate::registry::TypeMetadata;
use crate::spec::ResourceSpec;
use crate::value::Value;
use std::path::Path;
use std::process::Command;
use tracing::debug;

pub struct ExecProvider;

impl ExecProvider {
    /// Type metadata for `exec`.
    pub fn metadata() -> TypeMetadata {
        TypeMetadata::new("exec", "command", &["returns"], &["path", "creates"])
            .with_default("returns", "0")
    }
}

fn command_line(spec: &ResourceSpec) -> String {
    match spec.param("command") {
        Some(v) => v.to_string(),
        None => spec.id.title.clone(),
    }
}

/// Run the command, returning its exit code.
fn run(spec: &ResourceSpec) -> Result<i32, ProviderError> {
    let command = command_line(spec);
    let mut sh = Command::new("sh");
    sh.arg("-c").arg(&command);
    if let Some(path) = spec.param("path") {
        // `path` may be an array of directories
        let joined = match path {
            Value::Array(items) => items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(":"),
            other => other.to_string(),
        };
        sh.env("PATH", joined);
    }

    debug!(%command, "running exec command");
    let status = sh.status().map_err(|e| ProviderError::CommandFailed {
        command: command.clone(),
        detail: e.to_string(),
    })?;
    Ok(status.code().unwrap_or(-1))
}

impl Provider for ExecProvider {
    fn type_name(&self) -> &'static str {
        "exec"
    }

    fn retrieve(&self, spec: &ResourceSpec) -> Result<CurrentState, ProviderError> {
        let mut state = CurrentState::new();
        let already_ran = spec
            .param("creates")
            .is_some_and(|v| Path::new(&v.to_string()).exists());
        let returns = if already_ran { "0" } else { "notrun" };
        state.insert("returns".into(), Value::from(returns));
        Ok(state)
    }

    fn sync(
        &self,
        spec: &ResourceSpec,
        property: &str,
        desired: &Value,
    ) -> Result<(), ProviderError> {
        if property != "returns" {
            return Err(ProviderError::UnknownProperty {
                property: property.to_string(),
            });
        }
        if desired.is_undef() {
            return Ok(());
        }
        let expected = desired.to_string();
        if expected == "notrun" {
            debug!(command = %command_line(spec), "exec cannot be rolled back");
            return Ok(());
        }

        let code = run(spec)?;
        if code.to_string() != expected {
            return Err(ProviderError::CommandFailed {
                command: command_line(spec),
                detail: format!("exit status {code}, expected {expected}"),
            });
        }
        Ok(())
    }

    /// A subscribed-to resource changed: run the command again.
    fn refresh(&self, spec: &ResourceSpec) -> Result<(), ProviderError> {
        let code = run(spec)?;
        let expected = match spec.param("returns") {
            Some(v) => v.to_string(),
            None => "0".to_string(),
        };
        if code.to_string() != expected {
            return Err(ProviderError::CommandFailed {
                command: command_line(spec),
                detail: format!("exit status {code} on refresh, expected {expected}"),
            });
        }
        Ok(())
    }
}
