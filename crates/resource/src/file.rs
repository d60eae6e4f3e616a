//! Built-in `file` resource provider
//!
//! Manages plain files and directories: existence (`ensure`), inline
//! `content`, and Unix `mode`. The namevar is `path`, so the resource
//! title is the managed path.
//!
//! `ensure` uses the vocabulary `file` / `directory` / `absent` (with
//! `present` accepted as a synonym for `file` when syncing). A file
//! resource defaults to `ensure => file`, which is what makes
//! `file { "/tmp/t": mode => 755 }` create the file.

use crate::error::ProviderError;
use crate::provider::{CurrentState, Provider};
use crate::registry::TypeMetadata;
use crate::spec::ResourceSpec;
use crate::value::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FileProvider;

impl FileProvider {
    /// Type metadata for `file`.
    pub fn metadata() -> TypeMetadata {
        TypeMetadata::new("file", "path", &["ensure", "content", "mode"], &[])
            .with_default("ensure", "file")
    }
}

fn target_path(spec: &ResourceSpec) -> PathBuf {
    match spec.param("path") {
        Some(v) => PathBuf::from(v.to_string()),
        None => PathBuf::from(&spec.id.title),
    }
}

fn ensure_parent(path: &Path) -> Result<(), ProviderError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn read_mode(metadata: &fs::Metadata) -> Value {
    use std::os::unix::fs::PermissionsExt;
    Value::String(format!("{:o}", metadata.permissions().mode() & 0o7777))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ProviderError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(windows)]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ProviderError> {
    // Windows doesn't use Unix permissions
    Ok(())
}

fn parse_mode(desired: &Value) -> Result<u32, ProviderError> {
    let text = desired.to_string();
    u32::from_str_radix(&text, 8)
        .map_err(|_| ProviderError::invalid_value("mode", format!("'{text}' is not octal")))
}

impl Provider for FileProvider {
    fn type_name(&self) -> &'static str {
        "file"
    }

    fn retrieve(&self, spec: &ResourceSpec) -> Result<CurrentState, ProviderError> {
        let path = target_path(spec);
        let mut state = CurrentState::new();

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                state.insert("ensure".into(), Value::from("absent"));
                return Ok(state);
            }
            Err(e) => return Err(e.into()),
        };

        let ensure = if metadata.is_dir() { "directory" } else { "file" };
        state.insert("ensure".into(), Value::from(ensure));
        if metadata.is_file() {
            if let Ok(content) = fs::read_to_string(&path) {
                state.insert("content".into(), Value::String(content));
            }
        }
        #[cfg(unix)]
        state.insert("mode".into(), read_mode(&metadata));

        Ok(state)
    }

    fn sync(
        &self,
        spec: &ResourceSpec,
        property: &str,
        desired: &Value,
    ) -> Result<(), ProviderError> {
        if desired.is_undef() {
            return Ok(());
        }
        let path = target_path(spec);
        debug!(path = %path.display(), property, desired = %desired, "syncing file property");

        match property {
            "ensure" => match desired.to_string().as_str() {
                "absent" => {
                    match fs::symlink_metadata(&path) {
                        Ok(m) if m.is_dir() => fs::remove_dir_all(&path)?,
                        Ok(_) => fs::remove_file(&path)?,
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                    Ok(())
                }
                "file" | "present" => {
                    if !path.exists() {
                        ensure_parent(&path)?;
                        fs::write(&path, "")?;
                    }
                    Ok(())
                }
                "directory" => {
                    fs::create_dir_all(&path)?;
                    Ok(())
                }
                other => Err(ProviderError::invalid_value(
                    "ensure",
                    format!("unknown ensure state '{other}'"),
                )),
            },
            "content" => {
                ensure_parent(&path)?;
                fs::write(&path, desired.to_string())?;
                Ok(())
            }
            "mode" => {
                let mode = parse_mode(desired)?;
                set_mode(&path, mode)
            }
            other => Err(ProviderError::UnknownProperty {
                property: other.to_string(),
            }),
        }
    }
}
