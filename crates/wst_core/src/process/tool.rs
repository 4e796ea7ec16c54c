//! Required external program checks.
//!
//! Every tool declares the programs it shells out to. They are resolved
//! once, before any work is dispatched, so a missing binary fails the run
//! up front instead of failing every item.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from external program resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Program is not on PATH.
    #[error("required program '{tool}' is not installed or not in PATH")]
    Missing { tool: String },

    /// Program exists but cannot be executed.
    #[error("required program '{tool}' at {path} is not executable")]
    NotExecutable { tool: String, path: PathBuf },
}

/// Result type for tool resolution.
pub type ToolResult<T> = Result<T, ToolError>;

/// Resolve one required program against `PATH`.
///
/// Names containing a path separator are checked directly.
pub fn require_tool(name: &str) -> ToolResult<PathBuf> {
    let path_var = env::var_os("PATH").unwrap_or_default();
    require_tool_in(name, &path_var)
}

/// Resolve every required program, stopping at the first missing one.
pub fn require_tools(names: &[&str]) -> ToolResult<Vec<PathBuf>> {
    let resolved = names
        .iter()
        .map(|name| require_tool(name))
        .collect::<ToolResult<Vec<_>>>()?;

    for (name, path) in names.iter().zip(&resolved) {
        tracing::debug!("Found {} at {}", name, path.display());
    }
    Ok(resolved)
}

/// Resolve `name` against an explicit search path value.
pub fn require_tool_in(name: &str, path_var: &OsStr) -> ToolResult<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return check_candidate(name, &path)?.ok_or_else(|| ToolError::Missing {
            tool: name.to_string(),
        });
    }

    let mut not_executable = None;
    for dir in env::split_paths(path_var) {
        let candidate = dir.join(name);
        match check_candidate(name, &candidate) {
            Ok(Some(path)) => return Ok(path),
            Ok(None) => {}
            Err(e) => {
                not_executable.get_or_insert(e);
            }
        }
    }

    Err(not_executable.unwrap_or_else(|| ToolError::Missing {
        tool: name.to_string(),
    }))
}

/// `Ok(Some)` if runnable, `Ok(None)` if absent, `Err` if present but not executable.
fn check_candidate(name: &str, path: &Path) -> ToolResult<Option<PathBuf>> {
    if !path.is_file() {
        return Ok(None);
    }
    if is_executable(path) {
        Ok(Some(path.to_path_buf()))
    } else {
        Err(ToolError::NotExecutable {
            tool: name.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[cfg(unix)]
    fn make_file(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        fs::write(path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[test]
    fn finds_shell() {
        assert!(require_tool("sh").is_ok());
    }

    #[test]
    fn missing_tool_is_reported() {
        let err = require_tool("definitely-not-a-real-program-xyz").unwrap_err();
        assert_eq!(
            err,
            ToolError::Missing {
                tool: "definitely-not-a-real-program-xyz".to_string()
            }
        );
        assert!(err.to_string().contains("not installed"));
    }

    #[test]
    fn require_tools_stops_at_first_missing() {
        let err = require_tools(&["sh", "nope-nope-nope"]).unwrap_err();
        assert!(matches!(err, ToolError::Missing { tool } if tool == "nope-nope-nope"));
    }

    #[cfg(unix)]
    #[test]
    fn searches_explicit_path_in_order() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        make_file(&second.path().join("mytool"), 0o755);

        let path_var = env::join_paths([first.path(), second.path()]).unwrap();
        let found = require_tool_in("mytool", &path_var).unwrap();
        assert_eq!(found, second.path().join("mytool"));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_flagged() {
        let dir = tempdir().unwrap();
        make_file(&dir.path().join("mytool"), 0o644);

        let path_var = env::join_paths([dir.path()]).unwrap();
        let err = require_tool_in("mytool", &path_var).unwrap_err();
        assert!(matches!(err, ToolError::NotExecutable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn explicit_path_is_checked_directly() {
        let dir = tempdir().unwrap();
        let tool = dir.path().join("enc");
        make_file(&tool, 0o755);

        let found = require_tool_in(tool.to_str().unwrap(), OsStr::new("")).unwrap();
        assert_eq!(found, tool);
    }
}
