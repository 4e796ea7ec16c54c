//! Work-list building from directory walks, command output and JSON lists.
//!
//! A builder never aborts a walk because one entry is unreadable; it logs
//! and moves on. Fixed sources (a command's output, a JSON file) are
//! preconditions instead: if the source itself fails, the run fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use thiserror::Error;
use walkdir::WalkDir;

use super::item::WorkItem;
use crate::process::{exit_code, CommandLine};

/// Errors from fixed work-list sources.
#[derive(Error, Debug)]
pub enum WorkListError {
    /// The source command could not be started.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The source command ran and failed.
    #[error("'{command}' failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// A list file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A list file is not valid JSON of the expected shape.
    #[error("invalid work list in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for work-list sources.
pub type WorkListResult<T> = Result<T, WorkListError>;

/// Lower-cased file extension helper.
pub trait PathExt {
    fn ext_lower(&self) -> String;
}

impl PathExt for Path {
    fn ext_lower(&self) -> String {
        self.extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// What a directory walk collects.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WalkMode {
    /// Regular files, optionally filtered by extension.
    Files,
    /// Directories that contain an entry with this name (e.g. `.git`).
    DirsContaining(String),
}

/// Builds a list of independent work items.
#[derive(Debug, Clone)]
pub struct WorkListBuilder {
    extensions: Vec<String>,
    max_depth: Option<usize>,
    follow_links: bool,
    mode: WalkMode,
}

impl Default for WorkListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkListBuilder {
    /// Collect every regular file.
    pub fn new() -> Self {
        Self {
            extensions: Vec::new(),
            max_depth: None,
            follow_links: false,
            mode: WalkMode::Files,
        }
    }

    /// Only keep files with one of these extensions (case-insensitive).
    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    /// Limit walk depth; 0 means only the roots themselves.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Follow symbolic links while walking.
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Collect directories containing `marker` instead of files.
    ///
    /// The walk does not descend into a directory once it matches.
    pub fn containing(mut self, marker: impl Into<String>) -> Self {
        self.mode = WalkMode::DirsContaining(marker.into());
        self
    }

    /// Whether `path` passes the extension filter.
    pub fn matches_extension(&self, path: &Path) -> bool {
        self.extensions.is_empty() || self.extensions.contains(&path.ext_lower())
    }

    /// Walk each root and collect matching items, sorted by path.
    ///
    /// Missing roots and unreadable entries are logged and skipped.
    pub fn walk<P: AsRef<Path>>(&self, roots: &[P]) -> Vec<WorkItem> {
        let mut paths = Vec::new();

        for root in roots {
            let root = root.as_ref();
            if !root.exists() {
                tracing::warn!("Skipping {}: no such file or directory", root.display());
                continue;
            }
            self.walk_root(root, &mut paths);
        }

        paths.sort();
        paths.dedup();
        tracing::debug!("Work list has {} items", paths.len());
        paths.into_iter().map(WorkItem::from_path).collect()
    }

    fn walk_root(&self, root: &Path, paths: &mut Vec<PathBuf>) {
        let mut walker = WalkDir::new(root).follow_links(self.follow_links);
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }

        let mut entries = walker.into_iter();
        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            match &self.mode {
                WalkMode::Files => {
                    if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                        paths.push(entry.into_path());
                    }
                }
                WalkMode::DirsContaining(marker) => {
                    if entry.file_type().is_dir() && entry.path().join(marker).exists() {
                        paths.push(entry.path().to_path_buf());
                        entries.skip_current_dir();
                    }
                }
            }
        }
    }

    /// One item per non-empty line of `text`.
    pub fn from_lines(text: &str) -> Vec<WorkItem> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(WorkItem::new)
            .collect()
    }

    /// One item per NUL-terminated record of `text`, kept verbatim.
    ///
    /// For listings made with `-z`/`-print0`, where names may contain
    /// newlines or leading whitespace.
    pub fn from_nul_separated(text: &str) -> Vec<WorkItem> {
        text.split('\0')
            .filter(|record| !record.is_empty())
            .map(WorkItem::new)
            .collect()
    }

    /// Run `cmd` once and build items from its output lines.
    pub fn from_command(cmd: &CommandLine) -> WorkListResult<Vec<WorkItem>> {
        let stdout = run_listing(cmd)?;
        Ok(Self::from_lines(&String::from_utf8_lossy(&stdout)))
    }

    /// Run `cmd` once and build items from its NUL-separated output.
    pub fn from_command_nul(cmd: &CommandLine) -> WorkListResult<Vec<WorkItem>> {
        let stdout = run_listing(cmd)?;
        Ok(Self::from_nul_separated(&String::from_utf8_lossy(&stdout)))
    }

    /// Read items from a JSON file.
    ///
    /// The file holds an array whose entries are either plain id strings or
    /// objects `{ "id": .., "path": .., "params": { .. } }`.
    pub fn from_json_file(path: &Path) -> WorkListResult<Vec<WorkItem>> {
        let content = fs::read_to_string(path).map_err(|source| WorkListError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let entries: Vec<JsonEntry> =
            serde_json::from_str(&content).map_err(|source| WorkListError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                JsonEntry::Id(id) => WorkItem::new(id),
                JsonEntry::Item(item) => item,
            })
            .collect())
    }
}

fn run_listing(cmd: &CommandLine) -> WorkListResult<Vec<u8>> {
    tracing::debug!("Listing work with: {}", cmd);

    let output = cmd
        .to_command()
        .stdin(Stdio::null())
        .output()
        .map_err(|source| WorkListError::Spawn {
            command: cmd.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(WorkListError::CommandFailed {
            command: cmd.to_string(),
            code: exit_code(output.status),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonEntry {
    Id(String),
    Item(WorkItem),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn walk_filters_by_extension() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("a.tif"));
        touch(&dir.path().join("B.TIFF"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("sub/c.tif"));

        let items = WorkListBuilder::new()
            .extensions(&["tif", ".tiff"])
            .walk(&[dir.path()]);

        let names: Vec<_> = items
            .iter()
            .map(|i| i.path().unwrap().file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"B.TIFF".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn walk_accepts_file_roots_and_skips_missing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("x.flac");
        touch(&file);

        let items = WorkListBuilder::new()
            .extensions(&["flac"])
            .walk(&[file.clone(), dir.path().join("missing")]);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path(), Some(file.as_path()));
    }

    #[test]
    fn walk_deduplicates_overlapping_roots() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.pdf");
        touch(&file);

        let items = WorkListBuilder::new()
            .extensions(&["pdf"])
            .walk(&[dir.path().to_path_buf(), file]);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn max_depth_limits_walk() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("top.mp4"));
        touch(&dir.path().join("deep/nested.mp4"));

        let items = WorkListBuilder::new().max_depth(1).walk(&[dir.path()]);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn containing_finds_repositories_without_descending() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("one/.git")).unwrap();
        fs::create_dir_all(dir.path().join("two/.git")).unwrap();
        fs::create_dir_all(dir.path().join("one/vendored/.git")).unwrap();
        fs::create_dir_all(dir.path().join("plain")).unwrap();

        let items = WorkListBuilder::new().containing(".git").walk(&[dir.path()]);

        assert_eq!(items.len(), 2);
        assert!(items[0].id().ends_with("one"));
        assert!(items[1].id().ends_with("two"));
    }

    #[test]
    fn lines_skip_blanks() {
        let items = WorkListBuilder::from_lines("vim\n\n  curl  \n");
        let ids: Vec<_> = items.iter().map(WorkItem::id).collect();
        assert_eq!(ids, vec!["vim", "curl"]);
    }

    #[cfg(unix)]
    #[test]
    fn command_output_becomes_items() {
        let cmd = CommandLine::new("sh").arg("-c").arg("printf 'a\\nb\\n'");
        let items = WorkListBuilder::from_command(&cmd).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn nul_records_are_kept_verbatim() {
        let items = WorkListBuilder::from_nul_separated("café.txt\0 lead.txt\0two\nlines\0");
        let ids: Vec<_> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec!["café.txt", " lead.txt", "two\nlines"]);
    }

    #[cfg(unix)]
    #[test]
    fn nul_command_output_becomes_items() {
        let cmd = CommandLine::new("sh").arg("-c").arg("printf ' a\\0b c\\0'");
        let items = WorkListBuilder::from_command_nul(&cmd).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![" a", "b c"]);
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_is_an_error() {
        let cmd = CommandLine::new("sh").arg("-c").arg("echo nope >&2; exit 2");
        let err = WorkListBuilder::from_command(&cmd).unwrap_err();
        assert!(
            matches!(err, WorkListError::CommandFailed { code: 2, ref stderr, .. } if stderr == "nope")
        );
    }

    #[test]
    fn json_accepts_strings_and_objects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("feeds.json");
        fs::write(
            &path,
            r#"["plain", {"id": "chan", "params": {"url": "https://example.org/feed"}}]"#,
        )
        .unwrap();

        let items = WorkListBuilder::from_json_file(&path).unwrap();
        assert_eq!(items[0].id(), "plain");
        assert_eq!(items[1].param("url"), Some("https://example.org/feed"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            WorkListBuilder::from_json_file(&path),
            Err(WorkListError::InvalidJson { .. })
        ));
        assert!(matches!(
            WorkListBuilder::from_json_file(&dir.path().join("absent.json")),
            Err(WorkListError::Read { .. })
        ));
    }
}
