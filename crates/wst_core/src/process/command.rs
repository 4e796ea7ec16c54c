//! Command line, stage and plan types.
//!
//! A `Plan` is the ordered list of stages one work item needs. Each stage is
//! either a single command or a two-command pipe.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A program plus its argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl CommandLine {
    /// Start a command line for `program`.
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the command in `dir`.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments, without the program.
    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory, if set.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Build a `std::process::Command` with this program, args and cwd.
    ///
    /// Stdio is left at the `Command` defaults; callers configure it.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl std::fmt::Display for CommandLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Quote a token for display so it can be pasted into `sh`.
fn shell_quote(token: &OsStr) -> String {
    let s = token.to_string_lossy();
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c));
    if safe {
        s.into_owned()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Run a single command.
    Run(CommandLine),
    /// Run two commands with the first one's stdout feeding the second's stdin.
    Pipe(CommandLine, CommandLine),
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Run(cmd) => write!(f, "{}", cmd),
            Stage::Pipe(producer, consumer) => write!(f, "{} | {}", producer, consumer),
        }
    }
}

/// Ordered stages for one work item.
///
/// Stages run in order; the first nonzero exit stops the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    stages: Vec<Stage>,
}

impl Plan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// A plan with a single command.
    pub fn single(cmd: CommandLine) -> Self {
        Self::new().then(cmd)
    }

    /// Append a command stage (builder pattern).
    pub fn then(mut self, cmd: CommandLine) -> Self {
        self.stages.push(Stage::Run(cmd));
        self
    }

    /// Append a pipe stage (builder pattern).
    pub fn then_pipe(mut self, producer: CommandLine, consumer: CommandLine) -> Self {
        self.stages.push(Stage::Pipe(producer, consumer));
        self
    }

    /// Stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Whether the plan has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Rendered stage commands, one per stage.
    pub fn describe(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_unsafe_tokens() {
        let cmd = CommandLine::new("git")
            .arg("log")
            .arg("--format=%ct")
            .arg("my file.txt")
            .arg("it's");
        assert_eq!(
            cmd.to_string(),
            r"git log --format=%ct 'my file.txt' 'it'\''s'"
        );
    }

    #[test]
    fn empty_argument_is_quoted() {
        let cmd = CommandLine::new("exiftool").arg("-Title=").arg("");
        assert_eq!(cmd.to_string(), "exiftool -Title= ''");
    }

    #[test]
    fn pipe_stage_display() {
        let stage = Stage::Pipe(
            CommandLine::new("flac").args(["-d", "-c", "a.flac"]),
            CommandLine::new("lame").args(["-", "a.mp3"]),
        );
        assert_eq!(stage.to_string(), "flac -d -c a.flac | lame - a.mp3");
    }

    #[test]
    fn plan_keeps_stage_order() {
        let plan = Plan::single(CommandLine::new("a")).then(CommandLine::new("b"));
        assert_eq!(plan.describe(), vec!["a".to_string(), "b".to_string()]);
        assert!(!plan.is_empty());
        assert!(Plan::new().is_empty());
    }

    #[test]
    fn to_command_carries_cwd() {
        let cmd = CommandLine::new("git").arg("status").current_dir("/tmp");
        let std_cmd = cmd.to_command();
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/tmp")));
        assert_eq!(std_cmd.get_args().count(), 1);
    }
}
