//! External process execution
//!
//! Fetchers and makers drive external tools (`hg`, `svn`, `buildout`, shell
//! scripts). Every invocation blocks until the child exits; output is
//! captured and logged at debug level.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

/// A finished command that exited non-zero or could not be spawned
#[derive(Debug)]
pub struct CommandFailure {
    pub command: String,
    pub reason: String,
}

impl std::fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.command, self.reason)
    }
}

/// Run `program` with `args` in `cwd`, returning trimmed stdout
pub fn run<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
    env: &[(&str, &str)],
) -> Result<String, CommandFailure>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.as_ref().to_string_lossy().to_string()))
        .collect::<Vec<_>>()
        .join(" ");

    let mut command = Command::new(program);
    command.args(&args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    for (key, value) in env {
        command.env(key, value);
    }

    info!(cmd = %rendered, cwd = ?cwd, "executing command");

    let output = command.output().map_err(|e| CommandFailure {
        command: rendered.clone(),
        reason: format!("could not be started: {e}"),
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !stdout.is_empty() {
        debug!(stdout = %stdout, "command stdout");
    }
    if !stderr.is_empty() {
        debug!(stderr = %stderr, "command stderr");
    }

    if !output.status.success() {
        let code = output
            .status
            .code()
            .map_or_else(|| "a signal".to_string(), |c| c.to_string());
        let mut reason = format!("exited with {code}");
        if !stderr.is_empty() {
            reason.push_str(": ");
            reason.push_str(&stderr);
        }
        return Err(CommandFailure {
            command: rendered,
            reason,
        });
    }

    Ok(stdout)
}

/// Run a shell snippet with `sh -c`
pub fn run_shell(
    script: &str,
    cwd: &Path,
    env: &[(&str, &str)],
) -> Result<String, CommandFailure> {
    run("sh", ["-c", script], Some(cwd), env)
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_captures_stdout() {
        let temp = TempDir::new().expect("temp dir");
        let out = run_shell("echo hello", temp.path(), &[]).expect("runs");
        assert_eq!(out, "hello");
    }

    #[test]
    fn test_run_passes_environment() {
        let temp = TempDir::new().expect("temp dir");
        let out = run_shell("echo $MINIMERGE_VARIANT", temp.path(), &[("MINIMERGE_VARIANT", "2.5")])
            .expect("runs");
        assert_eq!(out, "2.5");
    }

    #[test]
    fn test_failure_reports_code_and_stderr() {
        let temp = TempDir::new().expect("temp dir");
        let err = run_shell("echo broken >&2; exit 3", temp.path(), &[]).expect_err("fails");
        assert!(err.reason.contains("exited with 3"), "{err}");
        assert!(err.reason.contains("broken"), "{err}");
    }

    #[test]
    fn test_missing_program() {
        let err = run("minimerge-no-such-program", ["x"], None, &[]).expect_err("missing");
        assert!(err.reason.contains("could not be started"));
        assert_eq!(err.command, "minimerge-no-such-program x");
    }
}
