//! Running external commands
//!
//! [`CommandRunner`] is the only place the sequencer touches the outside
//! world. [`ProcessRunner`] spawns real child processes with inherited stdio
//! so that tool output streams straight to the terminal.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::env::{EnvDelta, Environment};
use crate::error::SourceError;
use crate::step::Invocation;

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Code(i32),
    Signal(i32),
}

impl Exit {
    pub const SUCCESS: Exit = Exit::Code(0);

    pub fn success(self) -> bool {
        self == Exit::SUCCESS
    }

    /// Exit code as a shell would report it (`128 + n` for signal `n`).
    pub fn code(self) -> i32 {
        match self {
            Exit::Code(c) => c,
            Exit::Signal(s) => 128 + s,
        }
    }
}

impl From<ExitStatus> for Exit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Exit::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = status.signal() {
                return Exit::Signal(sig);
            }
        }
        Exit::Code(1)
    }
}

/// Result of sourcing a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced {
    pub exit: Exit,
    /// Exported variables the script added, changed, or removed
    pub delta: EnvDelta,
    /// False when the script finished without leaving an environment dump
    pub captured: bool,
}

/// Executes the external side of each step.
pub trait CommandRunner {
    /// Run a command to completion with exactly the given environment.
    fn run(&mut self, invocation: &Invocation, env: &Environment) -> io::Result<Exit>;

    /// Source `script` with `shell` and report the environment it leaves behind.
    fn source(&mut self, shell: &str, script: &Path, env: &Environment)
        -> Result<Sourced, SourceError>;
}

// Runs the script in the current shell context with errexit set, then dumps
// the exported environment once the script returns. The EXIT trap covers an
// explicit `exit` in the script; a script that installs its own EXIT trap
// replaces it, so the direct dump after `.` is the primary path. `$2` is
// saved first because the sourced script may reset the positional parameters.
const SOURCE_WRAPPER: &str = r#"__bootseq_dump="$2"
trap 'env -0 > "$__bootseq_dump"' EXIT
set -e
. "$1"
env -0 > "$__bootseq_dump"
"#;

/// Spawns real subprocesses.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    current_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command from `dir` instead of the inherited directory.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    fn command(&self, program: &str, env: &Environment) -> Command {
        let mut cmd = Command::new(program);
        cmd.env_clear()
            .envs(env.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, invocation: &Invocation, env: &Environment) -> io::Result<Exit> {
        let status = self
            .command(&invocation.program, env)
            .args(&invocation.args)
            .status()?;
        Ok(status.into())
    }

    fn source(
        &mut self,
        shell: &str,
        script: &Path,
        env: &Environment,
    ) -> Result<Sourced, SourceError> {
        // `.` searches PATH for bare file names.
        let script = if script.is_relative() && script.parent() == Some(Path::new("")) {
            Path::new(".").join(script)
        } else {
            script.to_path_buf()
        };

        let dump = tempfile::NamedTempFile::new().map_err(SourceError::Capture)?;
        let status = self
            .command(shell, env)
            .arg("-c")
            .arg(SOURCE_WRAPPER)
            .arg("bootseq")
            .arg(&script)
            .arg(dump.path())
            .status()
            .map_err(SourceError::Spawn)?;
        let exit = Exit::from(status);

        // a failed script's environment is never applied
        if !exit.success() {
            return Ok(Sourced {
                exit,
                delta: EnvDelta::default(),
                captured: false,
            });
        }

        let raw = std::fs::read(dump.path()).map_err(SourceError::Capture)?;
        if raw.is_empty() {
            return Ok(Sourced {
                exit,
                delta: EnvDelta::default(),
                captured: false,
            });
        }

        let delta = env
            .diff(&Environment::from_env_dump(&raw))
            .without_shell_internals();
        Ok(Sourced {
            exit,
            delta,
            captured: true,
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory runner for sequencer tests.

    use super::*;
    use std::collections::HashMap;

    /// What the fake saw for one call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub line: String,
        pub env: Environment,
    }

    /// Records calls and answers with scripted exit codes.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: Vec<Call>,
        exits: HashMap<String, Exit>,
        exports: HashMap<PathBuf, EnvDelta>,
        uncaptured: Vec<PathBuf>,
        capture_errors: Vec<PathBuf>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the call whose program (or script path) is `key` exit with `exit`.
        pub fn fail(mut self, key: &str, exit: Exit) -> Self {
            self.exits.insert(key.to_string(), exit);
            self
        }

        /// Make sourcing `script` export `name=value`.
        pub fn export(mut self, script: &str, name: &str, value: &str) -> Self {
            self.exports
                .entry(PathBuf::from(script))
                .or_default()
                .set
                .insert(name.into(), value.into());
            self
        }

        /// Make sourcing `script` succeed without leaving an environment dump.
        pub fn uncaptured(mut self, script: &str) -> Self {
            self.uncaptured.push(PathBuf::from(script));
            self
        }

        /// Make reading the environment of `script` fail after it ran.
        pub fn capture_error(mut self, script: &str) -> Self {
            self.capture_errors.push(PathBuf::from(script));
            self
        }

        pub fn lines(&self) -> Vec<&str> {
            self.calls.iter().map(|c| c.line.as_str()).collect()
        }

        fn exit_for(&self, key: &str) -> Exit {
            self.exits.get(key).copied().unwrap_or(Exit::SUCCESS)
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&mut self, invocation: &Invocation, env: &Environment) -> io::Result<Exit> {
            self.calls.push(Call {
                line: invocation.to_string(),
                env: env.clone(),
            });
            if invocation.program == "missing" {
                return Err(io::Error::new(io::ErrorKind::NotFound, "not found"));
            }
            Ok(self.exit_for(&invocation.program))
        }

        fn source(
            &mut self,
            shell: &str,
            script: &Path,
            env: &Environment,
        ) -> Result<Sourced, SourceError> {
            self.calls.push(Call {
                line: format!("{} {}", shell, script.display()),
                env: env.clone(),
            });
            if self.capture_errors.iter().any(|p| p == script) {
                return Err(SourceError::Capture(io::Error::new(
                    io::ErrorKind::NotFound,
                    "dump removed",
                )));
            }
            let exit = self.exit_for(&script.display().to_string());
            if self.uncaptured.iter().any(|p| p == script) {
                return Ok(Sourced {
                    exit,
                    delta: EnvDelta::default(),
                    captured: false,
                });
            }
            let delta = self.exports.get(script).cloned().unwrap_or_default();
            Ok(Sourced {
                exit,
                delta,
                captured: true,
            })
        }
    }
}
