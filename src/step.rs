//! Bootstrap steps and the command lines they expand to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Position of a step in the bootstrap sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepId {
    /// Baseline POSIX compatibility layer from the package manager
    Compat,
    /// External build script
    Build,
    /// External test script
    Test,
    /// Supplementary package index variable
    Index,
    /// Named package with an extra
    Package,
    /// Local project with its extras
    Project,
}

impl StepId {
    pub const ALL: [StepId; 6] = [
        StepId::Compat,
        StepId::Build,
        StepId::Test,
        StepId::Index,
        StepId::Package,
        StepId::Project,
    ];

    /// 1-based position in the sequence.
    pub fn ordinal(self) -> usize {
        self as usize + 1
    }

    pub fn name(self) -> &'static str {
        match self {
            StepId::Compat => "compat",
            StepId::Build => "build",
            StepId::Test => "test",
            StepId::Index => "index",
            StepId::Package => "package",
            StepId::Project => "project",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.ordinal(), self.name())
    }
}

impl FromStr for StepId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepId::ALL
            .into_iter()
            .find(|id| id.name() == s || id.ordinal().to_string() == s)
            .ok_or_else(|| {
                let names: Vec<_> = StepId::ALL.iter().map(|id| id.name()).collect();
                format!("unknown step '{}' (expected one of: {})", s, names.join(", "))
            })
    }
}

/// Whether a planned step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    #[default]
    Enabled,
    Disabled,
}

impl Toggle {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Toggle::Enabled
        } else {
            Toggle::Disabled
        }
    }

    pub fn is_enabled(self) -> bool {
        self == Toggle::Enabled
    }
}

/// A single unit of work in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// `<manager> install <yes_flag> <packages...>`
    InstallCompat {
        manager: String,
        yes_flag: String,
        packages: Vec<String>,
    },
    /// Run a script so that its exported variables persist.
    SourceScript { shell: String, path: PathBuf },
    /// Set a variable in the run's environment table.
    SetEnv { name: String, value: String },
    /// `<installer> install <package>[<extras>]`
    InstallPackage {
        installer: String,
        package: String,
        extras: Vec<String>,
    },
    /// `<installer> install [-e] <path>[<extras>]`
    InstallProject {
        installer: String,
        path: PathBuf,
        editable: bool,
        extras: Vec<String>,
    },
}

impl Step {
    /// The subprocess this step runs, if any.
    ///
    /// `SetEnv` is applied in-process and `SourceScript` is handled by
    /// [`CommandRunner::source`](crate::runner::CommandRunner::source), so
    /// both return `None`.
    pub fn invocation(&self) -> Option<Invocation> {
        match self {
            Step::InstallCompat {
                manager,
                yes_flag,
                packages,
            } => {
                let mut args = vec!["install".to_string()];
                if !yes_flag.is_empty() {
                    args.push(yes_flag.clone());
                }
                args.extend(packages.iter().cloned());
                Some(Invocation::new(manager, args))
            }
            Step::InstallPackage {
                installer,
                package,
                extras,
            } => Some(Invocation::new(
                installer,
                ["install".to_string(), with_extras(package, extras)],
            )),
            Step::InstallProject {
                installer,
                path,
                editable,
                extras,
            } => {
                let mut args = vec!["install".to_string()];
                if *editable {
                    args.push("-e".to_string());
                }
                args.push(with_extras(&path.display().to_string(), extras));
                Some(Invocation::new(installer, args))
            }
            Step::SourceScript { .. } | Step::SetEnv { .. } => None,
        }
    }

    /// The line echoed before the step runs.
    pub fn echo(&self) -> String {
        match self {
            Step::SourceScript { path, .. } => {
                format!("source {}", shell_quote(path.display()))
            }
            Step::SetEnv { name, value } => format!("export {}={}", name, shell_quote(value)),
            other => other
                .invocation()
                .map(|inv| inv.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Append a bracketed extras list to a requirement: `name[a,b]`.
pub fn with_extras(target: &str, extras: &[String]) -> String {
    if extras.is_empty() {
        target.to_string()
    } else {
        format!("{}[{}]", target, extras.join(","))
    }
}

/// A concrete command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Shell-quote a value for display.
pub fn shell_quote(s: impl fmt::Display) -> String {
    let s = s.to_string();
    if !s.is_empty()
        && s.chars().all(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '=' | ',' | '+')
        })
    {
        s
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compat_invocation() {
        let step = Step::InstallCompat {
            manager: "conda".into(),
            yes_flag: "-y".into(),
            packages: strings(&["posix"]),
        };
        let inv = step.invocation().unwrap();
        assert_eq!(inv.program, "conda");
        assert_eq!(inv.args, strings(&["install", "-y", "posix"]));
        assert_eq!(step.echo(), "conda install -y posix");
    }

    #[test]
    fn test_package_with_extra() {
        let step = Step::InstallPackage {
            installer: "pip".into(),
            package: "jax".into(),
            extras: strings(&["cpu"]),
        };
        assert_eq!(step.invocation().unwrap().args, strings(&["install", "jax[cpu]"]));
        // brackets are glob characters, so the echo quotes them
        assert_eq!(step.echo(), "pip install 'jax[cpu]'");
    }

    #[test]
    fn test_project_editable_extras() {
        let step = Step::InstallProject {
            installer: "pip".into(),
            path: PathBuf::from("."),
            editable: true,
            extras: strings(&["docs", "dev", "full"]),
        };
        assert_eq!(
            step.invocation().unwrap().args,
            strings(&["install", "-e", ".[docs,dev,full]"])
        );
    }

    #[test]
    fn test_empty_extras_omit_brackets() {
        assert_eq!(with_extras("jax", &[]), "jax");
    }

    #[test]
    fn test_in_process_steps_have_no_invocation() {
        let set = Step::SetEnv {
            name: "PIP_FIND_LINKS".into(),
            value: "https://example.com/wheels.html".into(),
        };
        assert!(set.invocation().is_none());
        assert_eq!(set.echo(), "export PIP_FIND_LINKS=https://example.com/wheels.html");

        let src = Step::SourceScript {
            shell: "bash".into(),
            path: PathBuf::from("scripts/build.sh"),
        };
        assert!(src.invocation().is_none());
        assert_eq!(src.echo(), "source scripts/build.sh");
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "plain");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_step_id_parse() {
        assert_eq!("test".parse::<StepId>(), Ok(StepId::Test));
        assert_eq!("5".parse::<StepId>(), Ok(StepId::Package));
        assert!("deploy".parse::<StepId>().is_err());
        assert_eq!(StepId::Project.ordinal(), 6);
    }
}
