//! Fail-fast bootstrap sequencer
//!
//! Drives a [`Plan`] one step at a time. Every enabled step is echoed before
//! it runs; the first failure moves the sequencer into [`State::Failed`] and
//! nothing after it is invoked. Disabled steps are reported and passed over.

use crate::env::Environment;
use crate::error::{SequenceError, SourceError};
use crate::output;
use crate::plan::{Plan, PlannedStep};
use crate::runner::{CommandRunner, Exit};
use crate::step::{Step, StepId};

/// Where the sequencer is in the linear step chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Not started
    Idle,
    /// Working on the given step
    Pending(StepId),
    Done,
    /// Absorbing failure state
    Failed { step: StepId, code: i32 },
}

/// What happened to one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ran,
    Skipped,
    DryRun,
}

/// Per-step outcomes of a successful run, in sequence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub steps: Vec<(StepId, Outcome)>,
}

impl Report {
    pub fn ran(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps
            .iter()
            .filter(|(_, o)| *o == Outcome::Ran)
            .map(|(id, _)| *id)
    }

    pub fn skipped(&self) -> impl Iterator<Item = StepId> + '_ {
        self.steps
            .iter()
            .filter(|(_, o)| *o == Outcome::Skipped)
            .map(|(id, _)| *id)
    }
}

/// Runs plans against a [`CommandRunner`].
pub struct Sequencer<R: CommandRunner> {
    runner: R,
    env: Environment,
    dry_run: bool,
    state: State,
}

impl<R: CommandRunner> Sequencer<R> {
    /// Create a sequencer that hands `env` to the first step.
    pub fn new(runner: R, env: Environment) -> Self {
        Self {
            runner,
            env,
            dry_run: false,
            state: State::Idle,
        }
    }

    /// Echo steps without executing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The environment table as left by the steps run so far.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run every step of `plan` in order, stopping at the first failure.
    pub fn run(&mut self, plan: &Plan) -> Result<Report, SequenceError> {
        let total = plan.steps().len();
        let mut report = Report::default();

        for planned in plan.steps() {
            let id = planned.id;
            self.state = State::Pending(id);
            output::action_numbered(id.ordinal(), total, id.name());

            if !planned.toggle.is_enabled() {
                output::skip(&format!("{} disabled, skipping", id));
                report.steps.push((id, Outcome::Skipped));
                continue;
            }

            let outcome = match self.execute(planned) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.state = State::Failed {
                        step: id,
                        code: err.exit_code(),
                    };
                    return Err(err);
                }
            };
            report.steps.push((id, outcome));
        }

        self.state = State::Done;
        Ok(report)
    }

    fn execute(&mut self, planned: &PlannedStep) -> Result<Outcome, SequenceError> {
        let id = planned.id;
        let echo = planned.step.echo();
        output::command(&echo);

        match &planned.step {
            Step::SetEnv { name, value } => {
                // in-process and side-effect free, so also applied on dry runs
                self.env.set(name.clone(), value.clone());
                return Ok(if self.dry_run { Outcome::DryRun } else { Outcome::Ran });
            }
            _ if self.dry_run => return Ok(Outcome::DryRun),
            Step::SourceScript { shell, path } => {
                let sourced = self
                    .runner
                    .source(shell, path, &self.env)
                    .map_err(|err| match err {
                        SourceError::Spawn(source) => spawn_error(id, &echo, source),
                        SourceError::Capture(source) => SequenceError::Capture {
                            step: id,
                            cmd: echo.clone(),
                            source,
                        },
                    })?;
                check(id, &echo, sourced.exit)?;

                if !sourced.captured {
                    output::warning(&format!(
                        "{} exited without leaving its environment; its exports are lost",
                        path.display()
                    ));
                }
                for (name, value) in &sourced.delta.set {
                    output::debug(&format!(
                        "{} exported {}={}",
                        path.display(),
                        name.to_string_lossy(),
                        value.to_string_lossy()
                    ));
                }
                for name in &sourced.delta.unset {
                    output::debug(&format!("{} unset {}", path.display(), name.to_string_lossy()));
                }
                self.env.apply(&sourced.delta);
            }
            Step::InstallCompat { .. } | Step::InstallPackage { .. } | Step::InstallProject { .. } => {
                let Some(invocation) = planned.step.invocation() else {
                    unreachable!("install steps always expand to a command");
                };
                let exit = self
                    .runner
                    .run(&invocation, &self.env)
                    .map_err(|source| spawn_error(id, &echo, source))?;
                check(id, &echo, exit)?;
            }
        }

        Ok(Outcome::Ran)
    }
}

fn spawn_error(step: StepId, cmd: &str, source: std::io::Error) -> SequenceError {
    SequenceError::Spawn {
        step,
        cmd: cmd.to_string(),
        source,
    }
}

fn check(step: StepId, cmd: &str, exit: Exit) -> Result<(), SequenceError> {
    if exit.success() {
        Ok(())
    } else {
        Err(SequenceError::StepFailed {
            step,
            cmd: cmd.to_string(),
            code: exit.code(),
        })
    }
}
