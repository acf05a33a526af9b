//! Fail-fast environment bootstrap sequencer
//!
//! `bootseq` runs a fixed, ordered list of setup steps against the active
//! environment, echoing each command before it runs and stopping at the
//! first one that fails:
//!
//! 1. `conda install -y posix`
//! 2. `source scripts/build.sh`
//! 3. `source scripts/test.sh` (disabled by default)
//! 4. `export PIP_FIND_LINKS=<url>`
//! 5. `pip install jax[cpu]`
//! 6. `pip install -e .[docs,dev,full,...]`
//!
//! The exit code of a failed run is the exit code of the failing step.
//!
//! # Example
//!
//! ```no_run
//! use bootseq::{Config, Environment, Plan, ProcessRunner, Sequencer};
//!
//! let plan = Plan::from_config(&Config::default());
//! let mut seq = Sequencer::new(ProcessRunner::new(), Environment::inherit());
//! if let Err(err) = seq.run(&plan) {
//!     std::process::exit(err.exit_code());
//! }
//! ```
//!
//! # Configuration
//!
//! Every literal above can be overridden from `bootseq.toml`:
//!
//! ```toml
//! [test_script]
//! enabled = true
//!
//! [index]
//! url = "https://example.com/wheels.html"
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod output;
pub mod plan;
pub mod runner;
pub mod sequencer;
pub mod step;

pub use config::Config;
pub use env::{EnvDelta, Environment};
pub use error::{ConfigError, SequenceError, SourceError};
pub use plan::{Plan, PlannedStep};
pub use runner::{CommandRunner, Exit, ProcessRunner, Sourced};
pub use sequencer::{Outcome, Report, Sequencer, State};
pub use step::{Invocation, Step, StepId, Toggle};
