//! bootseq CLI - fail-fast environment bootstrap
//!
//! Usage:
//!   bootseq [--dry-run]            Run the bootstrap sequence
//!   bootseq run [--dry-run]        Same, explicitly
//!   bootseq plan [--json]          Show the ordered steps
//!   bootseq config                 Show the effective configuration

use anyhow::{Context, Result};
use bootseq::error::EXIT_CONFIG;
use bootseq::{output, Config, Environment, Plan, ProcessRunner, Sequencer, StepId, Toggle};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bootseq")]
#[command(about = "Fail-fast environment bootstrap sequencer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (replaces ./bootseq.toml)
    #[arg(short, long, global = true, env = "BOOTSEQ_CONFIG")]
    config: Option<PathBuf>,

    /// Run as if started in this directory
    #[arg(short = 'C', long, global = true)]
    directory: Option<PathBuf>,

    /// Enable the test script step
    #[arg(long, global = true)]
    with_tests: bool,

    /// Disable a step by name or number (repeatable)
    #[arg(long, global = true, value_name = "STEP")]
    skip: Vec<StepId>,

    /// Echo every step without executing it
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    /// Print environment changes and config sources
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bootstrap sequence (default)
    Run,

    /// Show the ordered steps and whether each is enabled
    Plan {
        /// Emit the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration as TOML
    Config,
}

fn main() {
    let cli = Cli::parse();
    output::set_verbose(cli.verbose);

    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            output::error(&format!("{:#}", err));
            EXIT_CONFIG
        }
    };
    std::process::exit(code);
}

/// Returns the process exit code; setup failures come back as `Err`.
fn run(cli: Cli) -> Result<i32> {
    let cwd = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to determine working directory")?,
    };
    if !cwd.is_dir() {
        anyhow::bail!("Not a directory: {}", cwd.display());
    }

    let config = load_config(&cwd, cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let plan = build_plan(&config, cli.with_tests, &cli.skip);
            Ok(bootstrap(&plan, &cwd, cli.dry_run))
        }

        Commands::Plan { json } => {
            let plan = build_plan(&config, cli.with_tests, &cli.skip);
            if json {
                let rendered =
                    serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
                println!("{}", rendered);
            } else {
                show_plan(&plan);
            }
            Ok(0)
        }

        Commands::Config => {
            let rendered = config.to_toml().context("Failed to render configuration")?;
            print!("{}", rendered);
            Ok(0)
        }
    }
}

fn load_config(cwd: &Path, explicit: Option<&Path>) -> Result<Config> {
    // explicit paths are taken relative to the -C directory, like the local file
    let explicit = explicit.map(|p| if p.is_relative() { cwd.join(p) } else { p.to_path_buf() });
    let (config, sources) =
        Config::discover(cwd, explicit.as_deref()).context("Failed to load configuration")?;

    if sources.is_empty() {
        output::debug("using built-in configuration");
    }
    for source in &sources {
        output::debug(&format!("loaded config from {}", source.display()));
    }
    Ok(config)
}

fn build_plan(config: &Config, with_tests: bool, skip: &[StepId]) -> Plan {
    let mut plan = Plan::from_config(config);
    if with_tests {
        plan.set_toggle(StepId::Test, Toggle::Enabled);
    }
    for id in skip {
        plan.set_toggle(*id, Toggle::Disabled);
    }
    if with_tests && skip.contains(&StepId::Test) {
        output::warning("--skip test overrides --with-tests");
    }
    plan
}

fn bootstrap(plan: &Plan, cwd: &Path, dry_run: bool) -> i32 {
    output::action(if dry_run {
        "Bootstrapping environment (dry run)"
    } else {
        "Bootstrapping environment"
    });

    let runner = ProcessRunner::new().current_dir(cwd);
    let mut seq = Sequencer::new(runner, Environment::inherit()).dry_run(dry_run);

    match seq.run(plan) {
        Ok(report) => {
            let skipped: Vec<_> = report.skipped().map(|id| id.name()).collect();
            if !skipped.is_empty() {
                output::info(&format!("skipped: {}", skipped.join(", ")));
            }
            output::success("Environment ready");
            0
        }
        Err(err) => {
            output::error(&err.to_string());
            err.exit_code()
        }
    }
}

fn show_plan(plan: &Plan) {
    output::info("Bootstrap plan:");
    for planned in plan.steps() {
        let label = format!("{}. {}", planned.id.ordinal(), planned.id.name());
        if planned.toggle.is_enabled() {
            println!("  {}", label.bold());
        } else {
            println!("  {} {}", label, "[disabled]".dimmed());
        }
        output::detail(&planned.step.echo());
    }
}
