//! CLI front end for buildline
//!
//! - `run`: Execute a job file through the default pipeline
//! - `plugins`: List the registered plugins
//! - `completions`: Generate shell completions

use anyhow::{Context, Result};
use buildline::executor::{LocalRunner, RemoteRunner, StepRunner};
use buildline::infrastructure::{Config, init_logging};
use buildline::pipeline::{
    AbortSignal, BuildContext, BuildError, BuildOptions, BuildResult, JobDefinition,
    ScriptStepProvider, abort_channel,
};
use buildline::plugins::{DEFAULT, Plugin, PluginRegistry};
use buildline::remote::{RemoteError, RemoteExecutor};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Exit code reported when the build was interrupted
const INTERRUPTED: u8 = 130;

/// CLI arguments for buildline
#[derive(Parser, Debug)]
#[command(name = "buildline")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a job file
    Run {
        /// Job file (YAML)
        file: PathBuf,
        /// Plugin to run inside the pipeline, overriding the job file
        #[arg(short, long)]
        plugin: Option<String>,
        /// Extra plugin option, repeatable
        #[arg(short, long = "option", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        options: Vec<(String, String)>,
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List registered plugins
    Plugins {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl From<ShellArg> for Shell {
    fn from(shell: ShellArg) -> Self {
        match shell {
            ShellArg::Bash => Shell::Bash,
            ShellArg::Zsh => Shell::Zsh,
            ShellArg::Fish => Shell::Fish,
            ShellArg::PowerShell => Shell::PowerShell,
        }
    }
}

#[derive(Debug, Serialize)]
struct PluginInfo<'a> {
    name: &'a str,
    description: &'a str,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("empty option name in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Command::Run {
            file,
            plugin,
            options,
            config,
        } => run_job(&file, plugin, options, config.as_deref()),
        Command::Plugins { json } => {
            list_plugins(json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell, output } => {
            emit_completions(shell.into(), output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Writes the completion script for `shell` to `output`, or stdout
fn emit_completions(shell: Shell, output: Option<&Path>) -> Result<()> {
    let mut sink: Box<dyn Write> = match output {
        Some(path) => Box::new(
            std::fs::File::create(path)
                .with_context(|| format!("Failed to create completions file: {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    clap_complete::generate(shell, &mut build_cli(), "buildline", &mut sink);
    sink.flush().context("Failed to write completions")
}

fn list_plugins(json: bool) -> Result<()> {
    let registry = PluginRegistry::with_builtin();
    let entries: Vec<(&str, Arc<dyn Plugin>)> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.lookup(name).map(|plugin| (name, plugin)))
        .collect();

    if json {
        let infos: Vec<PluginInfo<'_>> = entries
            .iter()
            .map(|(name, plugin)| PluginInfo {
                name,
                description: plugin.description(),
            })
            .collect();
        let rendered = serde_json::to_string_pretty(&infos).context("Failed to render plugin list")?;
        println!("{rendered}");
    } else {
        for (name, plugin) in &entries {
            println!("{name:<10} {}", plugin.description());
        }
    }
    Ok(())
}

fn run_job(
    file: &Path,
    plugin: Option<String>,
    overrides: Vec<(String, String)>,
    config_path: Option<&Path>,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => Config::default(),
    };
    init_logging(&config.log_level);

    let job = JobDefinition::load(file)
        .with_context(|| format!("Failed to load job file: {}", file.display()))?;
    let plugin = plugin.unwrap_or_else(|| job.plugin_or(&config.default_plugin).to_string());
    let options = overrides
        .into_iter()
        .fold(job.build_options()?, |options, (key, value)| options.with(key, value));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    match runtime.block_on(execute(&job, &config, plugin, &options))? {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_cancelled() => {
            eprintln!("Build interrupted");
            Ok(ExitCode::from(INTERRUPTED))
        }
        Err(e) => Err(e).context("Build failed"),
    }
}

/// Runs one job and returns its outcome
///
/// The outer `Result` covers setup of the runner; the inner one is the
/// build itself, so the caller can tell an interruption from a failure.
async fn execute(
    job: &JobDefinition,
    config: &Config,
    plugin: String,
    options: &BuildOptions,
) -> Result<BuildResult> {
    let (handle, abort) = abort_channel();
    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, aborting build");
            interrupt.abort();
        }
    });

    let remote = job.remote.clone().map(|session| {
        Arc::new(RemoteExecutor::new(
            session.with_retry_interval(config.retry_interval()),
        ))
    });

    let runner: Arc<dyn StepRunner> = match &remote {
        Some(executor) => {
            if let Err(e) = connect(executor, &abort).await {
                executor.cleanup().await;
                if matches!(e, RemoteError::Cancelled) {
                    return Ok(Err(BuildError::Cancelled));
                }
                return Err(e)
                    .with_context(|| format!("Failed to connect to {}", executor.config().address()));
            }
            Arc::new(RemoteRunner::new(Arc::clone(executor)).with_shell(config.shell.clone()))
        }
        None => Arc::new(LocalRunner::new().with_shell(config.shell.clone())),
    };

    let registry = Arc::new(PluginRegistry::with_builtin());
    let provider = Arc::new(ScriptStepProvider::from_job(job));
    let mut context = BuildContext::new(plugin, provider, runner, Arc::clone(&registry));
    info!(
        job_id = %context.job_id,
        job = job.name.as_deref().unwrap_or("unnamed"),
        plugin = %context.plugin,
        "Running job"
    );

    let result = registry.dispatch(DEFAULT, &mut context, options, &abort).await;

    if let Some(executor) = &remote {
        executor.cleanup().await;
    }
    drop(handle);
    Ok(result)
}

async fn connect(executor: &RemoteExecutor, abort: &AbortSignal) -> Result<(), RemoteError> {
    tokio::select! {
        connected = executor.connect() => connected,
        () = abort.aborted() => Err(RemoteError::Cancelled),
    }
}
