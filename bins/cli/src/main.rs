//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Args, Parser, Subcommand};
use commands::{
    GetCommandInput, RecordCommandInput, StoreContext, TrialArgs, run_config_show, run_get,
    run_index_name, run_record,
};
use error::CliError;
use format::{CliOutput, OutputArgs, OutputMode, format_error_output};
use rally_metrics_infra::{ElasticsearchClientFactory, build_logger, load_effective_config};
use rally_metrics_ports::LogLevel;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "RALLY_";

#[derive(Debug, Parser)]
#[command(
    name = "rally-metrics",
    version,
    about = "Record and query benchmark trial metrics",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    source: ConfigSourceArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the effective config comes from.
#[derive(Debug, Args)]
struct ConfigSourceArgs {
    /// Config file (TOML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Partial config as JSON, applied over the file.
    #[arg(long, global = true)]
    overrides: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Record metrics for one trial and flush them in a single bulk write.
    Record {
        #[command(flatten)]
        trial: TrialArgs,
        /// Create the yearly index (with the metrics template) if missing.
        #[arg(long)]
        create: bool,
        /// Metric as `name=value[unit]`; integers are counts. Repeatable.
        #[arg(long = "metric", value_name = "NAME=VALUE[UNIT]")]
        metrics: Vec<String>,
    },
    /// Read back a metric of one trial.
    Get {
        #[command(flatten)]
        trial: TrialArgs,
        /// Metric name.
        #[arg(long)]
        name: String,
        /// Print every stored value instead of the first one.
        #[arg(long)]
        all: bool,
    },
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print the index a trial timestamp maps to.
    IndexName {
        /// Trial start timestamp.
        #[arg(long)]
        trial_timestamp: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective config.
    Show,
}

fn main() -> std::process::ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);
    let env = collect_scoped_env(ENV_PREFIX);

    match run(&cli, mode, &env) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(
    cli: &Cli,
    mode: OutputMode,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    match dispatch(cli, mode, env) {
        Err(CliError::Envelope(error)) => Ok(format_error_output(mode, &error)),
        other => other,
    }
}

fn dispatch(
    cli: &Cli,
    mode: OutputMode,
    env: &BTreeMap<String, String>,
) -> Result<CliOutput, CliError> {
    let config_path = cli.source.config.as_deref();
    let overrides = cli.source.overrides.as_deref();
    tracing::debug!(command = ?cli.command, config = ?config_path, "dispatching command");

    match &cli.command {
        Commands::Config {
            command: ConfigCommands::Show,
        } => run_config_show(mode, env, config_path, overrides),
        Commands::IndexName { trial_timestamp } => run_index_name(mode, trial_timestamp),
        Commands::Record {
            trial,
            create,
            metrics,
        } => with_store_context(mode, env, config_path, overrides, |context| {
            run_record(
                mode,
                context,
                &RecordCommandInput {
                    trial: trial.clone(),
                    create: *create,
                    metrics: metrics.clone(),
                },
            )
        }),
        Commands::Get { trial, name, all } => {
            with_store_context(mode, env, config_path, overrides, |context| {
                run_get(
                    mode,
                    context,
                    &GetCommandInput {
                        trial: trial.clone(),
                        name: name.clone(),
                        all: *all,
                    },
                )
            })
        },
    }
}

fn with_store_context(
    mode: OutputMode,
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
    overrides: Option<&str>,
    command: impl FnOnce(&StoreContext<'_>) -> Result<CliOutput, CliError>,
) -> Result<CliOutput, CliError> {
    let config = load_effective_config(env, config_path, overrides)?;
    let factory = ElasticsearchClientFactory::from_config(&config)?;
    let min_level = if mode.verbose {
        LogLevel::Info
    } else {
        LogLevel::Warn
    };
    let context = StoreContext {
        config: &config,
        factory: &factory,
        logger: Some(build_logger(&config, min_level)),
    };
    command(&context)
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}
