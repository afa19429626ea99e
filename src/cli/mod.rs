use std::{ffi::OsString, io::Write, time::Duration};

use clap::{ArgAction, Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::{
    admin::{Deadline, Endpoint, InstanceAdmin, MAX_TIMEOUT, RestInstanceAdmin},
    config::{self, Settings},
    error::CliError,
    name::ProjectName,
    ops::Command,
    output,
};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

const EXAMPLES: &str = "Examples:
  instance-configs create_instance_config
  instance-configs update_instance_config
  instance-configs delete_instance_config
  instance-configs list_instance_config_operations
  instance-configs --project my-project --config-id custom-eur6 -o yaml create_instance_config";

#[derive(Clone, Debug, ValueEnum)]
enum OutputArg {
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "instance-configs")]
#[command(about = "Create, update, delete and inspect custom Spanner instance configs")]
#[command(version)]
#[command(after_help = EXAMPLES)]
struct CliArgs {
    #[arg(value_name = "command", value_enum)]
    command: Command,

    #[arg(long, env = "SPANNER_PROJECT", default_value = config::DEFAULT_PROJECT)]
    project: String,

    #[arg(long, env = "SPANNER_BASE_CONFIG", default_value = config::DEFAULT_BASE_CONFIG)]
    base_config: String,

    /// Custom config id; must start with `custom-`.
    #[arg(long, env = "SPANNER_CUSTOM_CONFIG", default_value = config::DEFAULT_CONFIG_ID)]
    config_id: String,

    #[arg(long, default_value = config::DEFAULT_DISPLAY_NAME)]
    display_name: String,

    #[arg(long, default_value = config::DEFAULT_UPDATED_DISPLAY_NAME)]
    updated_display_name: String,

    /// Label applied on create, as KEY=VALUE. Repeatable.
    #[arg(long = "label", value_name = "KEY=VALUE", value_parser = config::parse_label)]
    labels: Vec<(String, String)>,

    /// REST endpoint, e.g. `http://localhost:9020` for a local emulator; defaults to the public API.
    #[arg(long, env = "SPANNER_ENDPOINT")]
    endpoint: Option<String>,

    /// Deadline for the whole invocation, 1 to 86400 seconds.
    #[arg(
        long,
        default_value_t = config::DEFAULT_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT.as_secs())
    )]
    timeout_secs: u64,

    #[arg(
        short = 'o',
        long = "output",
        default_value = "json",
        value_enum,
        ignore_case = true
    )]
    output: OutputArg,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

pub async fn run() -> Result<(), CliError> {
    run_from(std::env::args_os()).await
}

pub async fn run_from<I, T>(args: I) -> Result<(), CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let Some(args) = parse_cli_args(args)? else {
        return Ok(());
    };
    init_tracing(args.verbose);

    let command = args.command;
    let settings = build_settings(args)?;
    let deadline = Deadline::after(settings.timeout);

    // Dropped at the end of this scope whatever the outcome.
    let admin = RestInstanceAdmin::connect(settings.endpoint.clone(), deadline)
        .await
        .map_err(CliError::Connect)?;

    let mut stdout = std::io::stdout().lock();
    run_command(command, &admin, &settings, &mut stdout).await
}

/// Runs one command and writes `<command> failed with <error>` on failure.
pub async fn run_command(
    command: Command,
    admin: &dyn InstanceAdmin,
    settings: &Settings,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    tracing::debug!(command = command.name(), "dispatching command");
    match command.execute(admin, settings, out).await {
        Ok(()) => Ok(()),
        Err(source) => {
            let error = CliError::Command {
                command: command.name(),
                source,
            };
            if let Err(write_error) = writeln!(out, "{error}") {
                tracing::warn!(%write_error, "failed to write failure line");
            }
            Err(error)
        }
    }
}

fn parse_cli_args<I, T>(args: I) -> Result<Option<CliArgs>, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match CliArgs::try_parse_from(args) {
        Ok(args) => Ok(Some(args)),
        Err(error) => {
            if matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                print!("{error}");
                return Ok(None);
            }
            Err(CliError::InvalidArgs(error.to_string()))
        }
    }
}

fn build_settings(args: CliArgs) -> Result<Settings, CliError> {
    let project = ProjectName::parse(&args.project)
        .map_err(|error| CliError::InvalidArgs(error.to_string()))?;

    let mut settings = Settings {
        project,
        base_config: args.base_config,
        config_id: args.config_id,
        display_name: args.display_name,
        updated_display_name: args.updated_display_name,
        endpoint: Endpoint::resolve(args.endpoint.as_deref()),
        timeout: Duration::from_secs(args.timeout_secs),
        output: map_output_format(args.output),
        ..Settings::default()
    };
    if !args.labels.is_empty() {
        settings.labels = args.labels.into_iter().collect();
    }

    settings.validate().map_err(CliError::InvalidArgs)?;
    Ok(settings)
}

fn map_output_format(format: OutputArg) -> output::OutputFormat {
    match format {
        OutputArg::Json => output::OutputFormat::Json,
        OutputArg::Yaml => output::OutputFormat::Yaml,
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
