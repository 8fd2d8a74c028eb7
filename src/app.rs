use std::io;

use anyhow::Result;
use tracing::instrument;

use crate::cli::{Command, FakeArgs, LogLevel, OutputFormat};
use crate::error::TagError;
use crate::hw::{
    HardwareClient, fake_hardware_client as build_fake_hardware_client,
    real_hardware_client as build_real_hardware_client,
};
use crate::telemetry;
use crate::terminal::{SystemTerminalClient, TerminalClient};

/// Creates a hardware client backed by the attached PC/SC readers.
///
/// # Errors
///
/// Returns an error when the PC/SC service is unreachable.
pub fn real_hardware_client() -> Result<Box<dyn HardwareClient>, TagError> {
    build_real_hardware_client()
}

/// Creates a hardware client backed by fake tag fixtures.
#[must_use]
pub fn fake_hardware_client(fake_args: FakeArgs) -> Box<dyn HardwareClient> {
    build_fake_hardware_client(fake_args.into_backend_config())
}

/// Runs the CLI command against the given hardware client.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = tagscan::Args::try_parse_from([
///     "tagscan",
///     "--fake",
///     "--fake-tag",
///     "mifare|04a1b2c3|read_write|137",
///     "inspect",
/// ])?;
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => tagscan::fake_hardware_client(fake_args),
///     None => tagscan::real_hardware_client()?,
/// };
/// let mut out = Vec::new();
/// tagscan::run(command, &mut out, hardware_client).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, tag interaction fails,
/// or output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, hardware_client, None, OutputFormat::Pretty).await
}

/// Runs the CLI command with explicit telemetry and output settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = tagscan::Args::try_parse_from([
///     "tagscan",
///     "--log-level",
///     "debug",
///     "--output",
///     "json",
///     "--fake",
///     "--fake-tag",
///     "mifare|04a1b2c3|read_write|137",
///     "inspect",
/// ])?;
/// let log_level = args.log_level();
/// let output_format = args.output_format().unwrap_or(tagscan::OutputFormat::Pretty);
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => tagscan::fake_hardware_client(fake_args),
///     None => tagscan::real_hardware_client()?,
/// };
/// let mut out = Vec::new();
/// tagscan::run_with_log_level(command, &mut out, hardware_client, log_level, output_format)
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, tag interaction fails,
/// or output writing fails.
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        &SystemTerminalClient,
        hardware_client,
        log_level,
        output_format,
    )
    .await
}

/// Runs the CLI command with injected clients.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, tag interaction fails,
/// or output writing fails.
pub async fn run_with_clients<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_clients_and_log_level(
        command,
        out,
        terminal_client,
        hardware_client,
        None,
        output_format,
    )
    .await
}

/// Runs the CLI command with injected clients and explicit telemetry settings.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// struct FakeTerminal;
/// impl tagscan::TerminalClient for FakeTerminal {
///     fn stdout_is_terminal(&self) -> bool { false }
///     fn stderr_is_terminal(&self) -> bool { false }
/// }
///
/// let args = tagscan::Args::try_parse_from([
///     "tagscan",
///     "--log-level",
///     "trace",
///     "--fake",
///     "--fake-tag",
///     "mifare|04a1b2c3|read_write|137",
///     "inspect",
/// ])?;
/// let log_level = args.log_level();
/// let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
/// let hardware_client = match maybe_fake_args {
///     Some(fake_args) => tagscan::fake_hardware_client(fake_args),
///     None => tagscan::real_hardware_client()?,
/// };
/// let mut out = Vec::new();
/// tagscan::run_with_clients_and_log_level(
///     command,
///     &mut out,
///     &FakeTerminal,
///     hardware_client,
///     log_level,
///     tagscan::OutputFormat::Json,
/// ).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, tag interaction fails,
/// or output writing fails.
#[instrument(
    skip(out, terminal_client, hardware_client),
    level = "info",
    fields(command = %command_name(&command), ?log_level)
)]
pub async fn run_with_clients_and_log_level<W>(
    command: Command,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    hardware_client: Box<dyn HardwareClient>,
    log_level: Option<LogLevel>,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "tagscan",
        terminal_client.stderr_is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    match command {
        Command::Read(args) => {
            crate::cli::read::run(hardware_client, &args, out, terminal_client, output_format).await
        }
        Command::Write(args) => {
            crate::cli::write::run(hardware_client, &args, out, terminal_client, output_format)
                .await
        }
        Command::Inspect => {
            crate::cli::inspect::run(hardware_client, out, terminal_client, output_format).await
        }
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Read(_args) => "read",
        Command::Write(_args) => "write",
        Command::Inspect => "inspect",
    }
}
