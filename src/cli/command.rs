use std::time::Duration;

use bon::Builder;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use crate::cli::read::ReadArgs;
use crate::cli::write::WriteArgs;
use crate::error::{CliConfigError, FixtureError};
use crate::hw::{FakeBackendConfig, HexPayload, TagFixture};

/// Command-line options for the NFC tag tool.
#[derive(Debug, Parser)]
#[command(name = "tagscan", about = "Read, write, and inspect NFC tags over PC/SC readers.")]
pub struct Args {
    /// Overrides the log level taken from `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Output format. Defaults to pretty on a terminal and JSON otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Uses the fake reader backend with fixture-driven detections.
    #[arg(long, global = true)]
    fake: bool,
    /// Fake tag fixtures in the form `kind|uid_hex|status|capacity;...`.
    #[arg(long, global = true, requires = "fake", required_if_eq("fake", "true"))]
    fake_tag: Option<TagFixture>,
    /// Fake stored NDEF message as hexadecimal bytes.
    #[arg(long, global = true, requires = "fake")]
    fake_payload: Option<HexPayload>,
    /// Artificial delay before each fake detection round (e.g. `250ms`, `2s`).
    #[arg(long, global = true, requires = "fake", value_parser = parse_duration)]
    fake_detect_delay: Option<Duration>,
    /// Ends fake polling after this many detection rounds.
    #[arg(long, global = true, requires = "fake")]
    fake_max_detections: Option<usize>,
    /// Surfaces all fixture tags in one detection round instead of one per round.
    #[arg(long, global = true, requires = "fake")]
    fake_batch: bool,
    /// Pretends no readers are attached.
    #[arg(long, global = true, requires = "fake")]
    fake_unavailable: bool,
    /// Fails fake tag connections after detection.
    #[arg(long, global = true, requires = "fake")]
    fake_fail_connect: bool,
    /// Fails fake tag reads after the status query.
    #[arg(long, global = true, requires = "fake")]
    fake_fail_read: bool,
    /// Fails fake tag writes after the status query.
    #[arg(long, global = true, requires = "fake")]
    fake_fail_write: bool,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Creates argument values directly without CLI parsing.
    ///
    /// ```
    /// use tagscan::{Args, Command, ReadArgs};
    ///
    /// let inspect = Args::new(Command::Inspect);
    /// let read = Args::new(Command::Read(ReadArgs::new(true)));
    /// let _ = (inspect, read);
    /// ```
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            log_level: None,
            output: None,
            fake: false,
            fake_tag: None,
            fake_payload: None,
            fake_detect_delay: None,
            fake_max_detections: None,
            fake_batch: false,
            fake_unavailable: false,
            fake_fail_connect: false,
            fake_fail_read: false,
            fake_fail_write: false,
            command,
        }
    }

    /// Enables fake backend mode with pre-parsed fake configuration.
    #[must_use]
    pub fn with_fake(mut self, fake: FakeArgs) -> Self {
        let FakeArgs {
            tag_fixture,
            payload,
            detect_delay,
            max_detections,
            batch_detections,
            unavailable,
            fail_connect,
            fail_read,
            fail_write,
        } = fake;

        self.fake = true;
        self.fake_tag = Some(tag_fixture);
        self.fake_payload = payload;
        self.fake_detect_delay = Some(detect_delay);
        self.fake_max_detections = max_detections;
        self.fake_batch = batch_detections;
        self.fake_unavailable = unavailable;
        self.fake_fail_connect = fail_connect;
        self.fake_fail_read = fail_read;
        self.fake_fail_write = fail_write;
        self
    }

    /// Returns the explicit log level, if one was given.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Returns the explicit output format, if one was given.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Splits parsed CLI arguments into command and optional fake-client settings.
    ///
    /// # Errors
    ///
    /// Returns an error if CLI backend configuration is invalid.
    pub fn into_command_and_fake_args(self) -> anyhow::Result<(Command, Option<FakeArgs>)> {
        let Args {
            log_level: _,
            output: _,
            fake,
            fake_tag,
            fake_payload,
            fake_detect_delay,
            fake_max_detections,
            fake_batch,
            fake_unavailable,
            fake_fail_connect,
            fake_fail_read,
            fake_fail_write,
            command,
        } = self;

        let fake_args = if fake {
            let Some(tag_fixture) = fake_tag else {
                return Err(CliConfigError::MissingFakeTagFixture.into());
            };
            Some(FakeArgs {
                tag_fixture,
                payload: fake_payload,
                detect_delay: fake_detect_delay.unwrap_or(Duration::ZERO),
                max_detections: fake_max_detections,
                batch_detections: fake_batch,
                unavailable: fake_unavailable,
                fail_connect: fake_fail_connect,
                fail_read: fake_fail_read,
                fail_write: fake_fail_write,
            })
        } else {
            None
        };

        Ok((command, fake_args))
    }
}

/// Fake backend arguments for programmatic runs.
#[derive(Debug, Builder)]
pub struct FakeArgs {
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    tag_fixture: TagFixture,
    #[builder(with = |value: &str| -> std::result::Result<_, FixtureError> { value.parse() })]
    payload: Option<HexPayload>,
    #[builder(default)]
    detect_delay: Duration,
    max_detections: Option<usize>,
    #[builder(default)]
    batch_detections: bool,
    #[builder(default)]
    unavailable: bool,
    #[builder(default)]
    fail_connect: bool,
    #[builder(default)]
    fail_read: bool,
    #[builder(default)]
    fail_write: bool,
}

impl FakeArgs {
    pub(crate) fn into_backend_config(self) -> FakeBackendConfig {
        let Self {
            tag_fixture,
            payload,
            detect_delay,
            max_detections,
            batch_detections,
            unavailable,
            fail_connect,
            fail_read,
            fail_write,
        } = self;

        FakeBackendConfig::builder()
            .tag_fixture(tag_fixture)
            .maybe_payload(payload)
            .maybe_max_detections(max_detections)
            .detect_delay(detect_delay)
            .batch_detections(batch_detections)
            .unavailable(unavailable)
            .fail_connect(fail_connect)
            .fail_read(fail_read)
            .fail_write(fail_write)
            .build()
    }
}

/// Supported CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll for tags and print the NDEF records of every tag that is read.
    Read(ReadArgs),
    /// Poll for a writable tag and write text records to it.
    Write(WriteArgs),
    /// Detect the first tag and print its identity and NDEF status.
    Inspect,
}

/// Explicit telemetry log level.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Command output rendering style.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-oriented tables and colour.
    Pretty,
    /// Pretty-printed JSON objects, one per result.
    Json,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fake_mode_requires_tag_fixture() {
        let result = Args::try_parse_from(["tagscan", "--fake", "inspect"]);

        let error = result.expect_err("missing --fake-tag should fail argument parsing");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_fixture_flags_require_fake_mode() {
        let result =
            Args::try_parse_from(["tagscan", "--fake-payload", "D1010554026568", "inspect"]);

        let error = result.expect_err("fake payload flags should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_tag_requires_fake_mode() {
        let result = Args::try_parse_from([
            "tagscan",
            "--fake-tag",
            "mifare|04a1b2c3|read_write|137",
            "inspect",
        ]);

        let error = result.expect_err("--fake-tag should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn fake_mode_builds_fake_settings() {
        let cli = Args::try_parse_from([
            "tagscan",
            "--fake",
            "--fake-tag",
            "mifare|04a1b2c3|read_write|137",
            "inspect",
        ])
        .expect("valid fake arguments should parse");

        let (command, fake_args) = cli
            .into_command_and_fake_args()
            .expect("valid fake arguments should resolve fake settings");
        assert_matches!(command, Command::Inspect);
        assert_matches!(fake_args, Some(_));
    }

    #[test]
    fn write_requires_at_least_one_text() {
        let result = Args::try_parse_from([
            "tagscan",
            "--fake",
            "--fake-tag",
            "mifare|04a1b2c3|read_write|137",
            "write",
        ]);

        let error = result.expect_err("write without record texts should fail argument parsing");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn output_format_rejects_unknown_values() {
        let result = Args::try_parse_from(["tagscan", "--output", "yaml", "inspect"]);

        let error = result.expect_err("unknown output format should fail argument parsing");
        assert_eq!(ErrorKind::InvalidValue, error.kind());
    }
}
