use std::io;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::OutputFormat;
use crate::hw::HardwareClient;
use crate::session::{ScanOptions, ScanRequest, TagScanner};
use crate::terminal::TerminalClient;

use super::scan;
use super::ui::{Painter, ScanReadyView};

/// Arguments for the `read` command.
#[derive(Debug, Args)]
pub struct ReadArgs {
    /// Keep reading tags until Ctrl+C instead of stopping after the first read.
    #[arg(long)]
    keep_listening: bool,
    /// Hint shown while scanning, e.g. where to hold the tag.
    #[arg(long)]
    hint: Option<String>,
}

impl ReadArgs {
    /// Creates read arguments. `keep_listening` keeps the session polling
    /// after the first successfully read tag.
    #[must_use]
    pub fn new(keep_listening: bool) -> Self {
        Self {
            keep_listening,
            hint: None,
        }
    }

    /// Attaches a scanning hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub(crate) fn keep_listening(&self) -> bool {
        self.keep_listening
    }

    pub(crate) fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

/// Executes the `read` command.
#[instrument(skip(client, out, terminal_client, args), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &ReadArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut options = ScanOptions::new().with_stop_after_first_read(!args.keep_listening());
    if let Some(hint) = args.hint() {
        options = options.with_scan_hint(hint);
    }
    let request = ScanRequest::read(options);

    let painter = Painter::new(terminal_client.stdout_is_terminal());
    if output_format == OutputFormat::Pretty {
        writeln!(
            out,
            "{}",
            ScanReadyView::new(request.mode(), request.options(), &painter)
        )?;
    }

    let span = tracing::Span::current();
    span.pb_set_message(args.hint().unwrap_or("Waiting for tags"));

    let result = async {
        let session = TagScanner::new().start_scan(client, request).await?;
        scan::stream_outcomes(session, out, &painter, output_format).await
    }
    .await;

    match &result {
        Ok(()) => span.pb_set_finish_message(&format!("{} Scan finished", "✓".green())),
        Err(_error) => span.pb_set_finish_message(&format!("{} Scan failed", "✗".red())),
    }
    result
}
