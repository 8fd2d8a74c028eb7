use std::io;

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::OutputFormat;
use crate::hw::{HardwareClient, InspectReport, NdefStatus, TagKind};
use crate::session::inspect_first_tag;
use crate::terminal::TerminalClient;

use super::ui::{InspectReportView, Painter};

/// JSON body for the `inspect` command.
#[derive(Debug, Serialize)]
struct InspectBody<'a> {
    reader: &'a str,
    kind: TagKind,
    uid: String,
    ndef: NdefStatus,
    capacity_bytes: usize,
}

impl<'a> From<&'a InspectReport> for InspectBody<'a> {
    fn from(report: &'a InspectReport) -> Self {
        Self {
            reader: report.reader(),
            kind: report.kind(),
            uid: report.uid_hex(),
            ndef: report.status(),
            capacity_bytes: report.capacity_bytes(),
        }
    }
}

/// Executes the `inspect` command.
#[instrument(skip(client, out, terminal_client), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let span = tracing::Span::current();
    span.pb_set_message("Waiting for a tag");

    let report = match inspect_first_tag(client).await {
        Ok(report) => report,
        Err(error) => {
            span.pb_set_finish_message(&format!("{} Inspect failed", "✗".red()));
            return Err(error.into());
        }
    };
    span.pb_set_finish_message(&format!("{} Tag inspected", "✓".green()));

    match output_format {
        OutputFormat::Pretty => {
            let painter = Painter::new(terminal_client.stdout_is_terminal());
            writeln!(out, "{}", InspectReportView::new(&report, &painter))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &InspectBody::from(&report))?;
            writeln!(out)?;
        }
    }

    Ok(())
}
