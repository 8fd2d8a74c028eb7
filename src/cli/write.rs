use std::io;

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::cli::OutputFormat;
use crate::hw::HardwareClient;
use crate::ndef::{TextRecordInput, encode_text_records};
use crate::session::{ScanOptions, ScanRequest, TagScanner};
use crate::terminal::TerminalClient;

use super::scan;
use super::ui::{Painter, ScanReadyView};

/// Arguments for the `write` command.
#[derive(Debug, Args)]
pub struct WriteArgs {
    /// Texts to write as NDEF text records, one record per value.
    #[arg(required = true)]
    texts: Vec<String>,
    /// Language code stored in each text record.
    #[arg(long, default_value = "en")]
    lang: String,
    /// Hint shown while scanning, e.g. where to hold the tag.
    #[arg(long)]
    hint: Option<String>,
}

impl WriteArgs {
    /// Creates write arguments with the default `"en"` language code.
    #[must_use]
    pub fn new(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            texts: texts.into_iter().map(Into::into).collect(),
            lang: "en".to_string(),
            hint: None,
        }
    }

    /// Replaces the language code stored in each record.
    #[must_use]
    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Attaches a scanning hint.
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub(crate) fn texts(&self) -> &[String] {
        &self.texts
    }

    pub(crate) fn language(&self) -> &str {
        &self.lang
    }

    pub(crate) fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

/// Executes the `write` command.
#[instrument(skip(client, out, terminal_client, args), level = "info", fields(?output_format))]
pub(crate) async fn run<W>(
    client: Box<dyn HardwareClient>,
    args: &WriteArgs,
    out: &mut W,
    terminal_client: &dyn TerminalClient,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut inputs = Vec::with_capacity(args.texts().len());
    for text in args.texts() {
        inputs.push(TextRecordInput::new(text).with_language_code(args.language())?);
    }
    let message = encode_text_records(&inputs)?;

    let mut options = ScanOptions::new();
    if let Some(hint) = args.hint() {
        options = options.with_scan_hint(hint);
    }
    let request = ScanRequest::write(message, options)?;

    let painter = Painter::new(terminal_client.stdout_is_terminal());
    if output_format == OutputFormat::Pretty {
        writeln!(
            out,
            "{}",
            ScanReadyView::new(request.mode(), request.options(), &painter)
        )?;
    }

    let span = tracing::Span::current();
    span.pb_set_message(args.hint().unwrap_or("Waiting for a writable tag"));

    let result = async {
        let session = TagScanner::new().start_scan(client, request).await?;
        scan::stream_outcomes(session, out, &painter, output_format).await
    }
    .await;

    match &result {
        Ok(()) => span.pb_set_finish_message(&format!("{} Write finished", "✓".green())),
        Err(_error) => span.pb_set_finish_message(&format!("{} Write failed", "✗".red())),
    }
    result
}
