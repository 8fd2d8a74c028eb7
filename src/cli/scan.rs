//! Shared session consumption for the `read` and `write` commands.

use std::io;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::cli::OutputFormat;
use crate::error::ScanError;
use crate::hw::{ScanRunSummary, ScanStopReason, TagKind};
use crate::ndef::{NdefRecord, bytes_to_hex};
use crate::session::{ScanOutcome, ScanSession};
use crate::utils::format_error_chain;

use super::ui::{Painter, ScanOutcomeView, ScanSummaryView, record_type_label};

/// One JSON object emitted while a scan session runs.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ScanEvent {
    /// A tag conversation completed.
    Tag {
        index: usize,
        uid: String,
        kind: TagKind,
        records: Vec<RecordBody>,
    },
    /// A tag conversation failed and ended the session.
    Error { index: usize, message: String },
    /// The session closed.
    Summary {
        delivered_outcomes: usize,
        stop_reason: ScanStopReason,
    },
}

/// JSON body for one NDEF record.
#[derive(Debug, Serialize)]
struct RecordBody {
    #[serde(rename = "type")]
    record_type: String,
    text: String,
    payload_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_hex: Option<String>,
}

impl From<&NdefRecord> for RecordBody {
    fn from(record: &NdefRecord) -> Self {
        Self {
            record_type: record_type_label(record),
            text: record.decoded_text(),
            payload_hex: record.payload_hex(),
            id_hex: (!record.id().is_empty()).then(|| bytes_to_hex(record.id())),
        }
    }
}

fn outcome_event(outcome: &ScanOutcome) -> ScanEvent {
    match outcome.result() {
        Ok(data) => ScanEvent::Tag {
            index: outcome.index(),
            uid: data.uid_hex(),
            kind: data.kind(),
            records: data.records().iter().map(RecordBody::from).collect(),
        },
        Err(error) => ScanEvent::Error {
            index: outcome.index(),
            message: format_error_chain(error),
        },
    }
}

fn summary_event(summary: &ScanRunSummary) -> ScanEvent {
    ScanEvent::Summary {
        delivered_outcomes: summary.delivered_outcomes(),
        stop_reason: summary.stop_reason().clone(),
    }
}

fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Streams session outcomes to `out` until the session closes or Ctrl+C.
///
/// A delivered error outcome ends the session; it is rendered in the stream
/// and then returned so the command exits non-zero.
///
/// # Errors
///
/// Returns an error when a tag conversation failed, output writing failed, or
/// the Ctrl+C handler could not be installed.
pub(crate) async fn stream_outcomes<W>(
    mut session: ScanSession,
    out: &mut W,
    painter: &Painter,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    let mut failure: Option<ScanError> = None;
    let mut interrupted = false;

    loop {
        let maybe_outcome = tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.map_err(|source| ScanError::CtrlC { source })?;
                interrupted = true;
                None
            }
            outcome = session.next_outcome() => outcome,
        };
        let Some(outcome) = maybe_outcome else { break };

        match output_format {
            OutputFormat::Pretty => {
                writeln!(out, "{}", ScanOutcomeView::new(&outcome, painter))?;
            }
            OutputFormat::Json => write_json_line(out, &outcome_event(&outcome))?,
        }
        if let Err(error) = outcome.into_result() {
            failure = Some(error);
        }
    }

    if interrupted {
        debug!("interrupt received; invalidating the scan session");
        session.invalidate().await;
    }
    let summary = ScanRunSummary::try_from(session)?;

    match output_format {
        OutputFormat::Pretty => {
            writeln!(out)?;
            writeln!(out, "{}", ScanSummaryView::new(&summary, painter))?;
        }
        OutputFormat::Json => write_json_line(out, &summary_event(&summary))?,
    }

    if let Some(error) = failure {
        return Err(error.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::error::TagError;
    use crate::hw::TagData;
    use crate::ndef::decode_message;

    use super::*;

    fn render(event: &ScanEvent) -> String {
        serde_json::to_string(event).expect("scan events serialise")
    }

    #[test]
    fn tag_events_carry_uid_kind_and_records() {
        let message = decode_message(&[0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69]);
        let data = TagData::new(
            vec![0x04, 0xA1, 0xB2, 0xC3],
            TagKind::MiFare,
            message.into_records(),
        );
        let outcome = ScanOutcome::new(1, Ok(data));

        assert_eq!(
            "{\"event\":\"tag\",\"index\":1,\"uid\":\"04a1b2c3\",\"kind\":\"mifare\",\
             \"records\":[{\"type\":\"text\",\"text\":\"hi\",\"payload_hex\":\"02656e6869\"}]}",
            render(&outcome_event(&outcome))
        );
    }

    #[test]
    fn error_events_flatten_the_source_chain() {
        let outcome = ScanOutcome::new(
            2,
            Err(ScanError::Write {
                source: TagError::CapacityExceeded {
                    needed: 200,
                    capacity: 137,
                },
            }),
        );

        assert_eq!(
            "{\"event\":\"error\",\"index\":2,\"message\":\"writing the tag failed: \
             message of 200 bytes exceeds the tag capacity of 137 bytes\"}",
            render(&outcome_event(&outcome))
        );
    }

    #[test]
    fn summary_events_use_the_stop_reason_label() {
        let summary = ScanRunSummary::new(3, ScanStopReason::FirstRead);

        assert_eq!(
            "{\"event\":\"summary\",\"delivered_outcomes\":3,\
             \"stop_reason\":\"stopped after first read\"}",
            render(&summary_event(&summary))
        );
    }
}
