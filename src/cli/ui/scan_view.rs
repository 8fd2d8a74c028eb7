use std::fmt::{self, Display, Formatter};

use crate::hw::{ScanRunSummary, ScanStopReason, TagData};
use crate::ndef::NdefRecord;
use crate::session::{ScanOptions, ScanOutcome, SessionMode};
use crate::utils::{format_error_chain, format_hex};

use super::painter::Painter;
use super::table::Table;

/// Renders the scan readiness banner before the first detection.
pub(crate) struct ScanReadyView<'a> {
    mode: SessionMode,
    options: &'a ScanOptions,
    painter: &'a Painter,
}

impl<'a> ScanReadyView<'a> {
    pub(crate) fn new(mode: SessionMode, options: &'a ScanOptions, painter: &'a Painter) -> Self {
        Self {
            mode,
            options,
            painter,
        }
    }
}

impl Display for ScanReadyView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let until = match self.mode {
            SessionMode::Write => "a write completes",
            SessionMode::Read if self.options.stop_after_first_read() => "the first tag is read",
            SessionMode::Read => "interrupted (Ctrl+C)",
        };
        let mut rows = vec![
            ("mode", self.painter.value(self.mode.to_string())),
            ("until", self.painter.value(until)),
        ];
        if let Some(hint) = self.options.scan_hint() {
            rows.push(("hint", self.painter.muted(hint)));
        }
        let session_table = Table::key_value(self.painter, rows);

        write!(f, "{}", self.painter.heading("Scanning for tags:"))?;
        write!(f, "\n{session_table}")
    }
}

/// Renders one delivered scan outcome: a tag conversation or its error.
pub(crate) struct ScanOutcomeView<'a> {
    outcome: &'a ScanOutcome,
    painter: &'a Painter,
}

impl<'a> ScanOutcomeView<'a> {
    pub(crate) fn new(outcome: &'a ScanOutcome, painter: &'a Painter) -> Self {
        Self { outcome, painter }
    }

    fn tag_line(&self, data: &TagData) -> String {
        format!(
            "{} {} {}",
            self.painter.value("Tag"),
            self.painter.value(format_hex(data.uid())),
            self.painter.muted(format!("({})", data.kind()))
        )
    }

    fn records_table(&self, records: &[NdefRecord]) -> Table {
        let rows = records
            .iter()
            .map(|record| {
                vec![
                    self.painter.muted(record_type_label(record)),
                    self.painter.value(record.decoded_text()),
                    self.painter.muted(record.payload_hex()),
                ]
            })
            .collect();
        Table::grid(["type", "text", "payload_hex"], rows)
    }
}

impl Display for ScanOutcomeView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let index_label = self.painter.muted(format!("[{:04}]", self.outcome.index()));
        match self.outcome.result() {
            Ok(data) => {
                write!(f, "{index_label} {}", self.tag_line(data))?;
                if data.records().is_empty() {
                    write!(f, "\n{}", self.painter.warning("tag holds no records"))
                } else {
                    write!(f, "\n{}", self.records_table(data.records()))
                }
            }
            Err(error) => {
                write!(
                    f,
                    "{index_label} {}",
                    self.painter.error(format_error_chain(error))
                )
            }
        }
    }
}

/// Renders the scan session summary line.
pub(crate) struct ScanSummaryView<'a> {
    summary: &'a ScanRunSummary,
    painter: &'a Painter,
}

impl<'a> ScanSummaryView<'a> {
    pub(crate) fn new(summary: &'a ScanRunSummary, painter: &'a Painter) -> Self {
        Self { summary, painter }
    }
}

impl Display for ScanSummaryView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let stop_reason = self.summary.stop_reason();
        let stop_label = match stop_reason {
            ScanStopReason::FirstRead | ScanStopReason::WriteComplete => {
                self.painter.success(stop_reason.to_string())
            }
            ScanStopReason::Invalidated | ScanStopReason::PollingEnded => {
                self.painter.warning(stop_reason.to_string())
            }
            ScanStopReason::Errored => self.painter.error(stop_reason.to_string()),
        };
        write!(
            f,
            "{} {} {}",
            self.painter.heading("Stopped:"),
            stop_label,
            self.painter.value(format!(
                "- delivered {} outcome(s)",
                self.summary.delivered_outcomes()
            ))
        )
    }
}

/// Names a record type for display: the two well-known types get words, the
/// rest their first type byte.
pub(crate) fn record_type_label(record: &NdefRecord) -> String {
    match (record.tnf(), record.type_code()) {
        (NdefRecord::TNF_WELL_KNOWN, Some(NdefRecord::TYPE_TEXT)) => "text".to_string(),
        (NdefRecord::TNF_WELL_KNOWN, Some(NdefRecord::TYPE_URI)) => "uri".to_string(),
        (_, Some(code)) => format!("0x{code:02X}"),
        (_, None) => "<untyped>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rstest::rstest;

    use crate::error::{ScanError, TagError};
    use crate::hw::TagKind;
    use crate::ndef::decode_message;

    use super::*;

    fn read_tag() -> TagData {
        let message = decode_message(&[0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69]);
        TagData::new(
            vec![0x04, 0xA1, 0xB2, 0xC3],
            TagKind::MiFare,
            message.into_records(),
        )
    }

    #[rstest]
    #[case::read_until_interrupted(SessionMode::Read, false, "scan_ready_read")]
    #[case::read_first(SessionMode::Read, true, "scan_ready_read_first")]
    #[case::write(SessionMode::Write, false, "scan_ready_write")]
    fn ready_banner_renders(
        #[case] mode: SessionMode,
        #[case] stop_after_first_read: bool,
        #[case] snapshot_name: &str,
    ) {
        let options = ScanOptions::new().with_stop_after_first_read(stop_after_first_read);
        let painter = Painter::new(false);
        let view = ScanReadyView::new(mode, &options, &painter);
        assert_snapshot!(snapshot_name, view.to_string());
    }

    #[test]
    fn ready_banner_includes_the_hint() {
        let options = ScanOptions::new().with_scan_hint("hold the tag near the reader");
        let painter = Painter::new(false);
        let view = ScanReadyView::new(SessionMode::Read, &options, &painter);
        assert_snapshot!("scan_ready_with_hint", view.to_string());
    }

    #[test]
    fn outcome_renders_the_tag_and_its_records() {
        let outcome = ScanOutcome::new(1, Ok(read_tag()));
        let painter = Painter::new(false);
        assert_snapshot!(
            "outcome_with_records",
            ScanOutcomeView::new(&outcome, &painter).to_string()
        );
    }

    #[test]
    fn outcome_flags_a_blank_tag() {
        let data = TagData::new(vec![0x04, 0xA1, 0xB2, 0xC3], TagKind::MiFare, Vec::new());
        let outcome = ScanOutcome::new(2, Ok(data));
        let painter = Painter::new(false);
        assert_snapshot!(
            "outcome_blank_tag",
            ScanOutcomeView::new(&outcome, &painter).to_string()
        );
    }

    #[test]
    fn outcome_renders_the_error_chain() {
        let outcome = ScanOutcome::new(
            3,
            Err(ScanError::Read {
                source: TagError::CommandRejected {
                    sw1: 0x63,
                    sw2: 0x00,
                },
            }),
        );
        let painter = Painter::new(false);
        assert_snapshot!(
            "outcome_error",
            ScanOutcomeView::new(&outcome, &painter).to_string()
        );
    }

    #[rstest]
    #[case::first_read(ScanStopReason::FirstRead, "summary_first_read")]
    #[case::invalidated(ScanStopReason::Invalidated, "summary_invalidated")]
    #[case::errored(ScanStopReason::Errored, "summary_errored")]
    fn summary_renders_stop_reason(
        #[case] stop_reason: ScanStopReason,
        #[case] snapshot_name: &str,
    ) {
        let summary = ScanRunSummary::new(1, stop_reason);
        let painter = Painter::new(false);
        assert_snapshot!(
            snapshot_name,
            ScanSummaryView::new(&summary, &painter).to_string()
        );
    }
}
