use serde_with::SerializeDisplay;
use strum_macros::{Display, EnumString};

use crate::ndef::{NdefRecord, bytes_to_hex};

/// Radio family of a detected tag, as classified by the reader.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString, SerializeDisplay)]
#[strum(ascii_case_insensitive)]
pub enum TagKind {
    /// MiFare family tags (Classic, Ultralight, NTAG).
    #[strum(to_string = "mifare")]
    MiFare,
    /// Sony FeliCa tags.
    #[strum(to_string = "felica")]
    FeliCa,
    /// ISO 14443-4 smart cards.
    #[strum(to_string = "iso7816")]
    Iso7816,
    /// ISO 15693 vicinity tags.
    #[strum(to_string = "iso15693")]
    Iso15693,
    /// Tags the reader could not classify.
    #[strum(to_string = "unknown")]
    Unknown,
}

/// Whether a connected tag speaks NDEF, and in which direction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display, EnumString, SerializeDisplay)]
#[strum(ascii_case_insensitive)]
pub enum NdefStatus {
    /// The tag carries no NDEF capability container.
    #[strum(to_string = "not_supported")]
    NotSupported,
    /// The tag is NDEF-formatted but locked against writes.
    #[strum(to_string = "read_only")]
    ReadOnly,
    /// The tag accepts both reads and writes.
    #[strum(to_string = "read_write")]
    ReadWrite,
}

/// Result of querying a connected tag's NDEF capability.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StatusReport {
    status: NdefStatus,
    capacity_bytes: usize,
}

impl StatusReport {
    /// Creates a status report.
    pub(crate) fn new(status: NdefStatus, capacity_bytes: usize) -> Self {
        Self {
            status,
            capacity_bytes,
        }
    }

    /// Returns the NDEF capability of the tag.
    #[must_use]
    pub fn status(&self) -> NdefStatus {
        self.status
    }

    /// Returns the usable NDEF data area in bytes. Zero when the tag does
    /// not support NDEF.
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }
}

/// Opaque handle for one tag seen during a polling round.
#[derive(
    Debug,
    Clone,
    Copy,
    Eq,
    PartialEq,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
#[display("{_0}")]
pub struct TagHandle(usize);

/// One polling round that surfaced tags.
///
/// A round can surface several tags at once, for example one per connected
/// reader; consumers that talk to a single tag take [`first`](Self::first).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DetectionEvent {
    handles: Vec<TagHandle>,
}

impl DetectionEvent {
    /// Creates a detection event.
    pub(crate) fn new(handles: Vec<TagHandle>) -> Self {
        Self { handles }
    }

    /// Returns all tag handles surfaced by this round.
    #[must_use]
    pub fn handles(&self) -> &[TagHandle] {
        &self.handles
    }

    /// Returns the first surfaced handle, if any.
    #[must_use]
    pub fn first(&self) -> Option<TagHandle> {
        self.handles.first().copied()
    }
}

/// Data delivered for one tag conversation: the tag identity plus the
/// records read from it, or written to it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TagData {
    uid: Vec<u8>,
    kind: TagKind,
    records: Vec<NdefRecord>,
}

impl TagData {
    /// Creates a tag-data record.
    pub(crate) fn new(uid: Vec<u8>, kind: TagKind, records: Vec<NdefRecord>) -> Self {
        Self { uid, kind, records }
    }

    /// Returns the tag UID bytes as reported by the reader.
    #[must_use]
    pub fn uid(&self) -> &[u8] {
        &self.uid
    }

    /// Returns the tag UID as lowercase hex.
    #[must_use]
    pub fn uid_hex(&self) -> String {
        bytes_to_hex(&self.uid)
    }

    /// Returns the tag's radio family.
    #[must_use]
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Returns the NDEF records involved in the conversation.
    #[must_use]
    pub fn records(&self) -> &[NdefRecord] {
        &self.records
    }
}

/// Result of inspecting the first detected tag.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InspectReport {
    reader: String,
    kind: TagKind,
    uid: Vec<u8>,
    status: NdefStatus,
    capacity_bytes: usize,
}

impl InspectReport {
    /// Creates an inspect report.
    pub(crate) fn new(
        reader: String,
        kind: TagKind,
        uid: Vec<u8>,
        status: NdefStatus,
        capacity_bytes: usize,
    ) -> Self {
        Self {
            reader,
            kind,
            uid,
            status,
            capacity_bytes,
        }
    }

    /// Returns the name of the reader the tag was found on.
    #[must_use]
    pub fn reader(&self) -> &str {
        &self.reader
    }

    /// Returns the tag's radio family.
    #[must_use]
    pub fn kind(&self) -> TagKind {
        self.kind
    }

    /// Returns the tag UID bytes as reported by the reader.
    #[must_use]
    pub fn uid(&self) -> &[u8] {
        &self.uid
    }

    /// Returns the tag UID as lowercase hex.
    #[must_use]
    pub fn uid_hex(&self) -> String {
        bytes_to_hex(&self.uid)
    }

    /// Returns the tag's NDEF capability.
    #[must_use]
    pub fn status(&self) -> NdefStatus {
        self.status
    }

    /// Returns the usable NDEF data area in bytes.
    #[must_use]
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_bytes
    }
}

/// Why a scan session ended.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Display, SerializeDisplay)]
pub enum ScanStopReason {
    /// Stop-after-first-read was requested and one tag was read.
    #[display("stopped after first read")]
    FirstRead,
    /// The pending write completed.
    #[display("write completed")]
    WriteComplete,
    /// The consumer invalidated the session.
    #[display("session invalidated")]
    Invalidated,
    /// Tag polling ended on the hardware side.
    #[display("polling ended")]
    PollingEnded,
    /// The session stopped after delivering a terminal error.
    #[display("stopped by error")]
    Errored,
}

/// Summary returned when a scan session closes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ScanRunSummary {
    delivered_outcomes: usize,
    stop_reason: ScanStopReason,
}

impl ScanRunSummary {
    /// Creates a scan run summary.
    pub(crate) fn new(delivered_outcomes: usize, stop_reason: ScanStopReason) -> Self {
        Self {
            delivered_outcomes,
            stop_reason,
        }
    }

    /// Returns the number of outcomes delivered before the session closed.
    #[must_use]
    pub fn delivered_outcomes(&self) -> usize {
        self.delivered_outcomes
    }

    /// Returns why the session ended.
    #[must_use]
    pub fn stop_reason(&self) -> &ScanStopReason {
        &self.stop_reason
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::mifare("mifare", TagKind::MiFare)]
    #[case::mixed_case("MiFare", TagKind::MiFare)]
    #[case::felica("felica", TagKind::FeliCa)]
    #[case::iso7816("iso7816", TagKind::Iso7816)]
    fn tag_kinds_parse_from_their_labels(#[case] label: &str, #[case] expected: TagKind) {
        assert_eq!(expected, TagKind::from_str(label).expect("known label"));
    }

    #[rstest]
    #[case::read_write("read_write", NdefStatus::ReadWrite)]
    #[case::read_only("read_only", NdefStatus::ReadOnly)]
    #[case::not_supported("not_supported", NdefStatus::NotSupported)]
    fn ndef_statuses_parse_from_their_labels(#[case] label: &str, #[case] expected: NdefStatus) {
        assert_eq!(expected, NdefStatus::from_str(label).expect("known label"));
    }

    #[test]
    fn tag_data_renders_its_uid_as_lowercase_hex() {
        let data = TagData::new(vec![0x04, 0xA1, 0xB2, 0xC3], TagKind::MiFare, Vec::new());

        assert_eq!("04a1b2c3", data.uid_hex());
    }

    #[test]
    fn detection_events_yield_the_first_handle() {
        let event = DetectionEvent::new(vec![TagHandle::from(2), TagHandle::from(5)]);

        assert_eq!(Some(TagHandle::from(2)), event.first());
        assert_eq!(2, event.handles().len());
    }

    #[test]
    fn stop_reasons_render_for_status_lines() {
        assert_eq!("stopped after first read", ScanStopReason::FirstRead.to_string());
        assert_eq!("session invalidated", ScanStopReason::Invalidated.to_string());
    }
}
