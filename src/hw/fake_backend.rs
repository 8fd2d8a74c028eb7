use std::str::FromStr;
use std::time::Duration;

use bon::Builder;
use tokio::time::sleep;
use tracing::debug;

use super::model::{DetectionEvent, NdefStatus, StatusReport, TagHandle, TagKind};
use crate::error::{FixtureError, TagError};

/// Parsed fake tag fixture records.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct TagFixture {
    tags: Vec<FixtureTag>,
}

impl FromStr for TagFixture {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let tags = parse_tag_fixture(value)?;
        Ok(Self { tags })
    }
}

/// One fixture tag: kind, UID, NDEF status and capacity.
#[derive(Debug, Clone)]
pub(crate) struct FixtureTag {
    kind: TagKind,
    uid: Vec<u8>,
    status: NdefStatus,
    capacity_bytes: usize,
}

/// Parsed fake hex payload.
#[derive(Debug, Clone, derive_more::Into)]
pub(crate) struct HexPayload {
    payload: Vec<u8>,
}

impl FromStr for HexPayload {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let payload = parse_hex(value)?;
        Ok(Self { payload })
    }
}

/// Settings for constructing a fake hardware backend.
#[derive(Debug, Builder)]
pub(crate) struct FakeBackendConfig {
    tag_fixture: TagFixture,
    payload: Option<HexPayload>,
    max_detections: Option<usize>,
    #[builder(default)]
    detect_delay: Duration,
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

/// Fake backend used in tests and non-hardware environments.
#[derive(Debug)]
pub(crate) struct FakeBackend {
    config: FakeBackendConfig,
}

impl FakeBackend {
    /// Creates a fake backend from explicit settings.
    pub(crate) fn new(config: FakeBackendConfig) -> Self {
        Self { config }
    }

    /// Reports whether the fake reader hardware is reachable.
    pub(crate) fn availability(&self) -> Result<(), TagError> {
        if self.config.unavailable {
            return Err(TagError::NoReaders);
        }
        Ok(())
    }

    /// Starts fake tag polling.
    pub(crate) fn begin_polling(self) -> Result<FakePollSession, TagError> {
        let FakeBackendConfig {
            tag_fixture,
            payload,
            max_detections,
            detect_delay,
            batch_detections,
            unavailable,
            fail_connect,
            fail_read,
            fail_write,
        } = self.config;
        if unavailable {
            return Err(TagError::NoReaders);
        }

        Ok(FakePollSession {
            tags: tag_fixture.into(),
            payload: payload.map(Into::into),
            max_detections,
            detect_delay,
            batch_detections,
            fail_connect,
            fail_read,
            fail_write,
            rounds_delivered: 0,
        })
    }
}

/// A running fake polling session.
#[derive(Debug)]
pub(crate) struct FakePollSession {
    tags: Vec<FixtureTag>,
    payload: Option<Vec<u8>>,
    max_detections: Option<usize>,
    detect_delay: Duration,
    batch_detections: bool,
    fail_connect: bool,
    fail_read: bool,
    fail_write: bool,
    rounds_delivered: usize,
}

impl FakePollSession {
    /// Surfaces the next fixture detection round, or `None` once the
    /// configured round limit is reached.
    pub(crate) async fn next_detection(&mut self) -> Result<Option<DetectionEvent>, TagError> {
        if let Some(limit) = self.max_detections
            && self.rounds_delivered >= limit
        {
            return Ok(None);
        }
        if !self.detect_delay.is_zero() {
            sleep(self.detect_delay).await;
        }
        self.rounds_delivered += 1;

        let handles = if self.batch_detections {
            (0..self.tags.len()).map(TagHandle::from).collect()
        } else {
            vec![TagHandle::from(0)]
        };
        Ok(Some(DetectionEvent::new(handles)))
    }

    /// Connects to one fixture tag.
    pub(crate) fn connect_tag(&self, handle: TagHandle) -> Result<FakeConnectedTag, TagError> {
        if self.fail_connect {
            return Err(TagError::Pcsc(pcsc::Error::RemovedCard));
        }
        let tag = self
            .tags
            .get(usize::from(handle))
            .ok_or(TagError::Pcsc(pcsc::Error::UnknownReader))?;

        Ok(FakeConnectedTag {
            reader: format!("fake-reader-{handle}"),
            kind: tag.kind,
            uid: tag.uid.clone(),
            status: tag.status,
            capacity_bytes: tag.capacity_bytes,
            payload: self.payload.clone(),
            fail_read: self.fail_read,
            fail_write: self.fail_write,
        })
    }

    /// Ends fake polling.
    pub(crate) fn end(self) {
        debug!(
            rounds = self.rounds_delivered,
            "fake tag polling session dropped"
        );
    }
}

/// A connected fixture tag.
#[derive(Debug)]
pub(crate) struct FakeConnectedTag {
    reader: String,
    kind: TagKind,
    uid: Vec<u8>,
    status: NdefStatus,
    capacity_bytes: usize,
    payload: Option<Vec<u8>>,
    fail_read: bool,
    fail_write: bool,
}

impl FakeConnectedTag {
    pub(crate) fn reader(&self) -> &str {
        &self.reader
    }

    pub(crate) fn kind(&self) -> TagKind {
        self.kind
    }

    pub(crate) fn uid(&self) -> &[u8] {
        &self.uid
    }

    /// Reports the fixture NDEF status and capacity.
    pub(crate) fn query_status(&self) -> Result<StatusReport, TagError> {
        Ok(StatusReport::new(self.status, self.capacity_bytes))
    }

    /// Returns the preloaded payload bytes.
    pub(crate) fn read_message_bytes(&self) -> Result<Vec<u8>, TagError> {
        if self.fail_read {
            return Err(TagError::CommandRejected {
                sw1: 0x63,
                sw2: 0x00,
            });
        }
        match &self.payload {
            Some(payload) => Ok(payload.clone()),
            None => Err(TagError::EmptyTag),
        }
    }

    /// Accepts message bytes the way the fixture tag would.
    pub(crate) fn write_message_bytes(&self, bytes: &[u8]) -> Result<(), TagError> {
        if self.fail_write || self.status != NdefStatus::ReadWrite {
            return Err(TagError::CommandRejected {
                sw1: 0x63,
                sw2: 0x00,
            });
        }
        if bytes.len() > self.capacity_bytes {
            return Err(TagError::CapacityExceeded {
                needed: bytes.len(),
                capacity: self.capacity_bytes,
            });
        }
        Ok(())
    }
}

fn parse_tag_fixture(raw_fixture: &str) -> Result<Vec<FixtureTag>, FixtureError> {
    if raw_fixture.trim().is_empty() {
        return Err(FixtureError::EmptyFixture);
    }

    raw_fixture
        .split(';')
        .map(parse_tag_record)
        .collect::<Result<Vec<_>, _>>()
}

fn parse_tag_record(raw_record: &str) -> Result<FixtureTag, FixtureError> {
    let fields: Vec<&str> = raw_record.split('|').map(str::trim).collect();
    if fields.len() != 4 {
        return Err(FixtureError::InvalidRecordFieldCount);
    }
    if fields.iter().any(|field| field.is_empty()) {
        return Err(FixtureError::EmptyRecordField);
    }

    let kind = TagKind::from_str(fields[0]).map_err(|_| FixtureError::UnknownTagKind {
        value: fields[0].to_string(),
    })?;
    let uid = parse_hex(fields[1])?;
    let status = NdefStatus::from_str(fields[2]).map_err(|_| FixtureError::UnknownNdefStatus {
        value: fields[2].to_string(),
    })?;
    let capacity_bytes = fields[3].parse::<usize>()?;

    Ok(FixtureTag {
        kind,
        uid,
        status,
        capacity_bytes,
    })
}

fn parse_hex(raw_value: &str) -> Result<Vec<u8>, FixtureError> {
    let cleaned: String = raw_value.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&cleaned).map_err(|error| match error {
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            FixtureError::InvalidHexLength
        }
        hex::FromHexError::InvalidHexCharacter { c, .. } => {
            FixtureError::InvalidHexCharacter { value: c }
        }
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("mifare|04a1b2c3|read_write|137", 1)]
    #[case("mifare|04a1b2c3|read_write|137;felica|01fe|read_only|224", 2)]
    fn parse_tag_fixture_parses_records(#[case] fixture: &str, #[case] expected_count: usize) {
        let tags = parse_tag_fixture(fixture).expect("fixture should parse");
        assert_eq!(expected_count, tags.len());
    }

    #[test]
    fn parse_tag_fixture_rejects_invalid_field_count() {
        let result = parse_tag_fixture("mifare|04a1b2c3|read_write");
        assert_matches!(result, Err(FixtureError::InvalidRecordFieldCount));
    }

    #[test]
    fn parse_tag_fixture_rejects_unknown_kinds() {
        let result = parse_tag_fixture("warp-core|04a1|read_write|137");
        assert_matches!(
            result,
            Err(FixtureError::UnknownTagKind { value }) if value == "warp-core"
        );
    }

    #[test]
    fn parse_tag_fixture_rejects_unknown_statuses() {
        let result = parse_tag_fixture("mifare|04a1|writable|137");
        assert_matches!(
            result,
            Err(FixtureError::UnknownNdefStatus { value }) if value == "writable"
        );
    }

    #[test]
    fn parse_hex_rejects_odd_length() {
        let result = parse_hex("a");
        assert_matches!(result, Err(FixtureError::InvalidHexLength));
    }

    #[test]
    fn parse_hex_rejects_non_hex_characters() {
        let result = parse_hex("z4");
        assert_matches!(result, Err(FixtureError::InvalidHexCharacter { value: 'z' }));
    }

    #[test]
    fn fixture_tags_reject_writes_beyond_their_capacity() {
        let tag = FakeConnectedTag {
            reader: "fake-reader-0".to_string(),
            kind: TagKind::MiFare,
            uid: vec![0x04],
            status: NdefStatus::ReadWrite,
            capacity_bytes: 8,
            payload: None,
            fail_read: false,
            fail_write: false,
        };

        assert_matches!(
            tag.write_message_bytes(&[0x00; 9]),
            Err(TagError::CapacityExceeded {
                needed: 9,
                capacity: 8,
            })
        );
    }

    #[test]
    fn fixture_tags_without_a_payload_read_as_empty() {
        let tag = FakeConnectedTag {
            reader: "fake-reader-0".to_string(),
            kind: TagKind::MiFare,
            uid: vec![0x04],
            status: NdefStatus::ReadWrite,
            capacity_bytes: 64,
            payload: None,
            fail_read: false,
            fail_write: false,
        };

        assert_matches!(tag.read_message_bytes(), Err(TagError::EmptyTag));
    }
}
