use thiserror::Error;

/// Errors delivered through scan sessions.
///
/// Each variant maps to one stage of the tag conversation, so a consumer can
/// tell a tag that never connected apart from one that refused a write.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no NFC reader hardware is available")]
    HardwareUnavailable { source: TagError },
    #[error("scan session could not be started")]
    SessionStart { source: TagError },
    #[error("connecting to the detected tag failed")]
    TagConnection { source: TagError },
    #[error("tag does not support NDEF")]
    UnsupportedTag,
    #[error("tag is read-only and cannot be written")]
    ReadOnlyTag,
    #[error("reading the tag failed")]
    Read { source: TagError },
    #[error("writing the tag failed")]
    Write { source: TagError },
    #[error("scan session collapsed while polling for tags")]
    SessionInvalidated { source: TagError },
    #[error("polling ended before a tag was detected")]
    NoTagDetected,
    #[error("scan session is still running; no summary is available yet")]
    ScanIncomplete,
    #[error("failed while waiting for Ctrl+C")]
    CtrlC { source: std::io::Error },
}

/// Errors returned by tag hardware operations.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("PC/SC operation failed")]
    Pcsc(#[from] pcsc::Error),
    #[error("no PC/SC readers are connected")]
    NoReaders,
    #[error("tag rejected the command with status `{sw1:02X} {sw2:02X}`")]
    CommandRejected { sw1: u8, sw2: u8 },
    #[error("tag response of {length} bytes was shorter than expected")]
    TruncatedResponse { length: usize },
    #[error("message of {needed} bytes exceeds the tag capacity of {capacity} bytes")]
    CapacityExceeded { needed: usize, capacity: usize },
    #[error("tag holds no stored message")]
    EmptyTag,
}

/// Errors returned when parsing fake tag fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake tag fixture is empty")]
    EmptyFixture,
    #[error("fixture records must contain four pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("fixture records cannot contain empty mandatory fields")]
    EmptyRecordField,
    #[error("unknown tag kind `{value}`")]
    UnknownTagKind { value: String },
    #[error("unknown NDEF status `{value}`")]
    UnknownNdefStatus { value: String },
    #[error("failed to parse capacity value")]
    InvalidCapacity(#[from] std::num::ParseIntError),
    #[error("hex payload length must be even")]
    InvalidHexLength,
    #[error("hex payload contains invalid character `{value}`")]
    InvalidHexCharacter { value: char },
}

/// Errors returned when validating runtime backend options.
#[derive(Debug, Error)]
pub(crate) enum CliConfigError {
    #[error("missing fake tag fixture while fake mode is enabled")]
    MissingFakeTagFixture,
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
