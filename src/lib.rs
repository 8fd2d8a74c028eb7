mod app;
mod cli;
mod error;
mod hw;
mod ndef;
mod session;
mod telemetry;
mod terminal;
mod utils;

pub use app::{
    fake_hardware_client, real_hardware_client, run, run_with_clients,
    run_with_clients_and_log_level, run_with_log_level,
};
pub use cli::{Args, Command, FakeArgs, LogLevel, OutputFormat, ReadArgs, WriteArgs};
pub use error::{FixtureError, ScanError, TagError};
pub use hw::{
    ConnectedTag, DetectionEvent, HardwareClient, InspectReport, NdefStatus, PreparedPollSession,
    ScanRunSummary, ScanStopReason, StatusReport, TagData, TagHandle, TagKind,
};
pub use ndef::{
    NdefCodecError, NdefMessage, NdefRecord, TextRecordInput, bytes_to_hex, bytes_to_text,
    decode_message, encode_message, encode_text_records, hex_digits_to_integer, text_to_bytes,
    uri_prefix,
};
pub use session::{
    ScanOptions, ScanOutcome, ScanRequest, ScanSession, SessionMode, SessionPhase, TagScanner,
    inspect_first_tag,
};
pub use terminal::TerminalClient;
