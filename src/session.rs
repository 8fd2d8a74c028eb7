//! Scan session state machine.
//!
//! [`TagScanner`] owns a single active session slot: starting a new scan
//! invalidates the previous session before polling restarts. Each
//! [`ScanSession`] streams per-tag outcomes from a background driver task
//! and publishes its lifecycle through [`SessionPhase`].

use std::sync::atomic::{AtomicU64, Ordering};

use strum_macros::Display;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{ScanError, TagError};
use crate::hw::{
    HardwareClient, InspectReport, NdefStatus, PreparedPollSession, ScanRunSummary, ScanStopReason,
    TagData, TagHandle,
};
use crate::ndef::{NdefCodecError, NdefMessage, decode_message, encode_message};

/// Outcomes are handed over one at a time; the driver waits for the consumer
/// to take each outcome before it talks to the next tag.
const OUTCOME_QUEUE_DEPTH: usize = 1;

/// What a scan session does with each detected tag.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum SessionMode {
    /// Read the stored NDEF message from detected tags.
    #[strum(to_string = "read")]
    Read,
    /// Write one pending NDEF message to the first writable tag.
    #[strum(to_string = "write")]
    Write,
}

/// Lifecycle of one scan session.
///
/// Sessions move from [`SessionPhase::Idle`] through the tag conversation
/// phases and always end in [`SessionPhase::Closed`], whatever stopped them.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Display)]
pub enum SessionPhase {
    /// The session exists but its driver has not started polling yet.
    #[strum(to_string = "idle")]
    Idle,
    /// Polling for tags.
    #[strum(to_string = "scanning")]
    Scanning,
    /// A tag surfaced in the latest polling round.
    #[strum(to_string = "tag_detected")]
    TagDetected,
    /// The tag answered the NDEF status query.
    #[strum(to_string = "status_queried")]
    StatusQueried,
    /// Reading the tag's message bytes.
    #[strum(to_string = "reading")]
    Reading,
    /// Writing the pending message to the tag.
    #[strum(to_string = "writing")]
    Writing,
    /// Handing the outcome of the tag conversation to the consumer.
    #[strum(to_string = "reporting")]
    Reporting,
    /// The session has ended and polling is torn down.
    #[strum(to_string = "closed")]
    Closed,
}

/// Per-session options shared by read and write scans.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    stop_after_first_read: bool,
    scan_hint: Option<String>,
}

impl ScanOptions {
    /// Creates options with defaults: keep listening, no hint.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the session after the first successfully read tag.
    #[must_use]
    pub fn with_stop_after_first_read(mut self, stop: bool) -> Self {
        self.stop_after_first_read = stop;
        self
    }

    /// Attaches a hint describing what the user should do with the reader,
    /// for display while the session scans.
    #[must_use]
    pub fn with_scan_hint(mut self, hint: impl Into<String>) -> Self {
        self.scan_hint = Some(hint.into());
        self
    }

    #[must_use]
    pub fn stop_after_first_read(&self) -> bool {
        self.stop_after_first_read
    }

    #[must_use]
    pub fn scan_hint(&self) -> Option<&str> {
        self.scan_hint.as_deref()
    }
}

/// What to do with the tags a session detects.
///
/// Write requests encode their message once, up front, so an unencodable
/// message is rejected before any hardware is touched.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    work: ScanWork,
    options: ScanOptions,
}

#[derive(Debug, Clone)]
enum ScanWork {
    Read,
    Write { message: NdefMessage, bytes: Vec<u8> },
}

impl ScanRequest {
    /// Builds a request that reads detected tags.
    #[must_use]
    pub fn read(options: ScanOptions) -> Self {
        Self {
            work: ScanWork::Read,
            options,
        }
    }

    /// Builds a request that writes `message` to the first writable tag.
    ///
    /// # Errors
    ///
    /// Returns an error when the message cannot be encoded.
    pub fn write(message: NdefMessage, options: ScanOptions) -> Result<Self, NdefCodecError> {
        let bytes = encode_message(&message)?;
        Ok(Self {
            work: ScanWork::Write { message, bytes },
            options,
        })
    }

    /// Returns the mode this request runs the session in.
    #[must_use]
    pub fn mode(&self) -> SessionMode {
        match self.work {
            ScanWork::Read => SessionMode::Read,
            ScanWork::Write { .. } => SessionMode::Write,
        }
    }

    /// Returns the per-session options.
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }
}

/// One delivered tag conversation: its 1-based position within the session,
/// and either the tag data read or written, or the error that ended the
/// conversation.
#[derive(Debug)]
pub struct ScanOutcome {
    index: usize,
    result: Result<TagData, ScanError>,
}

impl ScanOutcome {
    pub(crate) fn new(index: usize, result: Result<TagData, ScanError>) -> Self {
        Self { index, result }
    }

    /// Returns the 1-based position of this outcome within its session.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the result of the tag conversation.
    #[must_use]
    pub fn result(&self) -> &Result<TagData, ScanError> {
        &self.result
    }

    /// Consumes the outcome and returns the conversation result.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the tag conversation.
    pub fn into_result(self) -> Result<TagData, ScanError> {
        self.result
    }
}

/// Entry point for scan sessions.
///
/// Holds at most one active session. Starting a new scan invalidates the
/// previous session and waits for it to close before polling restarts, so
/// two sessions never contend for the same readers.
#[derive(Debug, Default)]
pub struct TagScanner {
    active: Mutex<Option<ActiveScan>>,
    next_generation: AtomicU64,
}

#[derive(Debug)]
struct ActiveScan {
    cancel: CancellationToken,
    phase: watch::Receiver<SessionPhase>,
    generation: u64,
}

impl TagScanner {
    /// Creates a scanner with no active session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a scan session and hands back its consumer half.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend has no usable readers or polling
    /// cannot start.
    #[instrument(skip(self, hardware_client, request), fields(mode = %request.mode()))]
    pub async fn start_scan(
        &self,
        hardware_client: Box<dyn HardwareClient>,
        request: ScanRequest,
    ) -> Result<ScanSession, ScanError> {
        hardware_client
            .availability()
            .await
            .map_err(|source| ScanError::HardwareUnavailable { source })?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!(
                generation = previous.generation,
                "closing previous scan session"
            );
            previous.cancel.cancel();
            let mut phase = previous.phase;
            await_closed(&mut phase).await;
        }

        let poll = hardware_client
            .begin_polling()
            .await
            .map_err(|source| ScanError::SessionStart { source })?;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_QUEUE_DEPTH);
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Idle);
        let (summary_tx, summary_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        *active = Some(ActiveScan {
            cancel: cancel.clone(),
            phase: phase_rx.clone(),
            generation,
        });
        drop(active);

        info!(generation, "scan session started");
        tokio::spawn(drive_scan(
            poll,
            request,
            outcome_tx,
            phase_tx,
            summary_tx,
            cancel.clone(),
            generation,
        ));

        Ok(ScanSession {
            outcomes: ReceiverStream::new(outcome_rx),
            phase: phase_rx,
            cancel,
            summary: summary_rx,
            generation,
        })
    }
}

/// Consumer half of one scan session.
#[derive(Debug)]
pub struct ScanSession {
    outcomes: ReceiverStream<ScanOutcome>,
    phase: watch::Receiver<SessionPhase>,
    cancel: CancellationToken,
    summary: oneshot::Receiver<ScanRunSummary>,
    generation: u64,
}

impl ScanSession {
    /// Waits for the next tag outcome.
    ///
    /// Returns `None` once the session stops delivering outcomes; the
    /// session phase tells why it stopped.
    pub async fn next_outcome(&mut self) -> Option<ScanOutcome> {
        self.outcomes.next().await
    }

    /// Returns the phase the session is currently in.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Returns the token identifying this session on its scanner. Tokens
    /// increase with every started session.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the session and waits until it reports
    /// [`SessionPhase::Closed`].
    ///
    /// Invalidating an already closed session is a no-op.
    pub async fn invalidate(&mut self) {
        self.cancel.cancel();
        await_closed(&mut self.phase).await;
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TryFrom<ScanSession> for ScanRunSummary {
    type Error = ScanError;

    /// Takes the run summary out of a session that has finished.
    fn try_from(mut session: ScanSession) -> Result<Self, Self::Error> {
        session
            .summary
            .try_recv()
            .map_err(|_| ScanError::ScanIncomplete)
    }
}

/// Waits until the session behind `phase` reports it has closed.
async fn await_closed(phase: &mut watch::Receiver<SessionPhase>) {
    while *phase.borrow_and_update() != SessionPhase::Closed {
        if phase.changed().await.is_err() {
            break;
        }
    }
}

#[instrument(skip_all, level = "debug", fields(generation, mode = %request.mode()))]
async fn drive_scan(
    mut poll: PreparedPollSession,
    request: ScanRequest,
    outcomes: mpsc::Sender<ScanOutcome>,
    phase: watch::Sender<SessionPhase>,
    summary: oneshot::Sender<ScanRunSummary>,
    cancel: CancellationToken,
    generation: u64,
) {
    phase.send_replace(SessionPhase::Scanning);
    let mut delivered = 0usize;

    let stop_reason = loop {
        let detection = tokio::select! {
            () = cancel.cancelled() => break ScanStopReason::Invalidated,
            detection = poll.next_detection() => detection,
        };

        let event = match detection {
            Ok(Some(event)) => event,
            Ok(None) => break ScanStopReason::PollingEnded,
            Err(source) => {
                let outcome = ScanOutcome::new(
                    delivered + 1,
                    Err(ScanError::SessionInvalidated { source }),
                );
                if deliver(&outcomes, &cancel, outcome).await {
                    delivered += 1;
                    break ScanStopReason::Errored;
                }
                break ScanStopReason::Invalidated;
            }
        };

        let Some(handle) = event.first() else {
            continue;
        };
        phase.send_replace(SessionPhase::TagDetected);
        debug!(%handle, "tag detected");

        let step = converse_with_tag(&poll, handle, &request, &phase).await;

        phase.send_replace(SessionPhase::Reporting);
        let stop = stop_reason_for(&step, &request);
        let outcome = ScanOutcome::new(delivered + 1, step);
        if !deliver(&outcomes, &cancel, outcome).await {
            break ScanStopReason::Invalidated;
        }
        delivered += 1;

        match stop {
            Some(reason) => break reason,
            None => {
                phase.send_replace(SessionPhase::Scanning);
            }
        }
    };

    info!(%stop_reason, delivered, "scan session closing");
    poll.end().await;
    let _ = summary.send(ScanRunSummary::new(delivered, stop_reason));
    phase.send_replace(SessionPhase::Closed);
}

/// Hands one outcome to the consumer, unless the session is invalidated
/// first or the consumer is gone.
async fn deliver(
    outcomes: &mpsc::Sender<ScanOutcome>,
    cancel: &CancellationToken,
    outcome: ScanOutcome,
) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        sent = outcomes.send(outcome) => sent.is_ok(),
    }
}

/// Runs the read or write conversation with one detected tag.
async fn converse_with_tag(
    poll: &PreparedPollSession,
    handle: TagHandle,
    request: &ScanRequest,
    phase: &watch::Sender<SessionPhase>,
) -> Result<TagData, ScanError> {
    let tag = poll
        .connect_tag(handle)
        .await
        .map_err(|source| ScanError::TagConnection { source })?;
    let status = tag
        .query_status()
        .await
        .map_err(|source| ScanError::TagConnection { source })?;
    phase.send_replace(SessionPhase::StatusQueried);
    debug!(
        reader = tag.reader(),
        kind = %tag.kind(),
        status = %status.status(),
        capacity_bytes = status.capacity_bytes(),
        "queried tag status"
    );

    if status.status() == NdefStatus::NotSupported {
        return Err(ScanError::UnsupportedTag);
    }

    match &request.work {
        ScanWork::Read => {
            phase.send_replace(SessionPhase::Reading);
            let bytes = match tag.read_message_bytes().await {
                Ok(bytes) => bytes,
                // A formatted but blank tag is a readable tag with no records.
                Err(TagError::EmptyTag) => Vec::new(),
                Err(source) => return Err(ScanError::Read { source }),
            };
            let message = decode_message(&bytes);
            Ok(TagData::new(
                tag.uid().to_vec(),
                tag.kind(),
                message.into_records(),
            ))
        }
        ScanWork::Write { message, bytes } => {
            // Refuse before touching the tag, not after a failed write.
            if status.status() == NdefStatus::ReadOnly {
                return Err(ScanError::ReadOnlyTag);
            }
            phase.send_replace(SessionPhase::Writing);
            tag.write_message_bytes(bytes)
                .await
                .map_err(|source| ScanError::Write { source })?;
            Ok(TagData::new(
                tag.uid().to_vec(),
                tag.kind(),
                message.records().to_vec(),
            ))
        }
    }
}

fn stop_reason_for(
    result: &Result<TagData, ScanError>,
    request: &ScanRequest,
) -> Option<ScanStopReason> {
    match result {
        Ok(_data) => match request.mode() {
            SessionMode::Write => Some(ScanStopReason::WriteComplete),
            SessionMode::Read if request.options().stop_after_first_read() => {
                Some(ScanStopReason::FirstRead)
            }
            SessionMode::Read => None,
        },
        Err(_error) => Some(ScanStopReason::Errored),
    }
}

/// Connects to the first detected tag and reports its identity and NDEF
/// status without reading or writing any payload.
///
/// Runs outside the session state machine: polling ends as soon as one tag
/// has been inspected.
///
/// # Errors
///
/// Returns an error when polling cannot start, ends before a tag appears,
/// or the detected tag cannot be queried.
#[instrument(skip(hardware_client))]
pub async fn inspect_first_tag(
    hardware_client: Box<dyn HardwareClient>,
) -> Result<InspectReport, ScanError> {
    hardware_client
        .availability()
        .await
        .map_err(|source| ScanError::HardwareUnavailable { source })?;
    let mut poll = hardware_client
        .begin_polling()
        .await
        .map_err(|source| ScanError::SessionStart { source })?;

    let report = first_tag_report(&mut poll).await;
    poll.end().await;
    report
}

async fn first_tag_report(poll: &mut PreparedPollSession) -> Result<InspectReport, ScanError> {
    loop {
        let detection = poll
            .next_detection()
            .await
            .map_err(|source| ScanError::SessionInvalidated { source })?;
        let Some(event) = detection else {
            return Err(ScanError::NoTagDetected);
        };
        let Some(handle) = event.first() else {
            continue;
        };

        let tag = poll
            .connect_tag(handle)
            .await
            .map_err(|source| ScanError::TagConnection { source })?;
        let status = tag
            .query_status()
            .await
            .map_err(|source| ScanError::TagConnection { source })?;
        return Ok(InspectReport::new(
            tag.reader().to_string(),
            tag.kind(),
            tag.uid().to_vec(),
            status.status(),
            status.capacity_bytes(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::hw::TagKind;
    use crate::ndef::{NdefCodecError, TextRecordInput, encode_text_records};

    fn text_message(text: &str) -> NdefMessage {
        encode_text_records(&[TextRecordInput::new(text)])
            .expect("fixture message should encode")
    }

    fn read_tag_data() -> TagData {
        TagData::new(vec![0x04, 0xA1], TagKind::MiFare, Vec::new())
    }

    #[test]
    fn read_request_carries_mode_and_options() {
        let request = ScanRequest::read(ScanOptions::new().with_stop_after_first_read(true));

        assert_eq!(SessionMode::Read, request.mode());
        assert!(request.options().stop_after_first_read());
        assert_eq!(None, request.options().scan_hint());
    }

    #[test]
    fn write_request_encodes_message_up_front() {
        let request = ScanRequest::write(text_message("hi"), ScanOptions::new())
            .expect("writable message should produce a request");

        assert_eq!(SessionMode::Write, request.mode());
        assert_matches!(
            &request.work,
            ScanWork::Write { bytes, .. }
            if bytes == &vec![0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69]
        );
    }

    #[test]
    fn write_request_rejects_empty_message() {
        let message = NdefMessage::from_records(Vec::new());

        let error = ScanRequest::write(message, ScanOptions::new())
            .expect_err("an empty message should be rejected before scanning");

        assert_matches!(error, NdefCodecError::NoRecords);
    }

    #[test]
    fn scan_hint_survives_the_builder() {
        let options = ScanOptions::new().with_scan_hint("hold the tag near the reader");

        assert_eq!(Some("hold the tag near the reader"), options.scan_hint());
        assert!(!options.stop_after_first_read());
    }

    #[rstest]
    #[case::idle(SessionPhase::Idle, "idle")]
    #[case::scanning(SessionPhase::Scanning, "scanning")]
    #[case::tag_detected(SessionPhase::TagDetected, "tag_detected")]
    #[case::status_queried(SessionPhase::StatusQueried, "status_queried")]
    #[case::reading(SessionPhase::Reading, "reading")]
    #[case::writing(SessionPhase::Writing, "writing")]
    #[case::reporting(SessionPhase::Reporting, "reporting")]
    #[case::closed(SessionPhase::Closed, "closed")]
    fn phases_render_snake_case_labels(#[case] phase: SessionPhase, #[case] expected: &str) {
        assert_eq!(expected, phase.to_string());
    }

    #[test]
    fn successful_write_stops_the_session() {
        let request = ScanRequest::write(text_message("hi"), ScanOptions::new())
            .expect("writable message should produce a request");

        let reason = stop_reason_for(&Ok(read_tag_data()), &request);

        assert_eq!(Some(ScanStopReason::WriteComplete), reason);
    }

    #[test]
    fn successful_read_keeps_listening_by_default() {
        let request = ScanRequest::read(ScanOptions::new());

        let reason = stop_reason_for(&Ok(read_tag_data()), &request);

        assert_eq!(None, reason);
    }

    #[test]
    fn stop_after_first_read_stops_on_success() {
        let request = ScanRequest::read(ScanOptions::new().with_stop_after_first_read(true));

        let reason = stop_reason_for(&Ok(read_tag_data()), &request);

        assert_eq!(Some(ScanStopReason::FirstRead), reason);
    }

    #[test]
    fn any_conversation_error_stops_the_session() {
        let request = ScanRequest::read(ScanOptions::new());

        let reason = stop_reason_for(&Err(ScanError::UnsupportedTag), &request);

        assert_eq!(Some(ScanStopReason::Errored), reason);
    }
}
