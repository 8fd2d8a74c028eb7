use std::ffi::CString;
use std::time::Duration;

use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};
use tokio::time::sleep;
use tracing::{debug, info, instrument, trace};

use super::model::{DetectionEvent, NdefStatus, StatusReport, TagHandle, TagKind};
use crate::error::TagError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const GET_UID_APDU: [u8; 5] = [0xFF, 0xCA, 0x00, 0x00, 0x00];
const MAX_RESPONSE_BYTES: usize = 258;
const SW_SUCCESS: (u8, u8) = (0x90, 0x00);

const PAGE_BYTES: usize = 4;
const READ_CHUNK_BYTES: usize = 16;
const CAPABILITY_CONTAINER_PAGE: u8 = 3;
const DATA_START_PAGE: u8 = 4;

const NDEF_MAGIC: u8 = 0xE1;
const TLV_NULL: u8 = 0x00;
const TLV_NDEF_MESSAGE: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xFE;
const TLV_LONG_LENGTH_MARKER: u8 = 0xFF;

/// PC/SC registered application provider identifier, present in the
/// historical bytes of contactless storage-card ATRs.
const PCSC_RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

/// Real backend speaking PC/SC to attached readers.
pub(crate) struct PcscBackend {
    context: Context,
}

impl PcscBackend {
    /// Creates the real PC/SC backend.
    pub(crate) fn new() -> Result<Self, TagError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// Reports whether at least one reader is attached.
    pub(crate) fn availability(&self) -> Result<(), TagError> {
        let mut readers_buf = [0; 2048];
        let mut readers = self.context.list_readers(&mut readers_buf)?;
        if readers.next().is_none() {
            return Err(TagError::NoReaders);
        }
        Ok(())
    }

    /// Starts polling every attached reader for tags.
    #[instrument(skip(self), level = "debug")]
    pub(crate) fn begin_polling(self) -> Result<RealPollSession, TagError> {
        let mut readers_buf = [0; 2048];
        let reader_names: Vec<CString> = self
            .context
            .list_readers(&mut readers_buf)?
            .map(CString::from)
            .collect();
        if reader_names.is_empty() {
            return Err(TagError::NoReaders);
        }
        info!(reader_count = reader_names.len(), "starting tag polling");

        let reader_states = reader_names
            .iter()
            .map(|name| ReaderState::new(name.clone(), State::UNAWARE))
            .collect();
        Ok(RealPollSession {
            context: self.context,
            reader_names,
            reader_states,
        })
    }
}

/// A running PC/SC polling session over a fixed reader set.
pub(crate) struct RealPollSession {
    context: Context,
    reader_names: Vec<CString>,
    reader_states: Vec<ReaderState>,
}

impl RealPollSession {
    /// Waits until at least one reader surfaces a tag.
    ///
    /// Each handle indexes the reader the tag appeared on, so one round can
    /// surface several tags when multiple readers are attached.
    pub(crate) async fn next_detection(&mut self) -> Result<Option<DetectionEvent>, TagError> {
        loop {
            match self
                .context
                .get_status_change(Duration::ZERO, &mut self.reader_states)
            {
                Ok(()) => {}
                Err(pcsc::Error::Timeout) => {
                    sleep(POLL_INTERVAL).await;
                    continue;
                }
                Err(error) => return Err(TagError::Pcsc(error)),
            }

            let mut handles = Vec::new();
            for (index, reader_state) in self.reader_states.iter_mut().enumerate() {
                let event = reader_state.event_state();
                if event.contains(State::CHANGED) && event.contains(State::PRESENT) {
                    handles.push(TagHandle::from(index));
                }
                reader_state.sync_current_state();
            }

            if handles.is_empty() {
                sleep(POLL_INTERVAL).await;
                continue;
            }
            trace!(tag_count = handles.len(), "readers surfaced tags");
            return Ok(Some(DetectionEvent::new(handles)));
        }
    }

    /// Connects to the tag on one reader and identifies it.
    #[instrument(skip(self), level = "debug", fields(%handle))]
    pub(crate) fn connect_tag(&self, handle: TagHandle) -> Result<RealConnectedTag, TagError> {
        let reader_name = self
            .reader_names
            .get(usize::from(handle))
            .ok_or(TagError::Pcsc(pcsc::Error::UnknownReader))?;
        let card = self
            .context
            .connect(reader_name, ShareMode::Shared, Protocols::ANY)?;

        let status = card.status2_owned()?;
        let kind = tag_kind_from_atr(status.atr());
        let uid = transmit_checked(&card, &GET_UID_APDU)?;
        debug!(reader = ?reader_name, %kind, "connected to tag");

        Ok(RealConnectedTag {
            reader: reader_name.to_string_lossy().into_owned(),
            card,
            kind,
            uid,
        })
    }

    /// Ends polling and releases the PC/SC context.
    pub(crate) fn end(self) {
        debug!("tag polling session released");
    }
}

/// A tag connected through a PC/SC reader.
pub(crate) struct RealConnectedTag {
    reader: String,
    card: Card,
    kind: TagKind,
    uid: Vec<u8>,
}

impl RealConnectedTag {
    pub(crate) fn reader(&self) -> &str {
        &self.reader
    }

    pub(crate) fn kind(&self) -> TagKind {
        self.kind
    }

    pub(crate) fn uid(&self) -> &[u8] {
        &self.uid
    }

    /// Reads the capability container and classifies NDEF support.
    pub(crate) fn query_status(&self) -> Result<StatusReport, TagError> {
        let apdu = read_binary_apdu(CAPABILITY_CONTAINER_PAGE, PAGE_BYTES as u8);
        let container = match transmit_checked(&self.card, &apdu) {
            Ok(container) => container,
            // Tags without a readable data area cannot hold NDEF.
            Err(TagError::CommandRejected { .. }) => {
                return Ok(StatusReport::new(NdefStatus::NotSupported, 0));
            }
            Err(error) => return Err(error),
        };
        if container.len() < PAGE_BYTES {
            return Err(TagError::TruncatedResponse {
                length: container.len(),
            });
        }
        if container[0] != NDEF_MAGIC {
            return Ok(StatusReport::new(NdefStatus::NotSupported, 0));
        }

        let capacity_bytes = usize::from(container[2]) * 8;
        let status = if container[3] & 0x0F == 0 {
            NdefStatus::ReadWrite
        } else {
            NdefStatus::ReadOnly
        };
        Ok(StatusReport::new(status, capacity_bytes))
    }

    /// Reads the tag data area and unwraps the stored NDEF message bytes.
    #[instrument(skip(self), level = "debug")]
    pub(crate) fn read_message_bytes(&self) -> Result<Vec<u8>, TagError> {
        let capacity_bytes = self.query_status()?.capacity_bytes();
        if capacity_bytes == 0 {
            return Err(TagError::EmptyTag);
        }

        let mut memory = Vec::with_capacity(capacity_bytes);
        let mut page = DATA_START_PAGE;
        while memory.len() < capacity_bytes {
            let remaining = capacity_bytes - memory.len();
            let chunk_len = remaining.min(READ_CHUNK_BYTES);
            let data = transmit_checked(&self.card, &read_binary_apdu(page, chunk_len as u8))?;
            if data.is_empty() {
                return Err(TagError::TruncatedResponse { length: 0 });
            }
            page += data.len().div_ceil(PAGE_BYTES) as u8;
            memory.extend_from_slice(&data);
        }

        extract_ndef_from_tlv(&memory).ok_or(TagError::EmptyTag)
    }

    /// Wraps message bytes in an NDEF TLV container and writes it page by
    /// page from the start of the data area.
    #[instrument(skip(self, bytes), level = "debug", fields(message_len = bytes.len()))]
    pub(crate) fn write_message_bytes(&self, bytes: &[u8]) -> Result<(), TagError> {
        let capacity_bytes = self.query_status()?.capacity_bytes();
        let container = wrap_in_tlv(bytes);
        if container.len() > capacity_bytes {
            return Err(TagError::CapacityExceeded {
                needed: container.len(),
                capacity: capacity_bytes,
            });
        }

        let mut page = DATA_START_PAGE;
        for chunk in container.chunks(PAGE_BYTES) {
            let mut page_bytes = [0u8; PAGE_BYTES];
            page_bytes[..chunk.len()].copy_from_slice(chunk);
            transmit_checked(&self.card, &update_binary_apdu(page, &page_bytes))?;
            page += 1;
        }
        info!(container_len = container.len(), "wrote NDEF container");
        Ok(())
    }
}

/// Transmits one APDU and strips the status word after checking it.
fn transmit_checked(card: &Card, apdu: &[u8]) -> Result<Vec<u8>, TagError> {
    let mut response_buf = [0; MAX_RESPONSE_BYTES];
    let response = card.transmit(apdu, &mut response_buf)?;
    let Some((data, &[sw1, sw2])) = response.split_last_chunk::<2>() else {
        return Err(TagError::TruncatedResponse {
            length: response.len(),
        });
    };
    if (sw1, sw2) != SW_SUCCESS {
        return Err(TagError::CommandRejected { sw1, sw2 });
    }
    Ok(data.to_vec())
}

fn read_binary_apdu(page: u8, length: u8) -> [u8; 5] {
    [0xFF, 0xB0, 0x00, page, length]
}

fn update_binary_apdu(page: u8, data: &[u8; PAGE_BYTES]) -> [u8; 9] {
    let mut apdu = [0xFF, 0xD6, 0x00, page, PAGE_BYTES as u8, 0, 0, 0, 0];
    apdu[5..].copy_from_slice(data);
    apdu
}

/// Classifies a tag from the standard byte following the PC/SC RID in its
/// ATR. ATRs without the RID come from ISO-DEP smart cards.
fn tag_kind_from_atr(atr: &[u8]) -> TagKind {
    let Some(rid_index) = atr
        .windows(PCSC_RID.len())
        .position(|window| window == PCSC_RID)
    else {
        return if atr.is_empty() {
            TagKind::Unknown
        } else {
            TagKind::Iso7816
        };
    };
    match atr.get(rid_index + PCSC_RID.len()) {
        Some(0x01..=0x04) => TagKind::MiFare,
        Some(0x09..=0x0C) => TagKind::Iso15693,
        Some(0x11) => TagKind::FeliCa,
        _ => TagKind::Unknown,
    }
}

/// Finds the NDEF message TLV in tag memory and returns its value bytes.
///
/// Returns `None` for memory without a message, which callers treat as an
/// empty tag rather than a failure.
fn extract_ndef_from_tlv(memory: &[u8]) -> Option<Vec<u8>> {
    let mut index = 0;
    while index < memory.len() {
        match memory[index] {
            TLV_NULL => index += 1,
            TLV_TERMINATOR => return None,
            TLV_NDEF_MESSAGE => {
                let (length, header_len) = tlv_length(&memory[index + 1..])?;
                let start = index + 1 + header_len;
                let bytes = memory.get(start..start + length)?;
                if bytes.is_empty() {
                    return None;
                }
                return Some(bytes.to_vec());
            }
            _ => {
                // Skip unrelated blocks such as lock control TLVs.
                let (length, header_len) = tlv_length(&memory[index + 1..])?;
                index += 1 + header_len + length;
            }
        }
    }
    None
}

/// Decodes a TLV length field, returning the length and the field's width.
fn tlv_length(bytes: &[u8]) -> Option<(usize, usize)> {
    match *bytes.first()? {
        TLV_LONG_LENGTH_MARKER => {
            let high = *bytes.get(1)?;
            let low = *bytes.get(2)?;
            Some(((usize::from(high) << 8) | usize::from(low), 3))
        }
        length => Some((usize::from(length), 1)),
    }
}

/// Wraps NDEF message bytes in the TLV container stored on the tag.
fn wrap_in_tlv(bytes: &[u8]) -> Vec<u8> {
    let mut container = Vec::with_capacity(bytes.len() + 5);
    container.push(TLV_NDEF_MESSAGE);
    if bytes.len() >= usize::from(TLV_LONG_LENGTH_MARKER) {
        container.push(TLV_LONG_LENGTH_MARKER);
        container.push((bytes.len() >> 8) as u8);
        container.push((bytes.len() & 0xFF) as u8);
    } else {
        container.push(bytes.len() as u8);
    }
    container.extend_from_slice(bytes);
    container.push(TLV_TERMINATOR);
    container
}
