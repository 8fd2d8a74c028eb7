use thiserror::Error;

use super::bytes::text_to_bytes;
use super::record::{NdefMessage, NdefRecord, TextRecordInput};

const FLAG_MESSAGE_BEGIN: u8 = 0x80;
const FLAG_MESSAGE_END: u8 = 0x40;
const FLAG_SHORT_RECORD: u8 = 0x10;
const FLAG_ID_LENGTH: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

const SHORT_RECORD_MAX_PAYLOAD_LEN: usize = u8::MAX as usize;
const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;
const MAX_ID_LEN: usize = u8::MAX as usize;
const LONG_PAYLOAD_LEN_BYTES: usize = 4;

/// Raised when building NDEF messages or records from invalid input.
///
/// Decoding never raises: malformed wire bytes degrade to the records parsed
/// so far.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum NdefCodecError {
    /// A message must carry at least one record.
    #[error("an NDEF message must contain at least one record")]
    NoRecords,

    /// The language code count has to fit the single status byte.
    #[error("language code of {length} characters exceeds the 255-character limit")]
    LanguageCodeTooLong { length: usize },

    /// Record identifiers carry a one-byte length on the wire.
    #[error("record id of {length} bytes exceeds the 255-byte limit")]
    IdTooLong { length: usize },

    /// Payload length has to fit the four-byte long-record length field.
    #[error("payload of {length} bytes exceeds the four-byte length field")]
    PayloadTooLarge { length: usize },
}

/// Builds an NDEF message of well-known text records, one per input, in
/// input order.
///
/// Each payload starts with the character count of the language code,
/// followed by the expanded language code and the expanded text.
///
/// ```
/// use tagscan::{encode_text_records, TextRecordInput};
///
/// let message = encode_text_records(&[TextRecordInput::new("hi")])?;
///
/// assert_eq!(1, message.len());
/// assert_eq!(&[0x02, 0x65, 0x6E, 0x68, 0x69], message.records()[0].payload());
/// # Ok::<(), tagscan::NdefCodecError>(())
/// ```
///
/// # Errors
///
/// Returns [`NdefCodecError::NoRecords`] when `inputs` is empty.
pub fn encode_text_records(inputs: &[TextRecordInput]) -> Result<NdefMessage, NdefCodecError> {
    if inputs.is_empty() {
        return Err(NdefCodecError::NoRecords);
    }
    let records = inputs
        .iter()
        .map(|input| {
            let language_code = text_to_bytes(input.language_code());
            let text = text_to_bytes(input.text());
            let count = u8::try_from(input.language_code().chars().count())
                .expect("language code length is validated by TextRecordInput::with_language_code");
            let mut payload = Vec::with_capacity(1 + language_code.len() + text.len());
            payload.push(count);
            payload.extend_from_slice(&language_code);
            payload.extend_from_slice(&text);
            NdefRecord::new(
                NdefRecord::TNF_WELL_KNOWN,
                Some(NdefRecord::TYPE_TEXT),
                input.id().to_vec(),
                payload,
            )
        })
        .collect();
    Ok(NdefMessage::from_records(records))
}

/// Serialises a message into NDEF wire bytes.
///
/// The first record carries the message-begin flag and the last the
/// message-end flag. Records with payloads up to 255 bytes use the one-byte
/// short-record length; larger payloads use the four-byte big-endian form.
///
/// ```
/// use tagscan::{encode_message, encode_text_records, TextRecordInput};
///
/// let message = encode_text_records(&[TextRecordInput::new("hi")])?;
///
/// assert_eq!(
///     vec![0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69],
///     encode_message(&message)?,
/// );
/// # Ok::<(), tagscan::NdefCodecError>(())
/// ```
///
/// # Errors
///
/// Returns [`NdefCodecError::NoRecords`] for an empty message,
/// [`NdefCodecError::IdTooLong`] when a record id exceeds 255 bytes and
/// [`NdefCodecError::PayloadTooLarge`] when a payload exceeds the four-byte
/// length field.
pub fn encode_message(message: &NdefMessage) -> Result<Vec<u8>, NdefCodecError> {
    if message.is_empty() {
        return Err(NdefCodecError::NoRecords);
    }
    let mut bytes = Vec::new();
    let last = message.len() - 1;
    for (index, record) in message.records().iter().enumerate() {
        encode_record(&mut bytes, record, index == 0, index == last)?;
    }
    Ok(bytes)
}

fn encode_record(
    bytes: &mut Vec<u8>,
    record: &NdefRecord,
    first: bool,
    last: bool,
) -> Result<(), NdefCodecError> {
    let payload_len = record.payload().len();
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(NdefCodecError::PayloadTooLarge {
            length: payload_len,
        });
    }
    let id_len = record.id().len();
    if id_len > MAX_ID_LEN {
        return Err(NdefCodecError::IdTooLong { length: id_len });
    }

    let short = payload_len <= SHORT_RECORD_MAX_PAYLOAD_LEN;
    let mut header = record.tnf() & TNF_MASK;
    if first {
        header |= FLAG_MESSAGE_BEGIN;
    }
    if last {
        header |= FLAG_MESSAGE_END;
    }
    if short {
        header |= FLAG_SHORT_RECORD;
    }
    if id_len > 0 {
        header |= FLAG_ID_LENGTH;
    }

    bytes.push(header);
    bytes.push(u8::from(record.type_code().is_some()));
    if short {
        bytes.push(u8::try_from(payload_len).expect("short-record payload fits one byte"));
    } else {
        let length = u32::try_from(payload_len).expect("payload length is checked above");
        bytes.extend_from_slice(&length.to_be_bytes());
    }
    if id_len > 0 {
        bytes.push(u8::try_from(id_len).expect("id length is checked above"));
    }
    if let Some(type_code) = record.type_code() {
        bytes.push(type_code);
    }
    bytes.extend_from_slice(record.id());
    bytes.extend_from_slice(record.payload());
    Ok(())
}

/// Parses NDEF wire bytes into a message, best effort.
///
/// Parsing stops at the first record flagged message-end, or at truncated
/// input, and returns whatever parsed cleanly before that. An unreadable
/// buffer yields an empty message rather than an error.
///
/// ```
/// let message = tagscan::decode_message(&[0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69]);
///
/// assert_eq!("hi", message.records()[0].decoded_text());
/// ```
#[must_use]
pub fn decode_message(bytes: &[u8]) -> NdefMessage {
    let mut records = Vec::new();
    let mut cursor = 0;
    while cursor < bytes.len() {
        let Some(parsed) = parse_record(&bytes[cursor..]) else {
            break;
        };
        cursor += parsed.consumed;
        let message_end = parsed.message_end;
        records.push(parsed.record);
        if message_end {
            break;
        }
    }
    NdefMessage::from_records(records)
}

struct ParsedRecord {
    record: NdefRecord,
    consumed: usize,
    message_end: bool,
}

fn parse_record(bytes: &[u8]) -> Option<ParsedRecord> {
    let header = *bytes.first()?;
    let mut cursor = 1;

    let type_len = usize::from(*bytes.get(cursor)?);
    cursor += 1;

    let payload_len = if header & FLAG_SHORT_RECORD != 0 {
        let length = usize::from(*bytes.get(cursor)?);
        cursor += 1;
        length
    } else {
        let field = bytes.get(cursor..cursor + LONG_PAYLOAD_LEN_BYTES)?;
        cursor += LONG_PAYLOAD_LEN_BYTES;
        usize::try_from(u32::from_be_bytes([field[0], field[1], field[2], field[3]])).ok()?
    };

    let id_len = if header & FLAG_ID_LENGTH != 0 {
        let length = usize::from(*bytes.get(cursor)?);
        cursor += 1;
        length
    } else {
        0
    };

    let record_type = bytes.get(cursor..cursor + type_len)?;
    let type_code = record_type.first().copied();
    cursor += type_len;

    let id = bytes.get(cursor..cursor + id_len)?.to_vec();
    cursor += id_len;

    let payload = bytes.get(cursor..cursor + payload_len)?.to_vec();
    cursor += payload_len;

    Some(ParsedRecord {
        record: NdefRecord::new(header & TNF_MASK, type_code, id, payload),
        consumed: cursor,
        message_end: header & FLAG_MESSAGE_END != 0,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const HI_TEXT_RECORD: [u8; 9] = [0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69];

    #[test]
    fn a_single_text_record_encodes_with_all_frame_flags() {
        let message =
            encode_text_records(&[TextRecordInput::new("hi")]).expect("one input is enough");

        let bytes = encode_message(&message).expect("short record encodes");

        assert_eq!(HI_TEXT_RECORD.to_vec(), bytes);
    }

    #[test]
    fn frame_flags_split_across_multiple_records() {
        let inputs = [TextRecordInput::new("a"), TextRecordInput::new("b")];
        let message = encode_text_records(&inputs).expect("two inputs");

        let bytes = encode_message(&message).expect("short records encode");

        // Begin flag on the first header, end flag on the second.
        assert_eq!(
            vec![
                0x91, 0x01, 0x04, 0x54, 0x02, 0x65, 0x6E, 0x61, //
                0x51, 0x01, 0x04, 0x54, 0x02, 0x65, 0x6E, 0x62,
            ],
            bytes,
        );
    }

    #[test]
    fn a_record_id_sets_the_id_length_flag() {
        let message = encode_text_records(&[TextRecordInput::new("hi").with_id([0xAB])])
            .expect("one input");

        let bytes = encode_message(&message).expect("short record encodes");

        assert_eq!(
            vec![0xD9, 0x01, 0x05, 0x01, 0x54, 0xAB, 0x02, 0x65, 0x6E, 0x68, 0x69],
            bytes,
        );
    }

    #[test]
    fn payloads_over_255_bytes_use_the_long_length_field() {
        let message = encode_text_records(&[TextRecordInput::new("x".repeat(300))])
            .expect("one input");

        let bytes = encode_message(&message).expect("long record encodes");

        // 1 count byte + 2 language bytes + 300 text bytes.
        assert_eq!(&[0xC1, 0x01, 0x00, 0x00, 0x01, 0x2F, 0x54], &bytes[..7]);
        assert_eq!(7 + 303, bytes.len());
    }

    #[test]
    fn encoding_no_inputs_is_an_error() {
        assert_matches!(
            encode_text_records(&[]),
            Err(NdefCodecError::NoRecords)
        );
    }

    #[test]
    fn encoding_an_oversized_id_is_an_error() {
        let message = encode_text_records(&[TextRecordInput::new("hi").with_id(vec![0x00; 300])])
            .expect("input construction does not validate the id");

        assert_matches!(
            encode_message(&message),
            Err(NdefCodecError::IdTooLong { length: 300 })
        );
    }

    #[test]
    fn decode_recovers_the_encoded_message() {
        let inputs = [
            TextRecordInput::new("héllo")
                .with_language_code("fr")
                .expect("two characters"),
            TextRecordInput::new("world").with_id([0x01, 0x02]),
        ];
        let message = encode_text_records(&inputs).expect("two inputs");

        let decoded = decode_message(&encode_message(&message).expect("encodes"));

        assert_eq!(message, decoded);
        assert_eq!("héllo", decoded.records()[0].decoded_text());
        assert_eq!("world", decoded.records()[1].decoded_text());
    }

    #[test]
    fn decode_reads_the_long_length_field() {
        let text = "y".repeat(400);
        let message = encode_text_records(&[TextRecordInput::new(text.clone())])
            .expect("one input");

        let decoded = decode_message(&encode_message(&message).expect("encodes"));

        assert_eq!(text, decoded.records()[0].decoded_text());
    }

    #[test]
    fn decode_stops_after_the_message_end_flag() {
        let mut bytes = HI_TEXT_RECORD.to_vec();
        bytes.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let message = decode_message(&bytes);

        assert_eq!(1, message.len());
        assert_eq!("hi", message.records()[0].decoded_text());
    }

    #[test]
    fn decode_keeps_records_parsed_before_a_truncation() {
        // Second record claims five payload bytes but carries two.
        let mut bytes = [0x91, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69].to_vec();
        bytes.extend_from_slice(&[0x51, 0x01, 0x05, 0x54, 0x02, 0x65]);

        let message = decode_message(&bytes);

        assert_eq!(1, message.len());
        assert_eq!("hi", message.records()[0].decoded_text());
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::lone_header(&[0xD1])]
    #[case::truncated_length(&[0xC1, 0x01, 0x00, 0x00])]
    #[case::payload_past_the_end(&[0xD1, 0x01, 0x20, 0x54, 0x02])]
    fn unreadable_buffers_decode_to_an_empty_message(#[case] bytes: &[u8]) {
        assert!(decode_message(bytes).is_empty());
    }

    #[test]
    fn decode_takes_the_first_byte_of_a_multi_byte_type() {
        // Type "Sp" (smart poster); only the first type byte classifies it.
        let bytes = [0xD1, 0x02, 0x02, 0x53, 0x70, 0x68, 0x69];

        let message = decode_message(&bytes);

        assert_eq!(Some(0x53), message.records()[0].type_code());
        assert_eq!("hi", message.records()[0].decoded_text());
    }

    #[test]
    fn decode_keeps_an_empty_type_as_none() {
        let bytes = [0xD0, 0x00, 0x02, 0x68, 0x69];

        let message = decode_message(&bytes);

        assert_eq!(None, message.records()[0].type_code());
        assert_eq!("hi", message.records()[0].decoded_text());
    }

    #[test]
    fn language_code_count_is_in_characters_not_bytes() {
        let message = encode_text_records(&[TextRecordInput::new("ok")
            .with_language_code("мы")
            .expect("two characters")])
        .expect("one input");

        let payload = message.records()[0].payload().to_vec();

        assert_eq!(0x02, payload[0]);
        assert_eq!(7, payload.len());
        assert_eq!("ok", message.records()[0].decoded_text());
    }
}
