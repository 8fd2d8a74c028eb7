use super::bytes::{bytes_to_hex, bytes_to_text};
use super::codec::NdefCodecError;
use super::uri::uri_prefix;

const MAX_LANGUAGE_CODE_CHARS: usize = u8::MAX as usize;
const DEFAULT_LANGUAGE_CODE: &str = "en";

/// One NDEF record: a type-name-format class, an optional record type, an
/// optional identifier and the raw payload bytes.
///
/// Records are produced by [`decode_message`](crate::decode_message) and
/// [`encode_text_records`](crate::encode_text_records); the payload
/// interpretation helpers derive text lazily so the raw bytes stay the
/// source of truth.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NdefRecord {
    tnf: u8,
    type_code: Option<u8>,
    id: Vec<u8>,
    payload: Vec<u8>,
}

impl NdefRecord {
    /// Type-name-format class of the well-known record types.
    pub const TNF_WELL_KNOWN: u8 = 0x01;
    /// First type byte of a well-known text record (`"T"`).
    pub const TYPE_TEXT: u8 = 0x54;
    /// First type byte of a well-known URI record (`"U"`).
    pub const TYPE_URI: u8 = 0x55;

    pub(crate) fn new(tnf: u8, type_code: Option<u8>, id: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            tnf,
            type_code,
            id,
            payload,
        }
    }

    /// Type-name-format bits from the record header.
    #[must_use]
    pub fn tnf(&self) -> u8 {
        self.tnf
    }

    /// First byte of the record type, or `None` for a zero-length type.
    #[must_use]
    pub fn type_code(&self) -> Option<u8> {
        self.type_code
    }

    /// Record identifier bytes. Empty when the record carries no id.
    #[must_use]
    pub fn id(&self) -> &[u8] {
        &self.id
    }

    /// Raw payload bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload rendered as lowercase hex.
    ///
    /// ```
    /// let message = tagscan::decode_message(&[0xD1, 0x01, 0x02, 0x54, 0x00, 0x68]);
    ///
    /// assert_eq!("0068", message.records()[0].payload_hex());
    /// ```
    #[must_use]
    pub fn payload_hex(&self) -> String {
        bytes_to_hex(&self.payload)
    }

    /// Full decoded payload text, including the framing characters the
    /// record type defines. See [`decoded_text`](Self::decoded_text) for the
    /// interpreted form.
    #[must_use]
    pub fn decoded_text_with_prefix(&self) -> String {
        bytes_to_text(&self.payload)
    }

    /// Payload text interpreted per the record type.
    ///
    /// Text records drop the status character and the language code it
    /// counts. URI records replace the abbreviation character with the
    /// prefix it names. Every other record decodes verbatim.
    ///
    /// ```
    /// let bytes = [0xD1, 0x01, 0x05, 0x54, 0x02, 0x65, 0x6E, 0x68, 0x69];
    /// let message = tagscan::decode_message(&bytes);
    ///
    /// assert_eq!("hi", message.records()[0].decoded_text());
    /// ```
    #[must_use]
    pub fn decoded_text(&self) -> String {
        let decoded = bytes_to_text(&self.payload);
        match self.type_code {
            Some(Self::TYPE_TEXT) => {
                let Some(language_code_len) = self.payload.first() else {
                    return decoded;
                };
                decoded
                    .chars()
                    .skip(1 + usize::from(*language_code_len))
                    .collect()
            }
            Some(Self::TYPE_URI) => {
                let Some(abbreviation) = self.payload.first() else {
                    return decoded;
                };
                let mut text = String::from(uri_prefix(*abbreviation));
                text.extend(decoded.chars().skip(1));
                text
            }
            _ => decoded,
        }
    }
}

/// An ordered sequence of NDEF records, in wire order.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NdefMessage {
    records: Vec<NdefRecord>,
}

impl NdefMessage {
    pub(crate) fn from_records(records: Vec<NdefRecord>) -> Self {
        Self { records }
    }

    /// Records in wire order.
    #[must_use]
    pub fn records(&self) -> &[NdefRecord] {
        &self.records
    }

    /// Consumes the message, yielding its records.
    #[must_use]
    pub fn into_records(self) -> Vec<NdefRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Input for one well-known text record.
///
/// The language code defaults to `"en"` and is stored ahead of the text with
/// a one-byte character count, so it is capped at 255 characters.
///
/// ```
/// use tagscan::TextRecordInput;
///
/// let input = TextRecordInput::new("open the door").with_language_code("nl")?;
///
/// assert_eq!("nl", input.language_code());
/// # Ok::<(), tagscan::NdefCodecError>(())
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TextRecordInput {
    text: String,
    language_code: String,
    id: Vec<u8>,
}

impl TextRecordInput {
    /// Creates an input with the default `"en"` language code and no id.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language_code: DEFAULT_LANGUAGE_CODE.to_owned(),
            id: Vec::new(),
        }
    }

    /// Replaces the language code. An empty code is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`NdefCodecError::LanguageCodeTooLong`] when the code exceeds
    /// 255 characters.
    pub fn with_language_code(
        mut self,
        language_code: impl Into<String>,
    ) -> Result<Self, NdefCodecError> {
        let language_code = language_code.into();
        let length = language_code.chars().count();
        if length > MAX_LANGUAGE_CODE_CHARS {
            return Err(NdefCodecError::LanguageCodeTooLong { length });
        }
        self.language_code = language_code;
        Ok(self)
    }

    /// Attaches a record identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Vec<u8>>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    #[must_use]
    pub fn id(&self) -> &[u8] {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn text_record(payload: &[u8]) -> NdefRecord {
        NdefRecord::new(
            NdefRecord::TNF_WELL_KNOWN,
            Some(NdefRecord::TYPE_TEXT),
            Vec::new(),
            payload.to_vec(),
        )
    }

    #[test]
    fn text_records_skip_the_counted_language_code() {
        let record = text_record(&[0x02, 0x65, 0x6E, 0x68, 0x69]);

        assert_eq!("hi", record.decoded_text());
        assert_eq!("\u{2}enhi", record.decoded_text_with_prefix());
    }

    #[test]
    fn text_records_with_an_empty_language_code_skip_only_the_count() {
        let record = text_record(&[0x00, 0x68, 0x69]);

        assert_eq!("hi", record.decoded_text());
    }

    #[test]
    fn language_code_length_counts_characters_not_bytes() {
        // "мы" is two characters but four expanded bytes.
        let mut payload = vec![0x02];
        payload.extend_from_slice("мы".as_bytes());
        payload.extend_from_slice(b"ok");

        assert_eq!("ok", text_record(&payload).decoded_text());
    }

    #[rstest]
    #[case::https(0x04, "example.com", "https://example.com")]
    #[case::no_prefix(0x00, "data:text", "data:text")]
    #[case::out_of_range(0x7F, "raw", "raw")]
    fn uri_records_expand_the_abbreviation_byte(
        #[case] abbreviation: u8,
        #[case] rest: &str,
        #[case] expected: &str,
    ) {
        let mut payload = vec![abbreviation];
        payload.extend_from_slice(rest.as_bytes());
        let record = NdefRecord::new(
            NdefRecord::TNF_WELL_KNOWN,
            Some(NdefRecord::TYPE_URI),
            Vec::new(),
            payload,
        );

        assert_eq!(expected, record.decoded_text());
    }

    #[test]
    fn other_record_types_decode_verbatim() {
        let record = NdefRecord::new(0x02, Some(0x58), Vec::new(), b"raw bytes".to_vec());

        assert_eq!("raw bytes", record.decoded_text());
        assert_eq!(record.decoded_text(), record.decoded_text_with_prefix());
    }

    #[test]
    fn records_without_a_type_decode_verbatim() {
        let record = NdefRecord::new(0x00, None, Vec::new(), vec![0x68, 0x69]);

        assert_eq!("hi", record.decoded_text());
    }

    #[test]
    fn empty_payloads_decode_to_empty_text() {
        let record = text_record(&[]);

        assert_eq!("", record.decoded_text());
        assert_eq!("", record.payload_hex());
    }

    #[test]
    fn payload_hex_is_lowercase() {
        assert_eq!("02656e6869", text_record(&[0x02, 0x65, 0x6E, 0x68, 0x69]).payload_hex());
    }

    #[test]
    fn text_record_input_defaults_to_english() {
        let input = TextRecordInput::new("hi");

        assert_eq!("hi", input.text());
        assert_eq!("en", input.language_code());
        assert!(input.id().is_empty());
    }

    #[test]
    fn text_record_input_accepts_an_empty_language_code() {
        let input = TextRecordInput::new("hi")
            .with_language_code("")
            .expect("empty code is within the cap");

        assert_eq!("", input.language_code());
    }

    #[test]
    fn text_record_input_rejects_an_oversized_language_code() {
        let result = TextRecordInput::new("hi").with_language_code("x".repeat(256));

        assert_matches!(
            result,
            Err(NdefCodecError::LanguageCodeTooLong { length: 256 })
        );
    }

    #[test]
    fn text_record_input_keeps_the_attached_id() {
        let input = TextRecordInput::new("hi").with_id([0xAB, 0xCD]);

        assert_eq!(&[0xAB, 0xCD], input.id());
    }
}
