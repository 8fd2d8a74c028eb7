//! NDEF record model and wire codec.
//!
//! The codec covers the subset of the NFC Data Exchange Format that text and
//! URI tags use: short and long records, optional ids and the well-known
//! text and URI payload layouts. Decoding is deliberately forgiving so a
//! half-written tag still yields whatever records parsed cleanly.

mod bytes;
mod codec;
mod record;
mod uri;

pub use bytes::{bytes_to_hex, bytes_to_text, hex_digits_to_integer, text_to_bytes};
pub use codec::{NdefCodecError, decode_message, encode_message, encode_text_records};
pub use record::{NdefMessage, NdefRecord, TextRecordInput};
pub use uri::uri_prefix;
