const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Renders bytes as lowercase hex, two digits per byte.
///
/// ```
/// use tagscan::bytes_to_hex;
///
/// assert_eq!("0054ff", bytes_to_hex(&[0x00, 0x54, 0xFF]));
/// assert_eq!("", bytes_to_hex(&[]));
/// ```
#[must_use]
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        hex.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
        hex.push(char::from(HEX_DIGITS[usize::from(byte & 0x0F)]));
    }
    hex
}

/// Folds hexadecimal digits into an integer, most significant digit first.
///
/// Both digit cases are accepted. The fold is permissive: it stops at the
/// first character that is not a hexadecimal digit and returns the value
/// accumulated so far, and values wider than 64 bits saturate.
///
/// ```
/// use tagscan::hex_digits_to_integer;
///
/// assert_eq!(84, hex_digits_to_integer("54"));
/// assert_eq!(255, hex_digits_to_integer("FF"));
/// assert_eq!(10, hex_digits_to_integer("az"));
/// assert_eq!(0, hex_digits_to_integer(""));
/// ```
#[must_use]
pub fn hex_digits_to_integer(hex: &str) -> u64 {
    let mut value: u64 = 0;
    for digit in hex.chars() {
        let Some(digit_value) = digit.to_digit(16) else {
            break;
        };
        value = value
            .saturating_mul(16)
            .saturating_add(u64::from(digit_value));
    }
    value
}

/// Expands text into the byte sequence stored in a text-record payload.
///
/// Code points below 0x80 take one byte, code points up to 0x7FF take two
/// (`110xxxxx 10xxxxxx`) and the rest of the basic plane takes three
/// (`1110xxxx 10xxxxxx 10xxxxxx`). Rust strings already carry exactly this
/// encoding, so the expansion is the string's UTF-8 bytes; [`bytes_to_text`]
/// reverses it for the one- to three-byte patterns.
///
/// ```
/// use tagscan::text_to_bytes;
///
/// assert_eq!(vec![0x68, 0x69], text_to_bytes("hi"));
/// assert_eq!(vec![0xC3, 0xA9], text_to_bytes("é"));
/// assert_eq!(vec![0xE2, 0x82, 0xAC], text_to_bytes("€"));
/// ```
#[must_use]
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

/// Decodes text-record payload bytes back into characters.
///
/// This is the mirror of [`text_to_bytes`], not a general UTF-8 decoder: it
/// merges the two- and three-byte patterns that expansion produces and maps
/// every other byte to its own Latin-1-range character, so stray continuation
/// bytes and truncated sequences degrade to split characters instead of
/// failing. Four-byte sequences are outside the text-record contract.
///
/// ```
/// use tagscan::bytes_to_text;
///
/// assert_eq!("hi", bytes_to_text(&[0x68, 0x69]));
/// assert_eq!("é", bytes_to_text(&[0xC3, 0xA9]));
/// assert_eq!("Ã", bytes_to_text(&[0xC3]));
/// ```
#[must_use]
pub fn bytes_to_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        let lead = bytes[index];
        if lead < 0x80 {
            text.push(char::from(lead));
            index += 1;
        } else if (0xC0..0xE0).contains(&lead) && index + 1 < bytes.len() {
            let code = (u32::from(lead & 0x1F) << 6) | u32::from(bytes[index + 1] & 0x3F);
            text.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            index += 2;
        } else if lead >= 0xE0 && index + 2 < bytes.len() {
            let code = (u32::from(lead & 0x0F) << 12)
                | (u32::from(bytes[index + 1] & 0x3F) << 6)
                | u32::from(bytes[index + 2] & 0x3F);
            text.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            index += 3;
        } else {
            text.push(char::from(lead));
            index += 1;
        }
    }
    text
}
