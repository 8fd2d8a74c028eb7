/// Abbreviation table for well-known URI records, indexed by the first
/// payload byte. Index 0 is the empty prefix.
static URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Resolves a URI record's abbreviation byte to its textual prefix.
///
/// Bytes past the end of the table resolve to the empty prefix, so lookups
/// never fail on tags written with a newer table.
///
/// ```
/// use tagscan::uri_prefix;
///
/// assert_eq!("https://www.", uri_prefix(0x02));
/// assert_eq!("urn:nfc:", uri_prefix(0x23));
/// assert_eq!("", uri_prefix(0x7F));
/// ```
#[must_use]
pub fn uri_prefix(index: u8) -> &'static str {
    URI_PREFIXES.get(usize::from(index)).copied().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::no_prefix(0x00, "")]
    #[case::http_www(0x01, "http://www.")]
    #[case::https_www(0x02, "https://www.")]
    #[case::https(0x04, "https://")]
    #[case::tel(0x05, "tel:")]
    #[case::mailto(0x06, "mailto:")]
    #[case::file(0x1D, "file://")]
    #[case::last_entry(0x23, "urn:nfc:")]
    fn known_abbreviations_resolve(#[case] index: u8, #[case] expected: &str) {
        assert_eq!(expected, uri_prefix(index));
    }

    #[rstest]
    #[case::just_past_the_table(0x24)]
    #[case::far_past_the_table(0xFF)]
    fn out_of_range_bytes_resolve_to_the_empty_prefix(#[case] index: u8) {
        assert_eq!("", uri_prefix(index));
    }
}
