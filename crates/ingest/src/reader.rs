/// Decode an uploaded document as UTF-8.
///
/// Invalid byte sequences become U+FFFD rather than failing the upload,
/// and a leading byte-order mark is dropped.
pub fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text.into_owned(),
    }
}
