use extract::TranscriptSegment;

/// Render segments as `[SSSS.mmm] text` runs, concatenated with no
/// separator and trimmed.
///
/// Start times are zero-padded to eight characters (`[0001.500]`), one
/// wider than a `[000.000]` rendering; downstream consumers of the
/// annotated transcript expect this width.
pub fn format_transcription(segments: &[TranscriptSegment]) -> String {
    let mut formatted = String::new();
    for segment in segments {
        formatted.push_str(&format!("[{:08.3}] {}", segment.start, segment.text));
    }
    formatted.trim().to_string()
}
