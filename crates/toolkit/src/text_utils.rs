//! Text Detection
//!
//! The toolkit only edits UTF-8 text. Binary files and files that only decode
//! lossily are refused, since writing them back would change bytes outside
//! the edited span.

/// Check whether a file extension is known to be a text format.
pub(crate) fn is_likely_text_extension(ext: &str) -> bool {
    matches!(
        ext,
        "txt"
            | "md"
            | "mdx"
            | "json"
            | "yaml"
            | "yml"
            | "toml"
            | "html"
            | "htm"
            | "css"
            | "scss"
            | "sass"
            | "less"
            | "js"
            | "jsx"
            | "mjs"
            | "cjs"
            | "ts"
            | "tsx"
            | "vue"
            | "svelte"
            | "astro"
            | "svg"
            | "xml"
            | "py"
            | "rs"
            | "go"
    )
}

/// Heuristic check: does the byte buffer look like binary data?
///
/// Scans up to the first 4 KiB. Returns `true` when a NUL byte is
/// found or when >30 % of bytes are non-text-like.
pub(crate) fn is_probably_binary(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample_len = bytes.len().min(4096);
    let sample = &bytes[..sample_len];
    if sample.contains(&0) {
        return true;
    }
    let suspicious = sample
        .iter()
        .filter(|b| !matches!(**b, 0x09 | 0x0A | 0x0D | 0x20..=0x7E))
        .count();
    (suspicious as f64 / sample_len as f64) > 0.30
}

/// Decode file bytes for editing.
///
/// Returns `Some(text)` only for valid UTF-8 that does not look binary.
/// Known text extensions skip the binary heuristic, since UTF-8 heavy copy
/// (CJK labels, emoji) trips the non-ASCII ratio.
pub fn decode_editable_text(bytes: &[u8], ext: &str) -> Option<String> {
    let text = std::str::from_utf8(bytes).ok()?;
    if bytes.contains(&0) {
        return None;
    }
    if is_likely_text_extension(ext) || !is_probably_binary(bytes) {
        Some(text.to_string())
    } else {
        None
    }
}
