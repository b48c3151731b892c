//! FFmpeg filtergraph escaping.

use std::path::Path;

/// Escape a value embedded in an FFmpeg filter string.
///
/// Filtergraphs treat `:` and `,` as separators and `\` as an escape
/// character. Windows paths contain both `\` and `:` (drive letter), so
/// they must be escaped to keep filter strings replayable and safe
/// against filtergraph injection.
pub fn escape_filter_value(raw: &str) -> String {
    raw.replace('\\', r"\\")
        .replace(':', r"\:")
        .replace(',', r"\,")
        .replace('\'', r"\'")
}

/// Escape user text for the drawtext filter.
///
/// drawtext expands `%{...}` expressions; user-provided text must stay
/// literal.
pub fn escape_drawtext_text(raw: &str) -> String {
    escape_filter_value(raw).replace('%', r"\%")
}

/// Escape a filesystem path for use inside a filter string.
pub fn escape_filter_path(path: &Path) -> String {
    escape_filter_value(&path.to_string_lossy())
}
