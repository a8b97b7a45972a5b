//! Minimal escaper for embedding text in a hand-built JSON string literal.
//!
//! Handles backslash, double quote, LF and CR only; other control characters pass through.
//! Page payloads are serialized with serde_json, this stays for callers that template JSON by hand.

/// Escape `s` for use inside a double-quoted JSON string.
///
/// Backslash is replaced first so the later substitutions are not escaped twice.
pub fn escape_json_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}
