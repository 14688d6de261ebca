//! Post-processing: deterministic cleanup of the model's reply before JSON
//! parsing.
//!
//! Even when told to "only return the JSON", vision models sometimes wrap the
//! object in a ```` ```json ```` fence or prefix it with a byte-order mark.
//! These rules strip that packaging without touching the JSON itself; anything
//! still unparsable afterwards is a genuine parse failure.
//!
//! Rules (applied in order):
//! 1. Strip invisible Unicode (BOM, zero-width spaces)
//! 2. Trim surrounding whitespace
//! 3. Strip one outer code fence, with or without a `json` tag

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
pub fn clean_reply(input: &str) -> String {
    let s = remove_invisible_chars(input);
    strip_code_fence(s.trim())
}

// ── Rule 1: Strip invisible Unicode ──────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}'))
        .collect()
}

// ── Rule 3: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

fn strip_code_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input) {
        caps[1].trim().to_string()
    } else {
        input.to_string()
    }
}
