//! Post-processing: deterministic cleanup of LLM-generated captions.
//!
//! Even well-prompted models occasionally wrap a post in code fences or
//! quotation marks, emit `**bold**` markers that social networks show
//! literally, or leak zero-width characters. These cheap string rules fix
//! such quirks without touching the wording.
//!
//! Rules run in a fixed order: fences and quotes are stripped before line
//! endings are normalised so the wrapper detection sees the raw text, and
//! blank lines are collapsed after trailing whitespace is gone.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all caption clean-up rules.
///
/// 1. Strip outer code fences
/// 2. Strip quotation marks wrapping the whole caption
/// 3. Normalise line endings (CRLF → LF)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 2+ consecutive blank lines down to 1
/// 6. Unwrap `**bold**` / `__bold__` Markdown emphasis
/// 7. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 8. Trim the whole caption
pub fn clean_caption(input: &str) -> String {
    let s = strip_code_fences(input);
    let s = strip_wrapping_quotes(&s);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = unwrap_emphasis(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Strip wrapping quotes ────────────────────────────────────────────

fn strip_wrapping_quotes(input: &str) -> String {
    let t = input.trim();
    for (open, close) in [('"', '"'), ('\u{201C}', '\u{201D}')] {
        if t.len() >= 2 && t.starts_with(open) && t.ends_with(close) {
            let inner = &t[open.len_utf8()..t.len() - close.len_utf8()];
            // Only a wrapper when the caption contains no other quote of that kind.
            if !inner.contains(open) && !inner.contains(close) {
                return inner.to_string();
            }
        }
    }
    input.to_string()
}

// ── Rule 3: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Unwrap Markdown emphasis ─────────────────────────────────────────

static RE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\n]+)\*\*|__([^_\n]+)__").unwrap());

fn unwrap_emphasis(input: &str) -> String {
    RE_EMPHASIS
        .replace_all(input, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .to_string()
}

// ── Rule 7: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
