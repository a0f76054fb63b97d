use once_cell::sync::Lazy;
use regex::Regex;

/// Printable, non-whitespace local part (no `@`), Gmail domain only.
static GMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[\x21-\x3F\x41-\x7E]+@gmail\.(?:com|in|org)$").expect("valid gmail regex")
});

pub fn is_gmail_address(email: &str) -> bool {
    GMAIL_RE.is_match(email)
}

/// Returns the trimmed value, or `None` when nothing but whitespace was given.
pub fn required(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
