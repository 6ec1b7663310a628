//! Log Redaction
//!
//! Scrubs API keys, bearer tokens and 16-digit population numbers (NIK / KK)
//! from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static QUERY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&\s]+").unwrap());
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(AIza[0-9A-Za-z\-_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static POPULATION_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{16}\b").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = QUERY_KEY_RE.replace_all(input, "${1}[REDACTED_KEY]");
    let redacted = API_KEY_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    POPULATION_NUMBER_RE
        .replace_all(&redacted, "[REDACTED_ID]")
        .into_owned()
}
