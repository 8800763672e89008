//! Log sanitization for clinical values and key material.
//!
//! Form values are never logged on purpose, but formatted output passes
//! through this filter anyway. It redacts:
//! - feature rows (bracketed lists of six or more numbers)
//! - `field=value` and `field value <n>` pairs naming one of the clinical inputs
//! - signing keys, signatures and other long hex/base64 secrets
//!
//! Each call caps its input (configurable per writer, see
//! `HEARTCHECK_SANITIZE_MAX_BYTES`) so a runaway log line costs bounded work.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FEATURE_NAMES;

static RULES: OnceLock<Rules> = OnceLock::new();

/// Default cap on bytes sanitized per call (16 KiB).
pub const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: String,
}

struct Rules {
    set: RegexSet,
    rules: Vec<Rule>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn rules() -> &'static Rules {
    RULES.get_or_init(|| {
        let number = r"-?\d+(?:\.\d+)?";
        let fields = FEATURE_NAMES.join("|");
        let secret_names = r"signing[_-]?key|private[_-]?key|secret|seed|signature|sig|token|key";

        let table: Vec<(String, String)> = vec![
            (
                format!(r"\[\s*{number}(?:\s*,\s*{number}){{5,}}\s*\]"),
                "[REDACTED-FEATURES]".into(),
            ),
            (
                format!(r"\b(?P<field>{fields})\b(?:\s*[:=]\s*|\s+value\s+){number}"),
                "${field}=[REDACTED]".into(),
            ),
            (
                format!(r"(?i)\b(?:{secret_names})\b\s*[:=]\s*[A-Za-z0-9+/]{{32,}}={{0,2}}"),
                "[REDACTED-SECRET]".into(),
            ),
            (
                format!(r"(?i)\b(?:{secret_names})\b\s*[:=]\s*[0-9a-fA-F]{{16,}}\b"),
                "[REDACTED-SECRET]".into(),
            ),
            (r"\b[0-9a-fA-F]{64,}\b".into(), "[REDACTED-KEY]".into()),
        ];

        let set = RegexSet::new(table.iter().map(|(p, _)| p.as_str()))
            .expect("sanitizer patterns compile");
        let rules = table
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(&pattern).expect("sanitizer pattern compiles"),
                replacement,
            })
            .collect();

        Rules { set, rules }
    })
}

/// Replace clinical values and secrets in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, DEFAULT_SANITIZE_MAX_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let rules = rules();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in rules.set.matches(prefix).iter() {
        let rule = &rules.rules[idx];
        result = rule
            .regex
            .replace_all(&result, rule.replacement.as_str())
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether `input` holds anything `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, DEFAULT_SANITIZE_MAX_BYTES);
    rules().set.is_match(prefix)
}

/// `MakeWriter` wrapper that sanitizes each formatted log line before it
/// reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            max_bytes: DEFAULT_SANITIZE_MAX_BYTES,
        }
    }

    /// Cap on bytes sanitized per line. Zero keeps the current cap.
    #[must_use]
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        if max_bytes > 0 {
            self.max_bytes = max_bytes;
        }
        self
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    buffer: Vec<u8>,
    max_bytes: usize,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn new(inner: W, max_bytes: usize) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            max_bytes,
        }
    }

    fn emit(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let (body, newline) = match bytes.split_last() {
            Some((b'\n', body)) => (body, true),
            _ => (bytes, false),
        };
        let sanitized = sanitize_with_limit(&String::from_utf8_lossy(body), self.max_bytes);
        self.inner.write_all(sanitized.as_bytes())?;
        if newline {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline in sight is flushed once it passes twice the cap.
        if self.buffer.len() > self.max_bytes.saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.emit(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.emit(&pending)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer(), self.max_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_redacts_feature_row() {
        let input = "row=[63.0, 1.0, 3.0, 145.0, 233.0, 1.0, 0.0, 150.0, 0.0, 2.3, 0.0, 0.0, 1.0] done";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-FEATURES]"));
        assert!(!sanitized.contains("233.0"));
        assert!(sanitized.ends_with("done"));
    }

    #[test]
    fn test_short_lists_untouched() {
        let input = "kNN vote over 5 neighbors: [3.0, 2.0]";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_redacts_field_values() {
        let sanitized = sanitize("coerced cholesterol=612 and age: 41");
        assert!(sanitized.contains("cholesterol=[REDACTED]"));
        assert!(sanitized.contains("age=[REDACTED]"));
        assert!(!sanitized.contains("612"));
        assert!(!sanitized.contains("41"));
    }

    #[test]
    fn test_redacts_field_value_phrase() {
        let sanitized = sanitize("Schema mismatch: cholesterol value 612 is outside range");
        assert!(sanitized.contains("cholesterol=[REDACTED]"));
        assert!(!sanitized.contains("612"));
    }

    #[test]
    fn test_field_name_alone_untouched() {
        let input = "field cholesterol coerced into range";
        assert_eq!(sanitize(input), input);
        assert!(!contains_sensitive(input));
    }

    #[test]
    fn test_redacts_secrets() {
        let sanitized = sanitize("signing_key=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0");
        assert!(sanitized.contains("[REDACTED-SECRET]"));

        let sanitized = sanitize("sig: 0123456789abcdef0123");
        assert!(sanitized.contains("[REDACTED-SECRET]"));
    }

    #[test]
    fn test_redacts_bare_hex_key() {
        let hex = "ab".repeat(32);
        let sanitized = sanitize(&format!("material {hex}"));
        assert!(sanitized.contains("[REDACTED-KEY]"));
    }

    #[test]
    fn test_contains_sensitive() {
        assert!(contains_sensitive("resting_bp=120"));
        assert!(!contains_sensitive("Loaded kNN model (k=5)"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let input = "é".repeat(20);
        let sanitized = sanitize_with_limit(&input, 7);
        assert!(sanitized.ends_with(" [TRUNCATED]"));
        assert!(sanitized.starts_with("ééé"));
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink, DEFAULT_SANITIZE_MAX_BYTES);
            writer.write_all(b"age=57 ").expect("write");
            writer.write_all(b"collected\nnext line\n").expect("write");
            writer.flush().expect("flush");
        }
        let out = String::from_utf8(sink).expect("utf8");
        assert_eq!(out, "age=[REDACTED] collected\nnext line\n");
    }

    #[test]
    fn test_make_writer_applies_configured_cap() {
        let make = SanitizingMakeWriter::new(std::io::sink).with_max_bytes(8);
        assert_eq!(make.max_bytes, 8);
        let make = make.with_max_bytes(0);
        assert_eq!(make.max_bytes, 8);

        let mut sink = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink, 8);
            writer.write_all(b"0123456789\n").expect("write");
        }
        let out = String::from_utf8(sink).expect("utf8");
        assert_eq!(out, "01234567 [TRUNCATED]\n");
    }
}
