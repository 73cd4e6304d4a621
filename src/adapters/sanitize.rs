//! Log sanitization for patient data and secrets.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`], which redacts:
//! - assessment score assignments (`MMSE=27`, `"FAQ": 3.5`)
//! - UUIDs (diagnosis ids)
//! - long hex runs and contextual base64 secrets (signing seeds, keys)
//!
//! The library never logs raw feature values on purpose; this is a backstop for
//! collaborators that do.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Lines longer than this are truncated before scanning.
const MAX_SANITIZE_BYTES: usize = 16 * 1024;

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

struct Patterns {
    set: RegexSet,
    rules: Vec<Rule>,
}

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            (
                r#""?\b(AGE|PTEDUCAT|CDRSB|ADAS13|ADAS11|FAQ|LDELTOTAL|MMSE|ADASQ4|RAVLT_immediate)\b"?\s*[:=]\s*-?[0-9]+(?:\.[0-9]+)?(?:[eE][-+]?[0-9]+)?"#,
                "${1}=[REDACTED]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            (
                r"(?i)\b(?:seed|secret|private[_-]?key|signing[_-]?key)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}",
                "[REDACTED-SECRET]",
            ),
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| Rule {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        Patterns { set, rules }
    })
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

/// Redact sensitive values from `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, MAX_SANITIZE_BYTES)
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// A `tracing_subscriber` writer wrapper that sanitizes each formatted line
/// before it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // no newline in sight: flush what we have rather than buffer forever
        if self.buffer.len() > MAX_SANITIZE_BYTES * 2 {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            buffer: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_redacts_score_assignments() {
        let sanitized = sanitize("input MMSE=27 FAQ: 3.5 RAVLT_immediate = 41");
        assert!(!sanitized.contains("27"));
        assert!(!sanitized.contains("3.5"));
        assert!(!sanitized.contains("41"));
        assert!(sanitized.contains("MMSE=[REDACTED]"));
        assert!(sanitized.contains("RAVLT_immediate=[REDACTED]"));
    }

    #[test]
    fn test_redacts_json_scores() {
        let sanitized = sanitize(r#"{"AGE":74.0,"CDRSB":0.5}"#);
        assert!(!sanitized.contains("74"));
        assert!(!sanitized.contains("0.5"));
    }

    #[test]
    fn test_leaves_other_text_alone() {
        let line = "Loaded classifier (classes=[0, 1, 2], stages=2)";
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_redacts_uuid_and_keys() {
        let sanitized = sanitize("diagnosis 550e8400-e29b-41d4-a716-446655440000 done");
        assert!(sanitized.contains("[REDACTED-UUID]"));

        let sanitized = sanitize("digest 0123456789abcdef0123456789abcdef");
        assert!(sanitized.contains("[REDACTED-KEY]"));

        let sanitized = sanitize("seed=QWxhZGRpbjpvcGVuIHNlc2FtZSB3aXRoIGxvbmcgc2VjcmV0");
        assert!(sanitized.contains("[REDACTED-SECRET]"));
    }

    #[test]
    fn test_truncates_large_inputs() {
        let sanitized = sanitize_with_limit("prefix MMSE=27 suffix", 10);
        assert!(sanitized.ends_with("[TRUNCATED]"));
        assert!(!sanitized.contains("suffix"));
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .map_err(|_| std::io::Error::other("poisoned"))?
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let sink = Sink::default();
        let handle = sink.clone();
        let make = SanitizingMakeWriter::new(move || handle.clone());
        {
            let mut writer = make.make_writer();
            writer.write_all(b"score MMSE=").expect("write");
            writer.write_all(b"22\nnext line\n").expect("write");
            writer.flush().expect("flush");
        }
        let out = String::from_utf8(sink.0.lock().expect("lock").clone()).expect("utf8");
        assert_eq!(out, "score MMSE=[REDACTED]\nnext line\n");
    }
}
