//! The editable `name=value` text form.
//!
//! Each record is one logical line, `<escaped name>=<escaped value>`. In
//! human mode a value newline is written as a backslash followed by a real
//! line break, so one logical line can span several physical lines. Because
//! every literal backslash is doubled, a single backslash at the end of a
//! physical line always means "continued", while `\\` at the end means the
//! value ends in a backslash.
//!
//! Parsing is lenient: a defective line is reported to the
//! [`DiagnosticSink`] and skipped, and the rest of the input is still read.

use crate::diag::{Diagnostic, DiagnosticSink, Location, NullSink, Severity};
use crate::error::{Error, Result};
use crate::escape::{self, EscapeMode};
use crate::record::Record;
use tracing::{debug, trace};

/// Parse text into records, reporting and skipping malformed lines.
///
/// A final line without a trailing newline is still a record. Blank lines
/// are ignored.
pub fn parse(text: &[u8], mut sink: impl DiagnosticSink) -> Vec<Record> {
    let mut records = Vec::new();
    let mut skipped = 0;

    for line in LogicalLines::new(text) {
        if line.text.is_empty() {
            continue;
        }
        match parse_line(&line.text) {
            Ok(record) => {
                trace!("Line {}: {}", line.number, record);
                records.push(record);
            }
            Err(err) => {
                skipped += 1;
                sink.report(Diagnostic::skipped_line(line.number, &err));
            }
        }
    }

    debug!("Parsed {} records, skipped {} lines", records.len(), skipped);
    records
}

/// Split one logical line at its first unescaped `=` and decode both halves
fn parse_line(line: &[u8]) -> Result<Record> {
    let split = find_separator(line).ok_or(Error::MissingEquals)?;
    let (name, value) = (&line[..split], &line[split + 1..]);
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let name = escape::decode(name).map_err(|e| in_part("name", e))?;
    let value = escape::decode(value).map_err(|e| in_part("value", e))?;
    Ok(Record { name, value })
}

fn in_part(part: &str, err: Error) -> Error {
    match err {
        Error::InvalidEscape { offset, details } => Error::InvalidEscape {
            offset,
            details: format!("{} in {}", details, part),
        },
        other => other,
    }
}

fn find_separator(line: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i < line.len() {
        match line[i] {
            b'\\' => i += 2,
            b'=' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// A logical line with continuations folded into `\n` escapes
#[derive(Debug, PartialEq, Eq)]
struct LogicalLine {
    /// Physical line the logical line starts on, 1-based
    number: usize,
    text: Vec<u8>,
}

/// Iterator over logical lines.
///
/// Escape pairs are consumed two bytes at a time, which is what keeps `\\`
/// followed by a line break from being read as a continuation.
struct LogicalLines<'a> {
    input: &'a [u8],
    pos: usize,
    physical: usize,
}

impl<'a> LogicalLines<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            physical: 1,
        }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<LogicalLine> {
        if self.pos >= self.input.len() {
            return None;
        }

        let number = self.physical;
        let mut text = Vec::new();

        while self.pos < self.input.len() {
            let byte = self.input[self.pos];
            match byte {
                b'\n' => {
                    self.pos += 1;
                    self.physical += 1;
                    break;
                }
                b'\\' => match self.input.get(self.pos + 1) {
                    Some(b'\n') => {
                        text.extend_from_slice(b"\\n");
                        self.pos += 2;
                        self.physical += 1;
                    }
                    Some(&next) => {
                        text.extend_from_slice(&[b'\\', next]);
                        self.pos += 2;
                    }
                    None => {
                        text.push(b'\\');
                        self.pos += 1;
                    }
                },
                _ => {
                    text.push(byte);
                    self.pos += 1;
                }
            }
        }

        Some(LogicalLine { number, text })
    }
}

/// Configuration for rendering records as text
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// How value newlines are written
    pub mode: EscapeMode,
    /// Maximum escaped name length (`None` = unlimited)
    pub name_limit: Option<usize>,
    /// Maximum escaped value length (`None` = unlimited)
    pub value_limit: Option<usize>,
}

impl RenderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the escape mode for values
    pub fn mode(mut self, mode: EscapeMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the maximum escaped name length
    pub fn name_limit(mut self, limit: usize) -> Self {
        self.name_limit = Some(limit);
        self
    }

    /// Sets the maximum escaped value length
    pub fn value_limit(mut self, limit: usize) -> Self {
        self.value_limit = Some(limit);
        self
    }
}

/// Renders records as `name=value` lines
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    /// Creates a renderer with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom configuration
    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render all records.
    ///
    /// Names are always escaped in Full mode. Records whose content needed
    /// escaping are reported as [`Severity::Info`]; content cut off by a
    /// configured limit is reported as [`Severity::Warning`] and the shortened
    /// text is still written.
    pub fn render(&self, records: &[Record], mut sink: impl DiagnosticSink) -> String {
        let mut out = String::new();
        for (index, record) in records.iter().enumerate() {
            self.render_record(&mut out, index + 1, record, &mut sink);
        }
        out
    }

    fn render_record(
        &self,
        out: &mut String,
        number: usize,
        record: &Record,
        sink: &mut impl DiagnosticSink,
    ) {
        let location = Location::Record(number);
        let name = escape::encode_name(&record.name, self.config.name_limit);
        let value = escape::encode_bounded(self.config.mode, &record.value, self.config.value_limit);

        if name.is_truncated(record.name.len()) {
            sink.report(Diagnostic::new(
                Severity::Warning,
                location,
                format!("cannot copy entire name {}", name.text),
            ));
        } else if name.needed_escaping() {
            sink.report(Diagnostic::new(
                Severity::Info,
                location,
                format!("name {} contains non-printable characters", name.text),
            ));
        }

        if value.is_truncated(record.value.len()) {
            sink.report(Diagnostic::new(
                Severity::Warning,
                location,
                format!(
                    "name {}: cannot copy entire value ({} of {} bytes)",
                    name.text,
                    value.consumed,
                    record.value.len()
                ),
            ));
        } else if value.needed_escaping() {
            sink.report(Diagnostic::new(
                Severity::Info,
                location,
                format!("name {}: value contains escaped characters", name.text),
            ));
        }

        out.push_str(&name.text);
        out.push('=');
        out.push_str(&value.text);
        out.push('\n');
    }
}

/// Render records without limits, discarding diagnostics
pub fn render(records: &[Record], mode: EscapeMode) -> String {
    Renderer::with_config(RenderConfig::new().mode(mode)).render(records, NullSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(text: &[u8]) -> Vec<Record> {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let records = parse(text, &mut diagnostics);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        records
    }

    #[test]
    fn test_render_full() {
        let records = vec![Record::new("wl_ssid", b"MyNet\x01".to_vec())];
        assert_eq!(render(&records, EscapeMode::Full), "wl_ssid=MyNet\\x01\n");
    }

    #[test]
    fn test_render_human_multiline() {
        let records = vec![Record::new("motd", "line1\nline2")];
        let text = render(&records, EscapeMode::Human);
        assert_eq!(text, "motd=line1\\\nline2\n");
        assert_eq!(parse_ok(text.as_bytes()), records);
    }

    #[test]
    fn test_names_always_full_mode() {
        let records = vec![Record::new("odd\nname", "a\nb")];
        assert_eq!(render(&records, EscapeMode::Human), "odd\\nname=a\\\nb\n");
    }

    #[test]
    fn test_parse_basic() {
        let records = parse_ok(b"a=1\nb=two=2\nc=\n");
        assert_eq!(
            records,
            vec![
                Record::new("a", "1"),
                Record::new("b", "two=2"),
                Record::new("c", ""),
            ]
        );
    }

    #[test]
    fn test_parse_last_line_without_newline() {
        assert_eq!(parse_ok(b"a=1\nb=2"), vec![Record::new("a", "1"), Record::new("b", "2")]);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        assert_eq!(parse_ok(b"\n\na=1\n\n"), vec![Record::new("a", "1")]);
    }

    #[test]
    fn test_double_backslash_before_newline_ends_value() {
        let records = parse_ok(b"a=ends\\\\\nb=2\n");
        assert_eq!(records, vec![Record::new("a", "ends\\"), Record::new("b", "2")]);
    }

    #[test]
    fn test_triple_backslash_before_newline_continues() {
        let records = parse_ok(b"a=x\\\\\\\ny\n");
        assert_eq!(records, vec![Record::new("a", "x\\\ny")]);
    }

    #[test]
    fn test_continuation_then_equals_stays_in_value() {
        let records = parse_ok(b"a=first\\\nk=v\n");
        assert_eq!(records, vec![Record::new("a", "first\nk=v")]);
    }

    #[test]
    fn test_escaped_equals_in_name() {
        let records = vec![Record::new("a=b", "c=d")];
        let text = render(&records, EscapeMode::Full);
        assert_eq!(text, "a\\x3Db=c=d\n");
        assert_eq!(parse_ok(text.as_bytes()), records);
        assert_eq!(parse_ok(b"x\\=y=z"), vec![Record::new("x=y", "z")]);
    }

    #[test]
    fn test_missing_equals_is_skipped() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let records = parse(b"a=1\nno separator\nb=2\n", &mut diagnostics);

        assert_eq!(records, vec![Record::new("a", "1"), Record::new("b", "2")]);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::skipped_line(2, &Error::MissingEquals)]
        );
    }

    #[test]
    fn test_empty_name_and_bad_escape_are_skipped() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let records = parse(b"=orphan\nbad=\\xZ1\nok=1\n", &mut diagnostics);

        assert_eq!(records, vec![Record::new("ok", "1")]);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0], Diagnostic::skipped_line(1, &Error::EmptyName));
        assert_eq!(diagnostics[1].location, Location::Line(2));
        assert!(diagnostics[1].message.contains("in value"));
    }

    #[test]
    fn test_line_numbers_count_physical_lines() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        parse(b"a=1\\\n2\\\n3\nbroken\n", &mut diagnostics);
        assert_eq!(diagnostics[0].location, Location::Line(4));
    }

    #[test]
    fn test_render_reports_escaping() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let records = vec![
            Record::new("plain", "value"),
            Record::new("bin\x01", "v"),
            Record::new("x", "tab\t"),
        ];
        Renderer::new().render(&records, &mut diagnostics);

        let infos: Vec<_> = diagnostics.iter().map(|d| (d.severity, d.location)).collect();
        assert_eq!(
            infos,
            vec![
                (Severity::Info, Location::Record(2)),
                (Severity::Info, Location::Record(3)),
            ]
        );
        assert!(diagnostics[0].message.contains("bin\\x01"));
    }

    #[test]
    fn test_render_reports_truncation() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let records = vec![Record::new("k", "0123456789")];
        let renderer = Renderer::with_config(RenderConfig::new().value_limit(4));
        let text = renderer.render(&records, &mut diagnostics);

        assert_eq!(text, "k=0123\n");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
        assert!(diagnostics[0].message.contains("4 of 10 bytes"));
    }

    #[test]
    fn test_logical_lines() {
        let lines: Vec<_> = LogicalLines::new(b"a\\\nb\nc").collect();
        assert_eq!(
            lines,
            vec![
                LogicalLine {
                    number: 1,
                    text: b"a\\nb".to_vec()
                },
                LogicalLine {
                    number: 3,
                    text: b"c".to_vec()
                },
            ]
        );
    }
}
