//! Whole-buffer conversions in both directions.

use crate::diag::DiagnosticSink;
use crate::error::Result;
use crate::image;
use crate::text::{self, RenderConfig, Renderer};

/// Convert a binary image to text.
///
/// Fails without output if the image is malformed; per-record notes go to
/// `sink`.
pub fn dump(data: &[u8], config: &RenderConfig, sink: impl DiagnosticSink) -> Result<String> {
    let records = image::read(data)?;
    Ok(Renderer::with_config(config.clone()).render(&records, sink))
}

/// Convert text to a binary image.
///
/// Malformed lines are reported to `sink` and left out of the image. The
/// record count in the header covers only the records actually written.
pub fn build(text: &[u8], sink: impl DiagnosticSink) -> Result<Vec<u8>> {
    let records = text::parse(text, sink);
    image::write(&records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Diagnostic, NullSink};
    use crate::escape::EscapeMode;
    use crate::record::Record;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dump_then_build() {
        let records = vec![
            Record::new("wl_ssid", b"MyNet\x01".to_vec()),
            Record::new("rc_startup", "#!/bin/sh\necho \\o/\n"),
        ];
        let data = image::write(&records).unwrap();

        for mode in [EscapeMode::Full, EscapeMode::Human] {
            let text = dump(&data, &RenderConfig::new().mode(mode), NullSink).unwrap();
            assert_eq!(build(text.as_bytes(), NullSink).unwrap(), data);
        }
    }

    #[test]
    fn test_build_counts_only_written_records() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let data = build(b"a=1\ngarbage\nb=2\n", &mut diagnostics).unwrap();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(&data[6..8], &[2, 0]);
    }

    #[test]
    fn test_dump_rejects_bad_header() {
        let err = dump(b"NOT-DD\x00\x00", &RenderConfig::default(), NullSink).unwrap_err();
        assert!(err.is_header_error());
    }
}
