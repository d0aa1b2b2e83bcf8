//! Forward-only line source with explicit section boundaries.
//!
//! Wraps the input stream and turns every data-row read into a
//! [`ReadOutcome`], so the aggregation loop ends on a designed state
//! instead of on whatever error a read happens to raise.

use crate::constants::DOC_LINE_MARKER;
use crate::error::{PostError, Result};
use crate::record::{DecodedRecord, decode};
use crate::schema::Schema;
use std::io::{self, BufRead};
use std::iter::Peekable;
use tracing::debug;

/// Result of asking for the next data row
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    /// A decoded data row
    Row(DecodedRecord),
    /// The next line opens a new section; it is left unread
    SectionEnd,
    /// No lines remain
    StreamEnd,
    /// The line could not be decoded (it has been consumed)
    Malformed(String),
}

/// Lines of a byte stream, with invalid UTF-8 replaced by U+FFFD
struct LossyLines<R> {
    reader: R,
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                Some(Ok(match String::from_utf8(buf) {
                    Ok(line) => line,
                    Err(e) => {
                        debug!("Replacing invalid UTF-8 in line: {}", e.utf8_error());
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Sequential reader over an AERMOD output stream
pub struct LineSource<R: BufRead> {
    lines: Peekable<LossyLines<R>>,
    line_number: usize,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: LossyLines { reader }.peekable(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// True if no further line can be read
    pub fn at_end(&mut self) -> bool {
        self.lines.peek().is_none()
    }

    /// True if the next line is a `*` documentation line
    pub fn at_section_start(&mut self) -> bool {
        matches!(
            self.lines.peek(),
            Some(Ok(line)) if line.starts_with(DOC_LINE_MARKER)
        )
    }

    /// Consume lines that hold nothing but whitespace, returning how many
    pub fn skip_blank_lines(&mut self) -> usize {
        let mut skipped = 0;
        while matches!(self.lines.peek(), Some(Ok(line)) if line.trim().is_empty()) {
            self.lines.next();
            self.line_number += 1;
            skipped += 1;
        }
        skipped
    }

    /// Next raw line, or [`PostError::StreamExhausted`]
    pub fn next_line(&mut self) -> Result<String> {
        match self.lines.next() {
            Some(Ok(line)) => {
                self.line_number += 1;
                Ok(line)
            }
            Some(Err(e)) => {
                self.line_number += 1;
                Err(PostError::Io(e))
            }
            None => Err(PostError::StreamExhausted),
        }
    }

    /// Read and decode the next data row.
    ///
    /// Blank lines followed by the end of the stream or a new section are
    /// part of that boundary; blank lines followed by more data are not.
    pub fn next_row(&mut self, schema: &Schema, century: i32) -> ReadOutcome {
        let blank = self.skip_blank_lines();
        if self.at_end() {
            return ReadOutcome::StreamEnd;
        }
        if self.at_section_start() {
            return ReadOutcome::SectionEnd;
        }
        if blank > 0 {
            return ReadOutcome::Malformed(format!(
                "line {}: blank line between data rows",
                self.line_number
            ));
        }

        match self.next_line() {
            Ok(line) => match decode(schema, &line, century) {
                Ok(record) => ReadOutcome::Row(record),
                Err(e) => {
                    debug!("Line {}: {}", self.line_number, e);
                    ReadOutcome::Malformed(format!("line {}: {}", self.line_number, e))
                }
            },
            Err(PostError::StreamExhausted) => ReadOutcome::StreamEnd,
            Err(e) => ReadOutcome::Malformed(format!("line {}: {}", self.line_number, e)),
        }
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_line() {
            Err(PostError::StreamExhausted) => None,
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn grf_row(x: f64, y: f64, conc: f64) -> String {
        format!(
            " {:13.5} {:13.5} {:13.5} {:8.2} {:8.2} {:8.2}   {:<5}  {:<8} {:>9}  {:<8}",
            x, y, conc, 0.0, 0.0, 0.0, "1-HR", "ALL", 1, "GRID"
        )
    }

    #[test]
    fn test_row_then_section_end_then_stream_end() {
        let text = format!("{}\n* next section\n", grf_row(1.0, 2.0, 3.0));
        let mut source = LineSource::new(Cursor::new(text));
        let schema = Schema::grf();

        match source.next_row(&schema, 20) {
            ReadOutcome::Row(record) => assert_eq!(record.conc, 3.0),
            other => panic!("expected a row, got {:?}", other),
        }
        assert_eq!(source.next_row(&schema, 20), ReadOutcome::SectionEnd);
        // the boundary line is not consumed
        assert_eq!(source.next_line().unwrap(), "* next section");
        assert_eq!(source.next_row(&schema, 20), ReadOutcome::StreamEnd);
        assert_eq!(source.line_number(), 2);
    }

    #[test]
    fn test_short_row_is_reported_as_malformed() {
        let mut source = LineSource::new(Cursor::new("  100.0  200.0\n"));
        match source.next_row(&Schema::grf(), 20) {
            ReadOutcome::Malformed(reason) => assert!(reason.starts_with("line 1:")),
            other => panic!("expected malformed, got {:?}", other),
        }
        assert!(source.at_end());
    }

    #[test]
    fn test_crlf_line_endings() {
        let text = format!("{}\r\n", grf_row(1.0, 2.0, 4.5));
        let mut source = LineSource::new(Cursor::new(text));
        assert!(matches!(
            source.next_row(&Schema::grf(), 20),
            ReadOutcome::Row(DecodedRecord { conc, .. }) if conc == 4.5
        ));
    }

    #[test]
    fn test_trailing_blank_lines_end_the_stream() {
        let text = format!("{}\n\n   \n\t\n", grf_row(1.0, 2.0, 3.0));
        let mut source = LineSource::new(Cursor::new(text));
        let schema = Schema::grf();

        assert!(matches!(source.next_row(&schema, 20), ReadOutcome::Row(_)));
        assert_eq!(source.next_row(&schema, 20), ReadOutcome::StreamEnd);
        assert_eq!(source.line_number(), 4);
    }

    #[test]
    fn test_blank_lines_before_next_section() {
        let text = format!("{}\n \n* next section\n", grf_row(1.0, 2.0, 3.0));
        let mut source = LineSource::new(Cursor::new(text));
        let schema = Schema::grf();

        assert!(matches!(source.next_row(&schema, 20), ReadOutcome::Row(_)));
        assert_eq!(source.next_row(&schema, 20), ReadOutcome::SectionEnd);
        assert_eq!(source.next_line().unwrap(), "* next section");
    }

    #[test]
    fn test_blank_line_between_rows_is_malformed() {
        let text = format!("{}\n\n{}\n", grf_row(1.0, 2.0, 3.0), grf_row(4.0, 5.0, 6.0));
        let mut source = LineSource::new(Cursor::new(text));
        let schema = Schema::grf();

        assert!(matches!(source.next_row(&schema, 20), ReadOutcome::Row(_)));
        match source.next_row(&schema, 20) {
            ReadOutcome::Malformed(reason) => assert!(reason.starts_with("line 2:")),
            other => panic!("expected malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut bytes = b"* caf".to_vec();
        bytes.push(0xB5);
        bytes.extend_from_slice(b" run\nnext\n");
        let mut source = LineSource::new(Cursor::new(bytes));

        assert_eq!(source.next_line().unwrap(), "* caf\u{FFFD} run");
        assert_eq!(source.next_line().unwrap(), "next");
        assert!(source.at_end());
    }

    #[test]
    fn test_iterator_stops_at_exhaustion() {
        let source = LineSource::new(Cursor::new("a\nb\n"));
        let lines: Vec<String> = source.map(|l| l.unwrap()).collect();
        assert_eq!(lines, vec!["a", "b"]);

        let mut empty = LineSource::new(Cursor::new(""));
        assert!(matches!(empty.next_line(), Err(PostError::StreamExhausted)));
    }
}
