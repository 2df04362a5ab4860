//! Tab-separated record tokenizer for dump members
//!
//! Turns a byte stream into a lazy sequence of [`Record`]s, one per line.
//! Lines are split on `\n`; a trailing `\r` is dropped. A final line
//! without a terminator is still yielded. Lines that are not valid UTF-8
//! are skipped and counted, never fatal.

use std::io::{self, BufRead};
use std::iter::FusedIterator;
use std::str::Split;
use tracing::trace;

/// One line of a dump member, split on tabs on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: String,
}

impl Record {
    pub fn new(line: impl Into<String>) -> Self {
        Self { line: line.into() }
    }

    /// Fields in column order
    pub fn fields(&self) -> Split<'_, char> {
        self.line.split('\t')
    }

    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields().nth(index)
    }

    pub fn field_count(&self) -> usize {
        self.fields().count()
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }
}

impl From<&str> for Record {
    fn from(line: &str) -> Self {
        Record::new(line)
    }
}

/// Lazy, non-restartable record sequence over a buffered reader
///
/// I/O errors are yielded once and end the sequence.
pub struct TsvRecords<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
    undecodable_lines: u64,
    done: bool,
}

impl<R: BufRead> TsvRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(512),
            lines_read: 0,
            undecodable_lines: 0,
            done: false,
        }
    }

    /// Physical lines consumed, including undecodable ones
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Lines skipped because they were not valid UTF-8
    pub fn undecodable_lines(&self) -> u64 {
        self.undecodable_lines
    }
}

impl<R: BufRead> Iterator for TsvRecords<R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
            self.lines_read += 1;

            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
            }
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }

            match std::str::from_utf8(&self.buf) {
                Ok(line) => return Some(Ok(Record::new(line))),
                Err(e) => {
                    self.undecodable_lines += 1;
                    trace!("Skipping undecodable line {}: {}", self.lines_read, e);
                }
            }
        }
        None
    }
}

impl<R: BufRead> FusedIterator for TsvRecords<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(bytes: &[u8]) -> (Vec<String>, TsvRecords<Cursor<Vec<u8>>>) {
        let mut records = TsvRecords::new(Cursor::new(bytes.to_vec()));
        let lines = records
            .by_ref()
            .map(|r| r.unwrap().as_str().to_string())
            .collect();
        (lines, records)
    }

    #[test]
    fn test_splits_fields_on_tabs() {
        let record = Record::from("1\t500\tUSA1234567\textra");
        assert_eq!(record.field_count(), 4);
        assert_eq!(record.field(1), Some("500"));
        assert_eq!(record.field(2), Some("USA1234567"));
        assert_eq!(record.field(4), None);
    }

    #[test]
    fn test_empty_trailing_fields_are_kept() {
        let record = Record::from("500\tabc\t\t");
        assert_eq!(record.field_count(), 4);
        assert_eq!(record.field(3), Some(""));
    }

    #[test]
    fn test_final_line_without_terminator() {
        let (lines, records) = collect(b"a\tb\nc\td");
        assert_eq!(lines, vec!["a\tb", "c\td"]);
        assert_eq!(records.lines_read(), 2);
    }

    #[test]
    fn test_crlf_terminators_stripped() {
        let (lines, _) = collect(b"a\tb\r\nc\td\r\n");
        assert_eq!(lines, vec!["a\tb", "c\td"]);
    }

    #[test]
    fn test_undecodable_line_skipped_and_counted() {
        let (lines, records) = collect(b"ok\t1\n\xff\xfe\tbad\nok\t2\n");
        assert_eq!(lines, vec!["ok\t1", "ok\t2"]);
        assert_eq!(records.undecodable_lines(), 1);
        assert_eq!(records.lines_read(), 3);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let (lines, records) = collect(b"");
        assert!(lines.is_empty());
        assert_eq!(records.lines_read(), 0);
    }

    #[test]
    fn test_read_error_ends_sequence() {
        struct Failing;
        impl io::Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::InvalidData, "bad block"))
            }
        }

        let mut records = TsvRecords::new(io::BufReader::new(Failing));
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }
}
