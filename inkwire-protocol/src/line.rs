//! Line assembly for the text protocol.
//!
//! Bytes arrive from the link in arbitrary pieces. [`LineAssembler`] turns
//! them into trimmed lines; [`LineReader`] drives an assembler from a
//! [`Link`] without ever blocking on an empty link.

use heapless::Vec;
use inkwire_hal::Link;

use crate::CHUNK_HEX_LEN;

/// Longest line accepted (a full chunk plus slack for `\r` and stray spaces)
pub const MAX_LINE_LEN: usize = CHUNK_HEX_LEN + 76;

/// Bytes pulled from the link per read
const READ_SIZE: usize = 64;

/// One received line, trimmed, never empty
pub type Line<const N: usize = MAX_LINE_LEN> = Vec<u8, N>;

/// Errors that can occur during line assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded the assembler capacity; the rest of it is skipped
    TooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblyState {
    /// Collecting bytes of the current line
    Collecting,
    /// Skipping the tail of an overlong line until the next `\n`
    Discarding,
}

/// State machine turning a byte stream into lines
#[derive(Debug, Clone)]
pub struct LineAssembler<const N: usize = MAX_LINE_LEN> {
    state: AssemblyState,
    buffer: Vec<u8, N>,
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineAssembler<N> {
    /// Create a new assembler
    pub fn new() -> Self {
        Self {
            state: AssemblyState::Collecting,
            buffer: Vec::new(),
        }
    }

    /// Drop any partial line
    pub fn reset(&mut self) {
        self.state = AssemblyState::Collecting;
        self.buffer.clear();
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(line))` when a nonblank line completes, `Ok(None)`
    /// when more bytes are needed or the line was blank, and `Err` once per
    /// overlong line.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line<N>>, LineError> {
        match self.state {
            AssemblyState::Discarding => {
                if byte == b'\n' {
                    self.state = AssemblyState::Collecting;
                }
                Ok(None)
            }
            AssemblyState::Collecting => {
                if byte == b'\n' {
                    let line = trim(&self.buffer);
                    // A trimmed slice always fits in the same capacity
                    let line = (!line.is_empty()).then(|| Vec::from_slice(line).ok()).flatten();
                    self.buffer.clear();
                    return Ok(line);
                }
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    self.state = AssemblyState::Discarding;
                    return Err(LineError::TooLong);
                }
                Ok(None)
            }
        }
    }
}

/// Strip ASCII whitespace (including `\r`) from both ends
pub fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Outcome of one non-blocking read attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinePoll<const N: usize = MAX_LINE_LEN> {
    /// A complete nonblank line
    Line(Line<N>),
    /// A line was too long and is being skipped
    TooLong,
    /// Nothing complete yet
    Empty,
}

/// Pulls lines from a [`Link`]
///
/// Bytes read past the end of a line stay buffered for the next poll, so
/// several lines arriving in one read are all delivered in order.
#[derive(Debug, Clone)]
pub struct LineReader<const N: usize = MAX_LINE_LEN> {
    assembler: LineAssembler<N>,
    pending: [u8; READ_SIZE],
    start: usize,
    end: usize,
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineReader<N> {
    /// Create a reader with nothing buffered
    pub fn new() -> Self {
        Self {
            assembler: LineAssembler::new(),
            pending: [0; READ_SIZE],
            start: 0,
            end: 0,
        }
    }

    /// Return the next complete line if one can be assembled from what the
    /// link already holds
    pub fn poll_line<L: Link>(&mut self, link: &mut L) -> Result<LinePoll<N>, L::Error> {
        loop {
            while self.start < self.end {
                let byte = self.pending[self.start];
                self.start += 1;
                match self.assembler.feed(byte) {
                    Ok(Some(line)) => return Ok(LinePoll::Line(line)),
                    Ok(None) => {}
                    Err(LineError::TooLong) => return Ok(LinePoll::TooLong),
                }
            }

            if !link.input_ready()? {
                return Ok(LinePoll::Empty);
            }
            let n = link.read(&mut self.pending)?;
            self.start = 0;
            self.end = n;
            if n == 0 {
                return Ok(LinePoll::Empty);
            }
        }
    }

    /// Throw away buffered bytes and everything the link currently holds
    pub fn discard_input<L: Link>(&mut self, link: &mut L) -> Result<usize, L::Error> {
        let mut dropped = self.end - self.start;
        self.start = 0;
        self.end = 0;
        self.assembler.reset();
        while link.input_ready()? {
            let n = link.read(&mut self.pending)?;
            if n == 0 {
                break;
            }
            dropped += n;
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Link whose input arrives in fixed-size pieces
    struct PieceLink {
        input: VecDeque<u8>,
        piece: usize,
    }

    impl PieceLink {
        fn new(input: &[u8], piece: usize) -> Self {
            Self {
                input: input.iter().copied().collect(),
                piece,
            }
        }
    }

    impl Link for PieceLink {
        type Error = ();

        fn input_ready(&mut self) -> Result<bool, ()> {
            Ok(!self.input.is_empty())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let n = buf.len().min(self.piece).min(self.input.len());
            for slot in &mut buf[..n] {
                *slot = self.input.pop_front().unwrap();
            }
            Ok(n)
        }

        fn write_all(&mut self, _data: &[u8]) -> Result<(), ()> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    fn feed_all<const N: usize>(assembler: &mut LineAssembler<N>, bytes: &[u8]) -> Vec<Line<N>, 8> {
        let mut lines = Vec::new();
        for &b in bytes {
            if let Ok(Some(line)) = assembler.feed(b) {
                lines.push(line).unwrap();
            }
        }
        lines
    }

    #[test]
    fn test_assembler_strips_cr_and_spaces() {
        let mut assembler = LineAssembler::<32>::new();
        let lines = feed_all(&mut assembler, b"  CAN_SEND \r\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(&lines[0][..], b"CAN_SEND");
    }

    #[test]
    fn test_assembler_skips_blank_lines() {
        let mut assembler = LineAssembler::<32>::new();
        let lines = feed_all(&mut assembler, b"\n\r\n   \nOK\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(&lines[0][..], b"OK");
    }

    #[test]
    fn test_assembler_discards_overlong_line() {
        let mut assembler = LineAssembler::<4>::new();
        let mut errors = 0;
        let mut lines = std::vec::Vec::new();
        for &b in b"abcdefgh\nOK\n" {
            match assembler.feed(b) {
                Ok(Some(line)) => lines.push(line),
                Ok(None) => {}
                Err(LineError::TooLong) => errors += 1,
            }
        }
        assert_eq!(errors, 1);
        assert_eq!(lines.len(), 1);
        assert_eq!(&lines[0][..], b"OK");
    }

    #[test]
    fn test_trim_all_whitespace() {
        assert_eq!(trim(b" \r\t "), b"");
        assert_eq!(trim(b"x"), b"x");
    }

    #[test]
    fn test_reader_keeps_bytes_past_line_end() {
        let mut link = PieceLink::new(b"YES\nOK\nDONE\n", 64);
        let mut reader = LineReader::<32>::new();

        let mut got = std::vec::Vec::new();
        while let LinePoll::Line(line) = reader.poll_line(&mut link).unwrap() {
            got.push(std::string::String::from_utf8(line.to_vec()).unwrap());
        }
        assert_eq!(got, ["YES", "OK", "DONE"]);
    }

    #[test]
    fn test_reader_joins_split_line() {
        let mut link = PieceLink::new(b"CAN_", 3);
        let mut reader = LineReader::<32>::new();
        assert_eq!(reader.poll_line(&mut link).unwrap(), LinePoll::Empty);

        link.input.extend(b"SEND\n");
        match reader.poll_line(&mut link).unwrap() {
            LinePoll::Line(line) => assert_eq!(&line[..], b"CAN_SEND"),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn test_reader_discard_input() {
        let mut link = PieceLink::new(b"ERR:TIMEOUT\nDONE\npartial", 5);
        let mut reader = LineReader::<32>::new();
        let _ = reader.poll_line(&mut link).unwrap();

        reader.discard_input(&mut link).unwrap();
        assert!(link.input.is_empty());
        assert_eq!(reader.poll_line(&mut link).unwrap(), LinePoll::Empty);
    }
}
