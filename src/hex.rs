// Byte-level hex dump and restore, one byte per line.
//
// Dump lines are two uppercase hex digits, optionally followed by a space
// and a display character. Restore reads two hex digits from each line and
// ignores whatever follows them.

use std::io::{self, BufRead, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HexError {
    #[error("input format syntax error on line {line}: expected two hex digits")]
    MalformedHexDigit { line: u64 },
    #[error("error reading input: {0}")]
    Read(#[source] io::Error),
    #[error("error writing output: {0}")]
    Write(#[source] io::Error),
}

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Character shown after the hex digits in annotated dumps.
fn display_char(byte: u8) -> u8 {
    if byte > 0x20 && byte < 0x7F { byte } else { b'.' }
}

fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).map(|v| v as u8)
}

/// Format one dump line into `line`, returning its length.
fn dump_line(byte: u8, annotate: bool, line: &mut [u8; 5]) -> usize {
    line[0] = DIGITS[usize::from(byte >> 4)];
    line[1] = DIGITS[usize::from(byte & 0x0F)];
    // The space byte would render as an invisible annotation.
    if annotate && byte != b' ' {
        line[2] = b' ';
        line[3] = display_char(byte);
        line[4] = b'\n';
        5
    } else {
        line[2] = b'\n';
        3
    }
}

/// Dump every byte of `reader`. Returns the number of bytes dumped.
pub fn dump<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    annotate: bool,
) -> Result<u64, HexError> {
    let mut count = 0u64;
    let mut line = [0u8; 5];
    loop {
        let chunk = match reader.fill_buf() {
            Ok([]) => break,
            Ok(chunk) => chunk,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(HexError::Read(e)),
        };
        for &byte in chunk {
            let len = dump_line(byte, annotate, &mut line);
            writer.write_all(&line[..len]).map_err(HexError::Write)?;
        }
        let n = chunk.len();
        reader.consume(n);
        count += n as u64;
    }
    Ok(count)
}

/// Byte cursor over a `BufRead` that keeps track of the line number.
struct Lines<'r, R: BufRead> {
    reader: &'r mut R,
    line: u64,
}

impl<R: BufRead> Lines<'_, R> {
    fn next_byte(&mut self) -> Result<Option<u8>, HexError> {
        let head = loop {
            match self.reader.fill_buf() {
                Ok(buf) => break buf.first().copied(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(HexError::Read(e)),
            }
        };
        let Some(byte) = head else {
            return Ok(None);
        };
        self.reader.consume(1);
        if byte == b'\n' {
            self.line += 1;
        }
        Ok(Some(byte))
    }

    /// Discard the rest of the current line, including its terminator.
    fn skip_line(&mut self) -> Result<(), HexError> {
        while let Some(byte) = self.next_byte()? {
            if byte == b'\n' {
                break;
            }
        }
        Ok(())
    }
}

/// Restore bytes from a hex dump. Returns the number of bytes written.
///
/// Leading whitespace before a line's digits, blank lines included, is
/// skipped. Both digit cases are accepted.
pub fn restore<R: BufRead, W: Write>(reader: &mut R, writer: &mut W) -> Result<u64, HexError> {
    let mut lines = Lines { reader, line: 1 };
    let mut count = 0u64;
    loop {
        let high = match lines.next_byte()? {
            None => break,
            Some(b) if b.is_ascii_whitespace() => continue,
            Some(b) => b,
        };
        let line = lines.line;
        let low = lines
            .next_byte()?
            .ok_or(HexError::MalformedHexDigit { line })?;
        let (Some(h), Some(l)) = (hex_value(high), hex_value(low)) else {
            return Err(HexError::MalformedHexDigit { line });
        };
        writer.write_all(&[(h << 4) | l]).map_err(HexError::Write)?;
        count += 1;
        lines.skip_line()?;
    }
    Ok(count)
}
