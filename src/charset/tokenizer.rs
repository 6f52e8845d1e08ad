// Multibyte tokenizer.
//
// Pulls bytes from a reader into a lookahead buffer no longer than the
// codeset's maximum width and decodes one character at a time. Each
// character is returned together with the exact bytes it was decoded from,
// so callers can pass payload through without re-encoding it.

use std::io::{self, ErrorKind, Read};

use thiserror::Error;

use super::{Decoded, Locale, MAX_WIDTH};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TokenizeError {
    #[error("illegal character encoding at byte offset {offset}")]
    InvalidEncoding { offset: u64 },
    #[error("incomplete multibyte character at end of input (byte offset {offset})")]
    TruncatedSequence { offset: u64 },
    #[error("error reading input: {0}")]
    Read(#[source] io::Error),
}

// ---------------------------------------------------------------------------
// Lookahead buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity byte buffer with an explicit fill count.
#[derive(Debug, Clone)]
struct Lookahead {
    buf: [u8; MAX_WIDTH],
    fill: usize,
}

impl Lookahead {
    fn new() -> Self {
        Self {
            buf: [0; MAX_WIDTH],
            fill: 0,
        }
    }

    fn len(&self) -> usize {
        self.fill
    }

    fn is_empty(&self) -> bool {
        self.fill == 0
    }

    fn filled(&self) -> &[u8] {
        &self.buf[..self.fill]
    }

    /// Unfilled space up to `limit` bytes of total content.
    fn spare(&mut self, limit: usize) -> &mut [u8] {
        &mut self.buf[self.fill..limit]
    }

    fn advance(&mut self, n: usize) {
        self.fill += n;
        debug_assert!(self.fill <= MAX_WIDTH);
    }

    /// Drop the first `n` bytes, shifting the rest to the front.
    fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.fill);
        self.buf.copy_within(n..self.fill, 0);
        self.fill -= n;
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// One decoded character and the bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codepoint<'a> {
    pub value: char,
    pub raw: &'a [u8],
}

impl Codepoint<'_> {
    /// Number of input bytes the character occupied.
    pub fn width(&self) -> usize {
        self.raw.len()
    }
}

/// Streaming multibyte decoder over any `Read`.
///
/// Reads in small pieces, so callers should hand it a buffered reader.
pub struct Tokenizer<R: Read> {
    reader: R,
    locale: Locale,
    lookahead: Lookahead,
    /// Width of the character handed out by the previous call, still
    /// sitting at the front of the lookahead.
    pending: usize,
    /// Input offset of the front of the lookahead.
    offset: u64,
    eof: bool,
}

impl<R: Read> Tokenizer<R> {
    /// Create a tokenizer reading `reader` with the codeset of `locale`.
    pub fn new(reader: R, locale: Locale) -> Self {
        Self {
            reader,
            locale,
            lookahead: Lookahead::new(),
            pending: 0,
            offset: 0,
            eof: false,
        }
    }

    /// The locale the input is decoded with.
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Total input bytes consumed by returned characters.
    pub fn bytes_consumed(&self) -> u64 {
        self.offset + self.pending as u64
    }

    /// Decode the next character, or `None` at end of input.
    pub fn next_codepoint(&mut self) -> Result<Option<Codepoint<'_>>, TokenizeError> {
        if self.pending > 0 {
            self.lookahead.consume(self.pending);
            self.offset += self.pending as u64;
            self.pending = 0;
        }
        self.fill()?;
        if self.lookahead.is_empty() {
            return Ok(None);
        }

        let offset = self.offset;
        let (value, width) = match self.locale.codeset().decode(self.lookahead.filled()) {
            // Zero-length decode: NUL, sized by the width measured for the
            // locale. Approximate for codesets where NUL's width depends on
            // shift state.
            Decoded::Char { value, len: 0 } => (value, self.locale.nul_width()),
            Decoded::Char { value, len } => (value, len),
            Decoded::Incomplete if self.eof => {
                return Err(TokenizeError::TruncatedSequence { offset });
            }
            Decoded::Incomplete | Decoded::Invalid => {
                return Err(TokenizeError::InvalidEncoding { offset });
            }
        };
        if width > self.lookahead.len() {
            return Err(TokenizeError::InvalidEncoding { offset });
        }

        self.pending = width;
        Ok(Some(Codepoint {
            value,
            raw: &self.lookahead.filled()[..width],
        }))
    }

    /// Top up the lookahead to the codeset's maximum width or end of input.
    fn fill(&mut self) -> Result<(), TokenizeError> {
        let limit = self.locale.max_width();
        while !self.eof && self.lookahead.len() < limit {
            match self.reader.read(self.lookahead.spare(limit)) {
                Ok(0) => self.eof = true,
                Ok(n) => self.lookahead.advance(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(TokenizeError::Read(e)),
            }
        }
        Ok(())
    }

    /// Release the reader. Bytes still in the lookahead are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Codeset;

    /// Hands out at most one byte per read, with an interruption before each.
    struct Trickle<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(ErrorKind::Interrupted, "again"));
            }
            match self.data.split_first() {
                Some((&b, rest)) if !buf.is_empty() => {
                    buf[0] = b;
                    self.data = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    struct Failing;

    impl Read for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    fn locale(codeset: Codeset) -> Locale {
        Locale::new(codeset).unwrap()
    }

    fn collect<R: Read>(tok: &mut Tokenizer<R>) -> Result<Vec<(char, Vec<u8>)>, TokenizeError> {
        let mut out = Vec::new();
        while let Some(cp) = tok.next_codepoint()? {
            out.push((cp.value, cp.raw.to_vec()));
        }
        Ok(out)
    }

    #[test]
    fn decodes_mixed_widths_with_raw_bytes() {
        let input = "a€ é".as_bytes();
        let mut tok = Tokenizer::new(input, locale(Codeset::Utf8));
        let got = collect(&mut tok).unwrap();
        assert_eq!(
            got,
            vec![
                ('a', b"a".to_vec()),
                ('€', "€".as_bytes().to_vec()),
                (' ', b" ".to_vec()),
                ('é', "é".as_bytes().to_vec()),
            ]
        );
        assert_eq!(tok.bytes_consumed(), input.len() as u64);
    }

    #[test]
    fn refills_across_short_reads() {
        let input = "x語\ny".as_bytes();
        let reader = Trickle {
            data: input,
            interrupt: false,
        };
        let mut tok = Tokenizer::new(reader, locale(Codeset::Utf8));
        let chars: Vec<char> = collect(&mut tok).unwrap().into_iter().map(|(c, _)| c).collect();
        assert_eq!(chars, vec!['x', '語', '\n', 'y']);
    }

    #[test]
    fn nul_uses_measured_width() {
        let mut tok = Tokenizer::new(&b"a\0b"[..], locale(Codeset::Utf8));
        let got = collect(&mut tok).unwrap();
        assert_eq!(got[1], ('\0', vec![0]));
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn truncated_sequence_at_end_of_input() {
        let mut tok = Tokenizer::new(&[b'o', b'k', 0xE2, 0x82][..], locale(Codeset::Utf8));
        assert_eq!(tok.next_codepoint().unwrap().unwrap().value, 'o');
        assert_eq!(tok.next_codepoint().unwrap().unwrap().value, 'k');
        match tok.next_codepoint() {
            Err(TokenizeError::TruncatedSequence { offset }) => assert_eq!(offset, 2),
            other => panic!("expected truncated sequence, got {other:?}"),
        }
    }

    #[test]
    fn invalid_sequence_with_input_remaining() {
        let mut tok = Tokenizer::new(&[b'a', 0xFF, b'b', b'c', b'd'][..], locale(Codeset::Utf8));
        tok.next_codepoint().unwrap();
        match tok.next_codepoint() {
            Err(TokenizeError::InvalidEncoding { offset }) => assert_eq!(offset, 1),
            other => panic!("expected invalid encoding, got {other:?}"),
        }
    }

    #[test]
    fn ascii_rejects_high_bytes() {
        let mut tok = Tokenizer::new(&[0xC3, 0xA9][..], locale(Codeset::Ascii));
        assert!(matches!(
            tok.next_codepoint(),
            Err(TokenizeError::InvalidEncoding { offset: 0 })
        ));
    }

    #[test]
    fn latin1_accepts_every_byte() {
        let input: Vec<u8> = (0..=255u8).collect();
        let mut tok = Tokenizer::new(&input[..], locale(Codeset::Latin1));
        let got = collect(&mut tok).unwrap();
        assert_eq!(got.len(), 256);
        assert!(got.iter().zip(&input).all(|((_, raw), b)| raw == &vec![*b]));
    }

    #[test]
    fn read_errors_are_not_end_of_input() {
        let mut tok = Tokenizer::new(Failing, locale(Codeset::Utf8));
        assert!(matches!(tok.next_codepoint(), Err(TokenizeError::Read(_))));
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut tok = Tokenizer::new(&b""[..], locale(Codeset::Utf8));
        assert!(tok.next_codepoint().unwrap().is_none());
        assert!(tok.next_codepoint().unwrap().is_none());
    }
}
