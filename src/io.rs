// Stream-level driver for all eight modes.
//
// Wraps the tokenizer/encoder/decoder and the hex codec with buffered I/O,
// counts bytes in both directions, and flushes the output exactly once when
// the pass completes. A failed flush is reported separately from a failed
// write.

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::charset::{Locale, Tokenizer};
use crate::hex::{self, HexError};
use crate::tagged::decoder::{self, DecodeError, TagDecoder};
use crate::tagged::encoder::{self, EncodeError, TagEncoder};
use crate::tagged::Layout;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// One of the eight transcoding modes, named by its command-line letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// `w`: encode, word-split layout.
    #[default]
    EncodeWords,
    /// `c`: encode, compact layout.
    EncodeCompact,
    /// `W`: decode output of `w`.
    DecodeWords,
    /// `C`: decode output of `c`.
    DecodeCompact,
    /// `x`: hex dump with display characters.
    HexDumpAnnotated,
    /// `b`: plain hex dump.
    HexDumpPlain,
    /// `X`: restore output of `x`.
    HexRestoreAnnotated,
    /// `B`: restore output of `b`.
    HexRestorePlain,
}

impl Mode {
    pub const ALL: [Mode; 8] = [
        Mode::EncodeWords,
        Mode::EncodeCompact,
        Mode::DecodeWords,
        Mode::DecodeCompact,
        Mode::HexDumpAnnotated,
        Mode::HexDumpPlain,
        Mode::HexRestoreAnnotated,
        Mode::HexRestorePlain,
    ];

    /// The mode selected by a command-line letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.letter() == letter)
    }

    /// The command-line letter selecting this mode.
    pub fn letter(self) -> char {
        match self {
            Self::EncodeWords => 'w',
            Self::EncodeCompact => 'c',
            Self::DecodeWords => 'W',
            Self::DecodeCompact => 'C',
            Self::HexDumpAnnotated => 'x',
            Self::HexDumpPlain => 'b',
            Self::HexRestoreAnnotated => 'X',
            Self::HexRestorePlain => 'B',
        }
    }

    /// The mode that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::EncodeWords => Self::DecodeWords,
            Self::EncodeCompact => Self::DecodeCompact,
            Self::DecodeWords => Self::EncodeWords,
            Self::DecodeCompact => Self::EncodeCompact,
            Self::HexDumpAnnotated => Self::HexRestoreAnnotated,
            Self::HexDumpPlain => Self::HexRestorePlain,
            Self::HexRestoreAnnotated => Self::HexDumpAnnotated,
            Self::HexRestorePlain => Self::HexDumpPlain,
        }
    }

    /// Whether the mode tokenizes its input with the locale.
    pub fn uses_locale(self) -> bool {
        matches!(
            self,
            Self::EncodeWords | Self::EncodeCompact | Self::DecodeWords | Self::DecodeCompact
        )
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EncodeWords => "encode (word-split)",
            Self::EncodeCompact => "encode (compact)",
            Self::DecodeWords => "decode (word-split)",
            Self::DecodeCompact => "decode (compact)",
            Self::HexDumpAnnotated => "hex dump (annotated)",
            Self::HexDumpPlain => "hex dump (plain)",
            Self::HexRestoreAnnotated => "hex restore (annotated)",
            Self::HexRestorePlain => "hex restore (plain)",
        };
        write!(f, "-{} {name}", self.letter())
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `transcode()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Input bytes consumed.
    pub bytes_in: u64,
    /// Output bytes written.
    pub bytes_out: u64,
    /// Characters processed (zero for hex modes).
    pub codepoints: u64,
    /// Tagged lines emitted or consumed (zero for hex modes).
    pub lines: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for a whole transcoding run.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("could not open file \"{}\": {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error flushing output: {0}")]
    Flush(#[source] io::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Hex(#[from] HexError),
}

impl IoError {
    /// The message as raw bytes; see `DecodeError::diagnostic`.
    pub fn diagnostic(&self) -> Vec<u8> {
        match self {
            Self::Decode(e) => e.diagnostic(),
            other => other.to_string().into_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Counting adapters
// ---------------------------------------------------------------------------

struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// transcode
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

/// Run one pass of `mode` from `reader` to `writer`.
///
/// Both sides are buffered internally. The output is flushed once, after the
/// last byte has been produced.
pub fn transcode<R: Read, W: Write>(
    mode: Mode,
    locale: Locale,
    reader: R,
    writer: W,
) -> Result<Stats, IoError> {
    log::debug!("mode {mode}, locale {}", locale.codeset());

    let mut input = BufReader::with_capacity(
        BUF_SIZE,
        CountingReader {
            inner: reader,
            count: 0,
        },
    );
    let mut output = BufWriter::with_capacity(
        BUF_SIZE,
        CountingWriter {
            inner: writer,
            count: 0,
        },
    );

    let mut stats = Stats::default();
    match mode {
        Mode::EncodeWords | Mode::EncodeCompact => {
            let layout = if mode == Mode::EncodeCompact {
                Layout::Compact
            } else {
                Layout::WordSplit
            };
            let mut tokenizer = Tokenizer::new(&mut input, locale);
            let mut encoder = TagEncoder::new(&mut output, layout);
            stats.codepoints = encoder::encode_stream(&mut tokenizer, &mut encoder)?;
            stats.lines = encoder.lines();
        }
        Mode::DecodeWords | Mode::DecodeCompact => {
            let mut tokenizer = Tokenizer::new(&mut input, locale);
            let mut decoder = TagDecoder::new(&mut output, locale);
            stats.codepoints = decoder::decode_stream(&mut tokenizer, &mut decoder)?;
            stats.lines = decoder.lines();
        }
        Mode::HexDumpAnnotated | Mode::HexDumpPlain => {
            hex::dump(&mut input, &mut output, mode == Mode::HexDumpAnnotated)?;
        }
        Mode::HexRestoreAnnotated | Mode::HexRestorePlain => {
            hex::restore(&mut input, &mut output)?;
        }
    }

    output.flush().map_err(IoError::Flush)?;
    // The buffer is empty after a successful flush, so this cannot fail.
    let output = output.into_inner().map_err(|e| IoError::Flush(e.into_error()))?;
    stats.bytes_in = input.get_ref().count;
    stats.bytes_out = output.count;

    log::info!(
        "{mode}: {} bytes in, {} bytes out, {} characters, {} lines",
        stats.bytes_in,
        stats.bytes_out,
        stats.codepoints,
        stats.lines
    );
    Ok(stats)
}

/// Run `mode` over the file at `path`, or standard input when `path` is
/// `None`, writing to `writer`.
pub fn transcode_path<W: Write>(
    mode: Mode,
    locale: Locale,
    path: Option<&Path>,
    writer: W,
) -> Result<Stats, IoError> {
    match path {
        Some(path) => {
            let file = File::open(path).map_err(|source| IoError::Open {
                path: path.to_path_buf(),
                source,
            })?;
            transcode(mode, locale, file, writer)
        }
        None => transcode(mode, locale, io::stdin().lock(), writer),
    }
}

/// Encode or decode an in-memory buffer; convenience wrapper for tests and
/// library callers.
pub fn transcode_bytes(mode: Mode, locale: Locale, input: &[u8]) -> Result<Vec<u8>, IoError> {
    let mut out = Vec::with_capacity(input.len() * 2);
    transcode(mode, locale, input, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::{Codeset, TokenizeError};

    fn utf8() -> Locale {
        Locale::new(Codeset::Utf8).unwrap()
    }

    /// Accepts writes, fails on flush.
    struct FlushFails(Vec<u8>);

    impl Write for FlushFails {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("device full"))
        }
    }

    /// Fails every write.
    struct WriteFails;

    impl Write for WriteFails {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("broken pipe"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn letters_map_to_modes() {
        for mode in Mode::ALL {
            assert_eq!(Mode::from_letter(mode.letter()), Some(mode));
            assert_eq!(mode.inverse().inverse(), mode);
        }
        assert_eq!(Mode::from_letter('z'), None);
        assert_eq!(Mode::default(), Mode::EncodeWords);
    }

    #[test]
    fn every_mode_pair_round_trips() {
        let text = "Hello,  wörld!\n\n\tindented 語\n\n\n".as_bytes();
        for mode in [
            Mode::EncodeWords,
            Mode::EncodeCompact,
            Mode::HexDumpAnnotated,
            Mode::HexDumpPlain,
        ] {
            let encoded = transcode_bytes(mode, utf8(), text).unwrap();
            let decoded = transcode_bytes(mode.inverse(), utf8(), &encoded).unwrap();
            assert_eq!(decoded, text, "{mode}");
        }
    }

    #[test]
    fn stats_count_both_directions() {
        let mut out = Vec::new();
        let stats = transcode(Mode::EncodeWords, utf8(), &b"ab cd\n"[..], &mut out).unwrap();
        assert_eq!(out, b":ab\n: \n:cd\nn");
        assert_eq!(stats.bytes_in, 6);
        assert_eq!(stats.bytes_out, out.len() as u64);
        assert_eq!(stats.codepoints, 6);
        assert_eq!(stats.lines, 4);

        let mut out = Vec::new();
        let stats = transcode(Mode::HexDumpPlain, utf8(), &b"AB"[..], &mut out).unwrap();
        assert_eq!(out, b"41\n42\n");
        assert_eq!(stats.bytes_in, 2);
        assert_eq!(stats.bytes_out, 6);
        assert_eq!(stats.codepoints, 0);
    }

    #[test]
    fn flush_failure_is_distinct() {
        let err = transcode(Mode::EncodeWords, utf8(), &b"abc"[..], FlushFails(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, IoError::Flush(_)), "{err:?}");
    }

    #[test]
    fn write_failure_surfaces_at_flush_for_buffered_output() {
        // Small outputs sit in the buffer until the single flush.
        let err = transcode(Mode::EncodeWords, utf8(), &b"abc"[..], WriteFails).unwrap_err();
        assert!(matches!(err, IoError::Flush(_)), "{err:?}");
    }

    #[test]
    fn write_failure_mid_stream() {
        let input = vec![b'a'; BUF_SIZE * 2];
        let err = transcode(Mode::EncodeWords, utf8(), &input[..], WriteFails).unwrap_err();
        assert!(
            matches!(err, IoError::Encode(EncodeError::Write(_))),
            "{err:?}"
        );
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = transcode_path(
            Mode::EncodeWords,
            utf8(),
            Some(Path::new("/nonexistent/diffwcx/input.txt")),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, IoError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/diffwcx/input.txt"));
    }

    #[test]
    fn decode_errors_keep_diagnostic_bytes() {
        let err = transcode_bytes(Mode::DecodeWords, utf8(), b"?\n").unwrap_err();
        assert_eq!(err.diagnostic(), b"invalid line command \"?\"");
    }

    #[test]
    fn truncated_input_is_an_error() {
        let err = transcode_bytes(Mode::EncodeCompact, utf8(), &[b'a', 0xF0, 0x9F]).unwrap_err();
        assert!(matches!(
            err,
            IoError::Encode(EncodeError::Tokenize(TokenizeError::TruncatedSequence { .. }))
        ));
    }
}
