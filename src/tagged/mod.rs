// Word/whitespace tagged line format.
//
// Every line starts with one command byte:
//   ':'  payload line, all whitespace or all word characters
//   'n'  one newline, plus one more per trailing space on the line
//
// The encoder turns arbitrary text into this format so a line-based diff
// works at word granularity; the decoder restores the original bytes.

pub mod decoder;
pub mod encoder;

/// Command byte of a payload line.
pub const CMD_WORD: u8 = b':';
/// Command byte of a newline line.
pub const CMD_NEWLINE: u8 = b'n';
/// Stands for one additional newline inside an `n` line.
pub const NL_SUBSTITUTE: u8 = b' ';
/// Ends every tagged line.
pub const LINE_END: u8 = b'\n';

/// How the encoder groups word characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Runs of word characters share a line.
    #[default]
    WordSplit,
    /// One word character per line.
    Compact,
}

pub use decoder::{DecodeError, DecodeState, TagDecoder};
pub use encoder::{EncodeError, EncodeState, TagEncoder};
