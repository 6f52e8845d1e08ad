// Tagged-line decoder.
//
// Inverse of the encoder. The tagged text is itself tokenized with the
// active locale, so payload characters are echoed as the exact bytes they
// were read from.

use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;

use super::{CMD_NEWLINE, CMD_WORD, LINE_END, NL_SUBSTITUTE};
use crate::charset::{Codepoint, Locale, TokenizeError, Tokenizer};

const WORD: char = CMD_WORD as char;
const NEWLINE: char = CMD_NEWLINE as char;
const SUBSTITUTE: char = NL_SUBSTITUTE as char;
const END: char = LINE_END as char;

const INVALID_COMMAND: &str = "invalid line command";
const INVALID_SUBSTITUTE: &str = "invalid newline substitute";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A character rendered in the locale's encoding for a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered(Vec<u8>);

impl Rendered {
    /// The character's bytes in the locale encoding.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("{} \"{}\"", INVALID_COMMAND, .0)]
    InvalidCommand(Rendered),
    #[error("{} \"{}\"", INVALID_SUBSTITUTE, .0)]
    InvalidNewlineSubstitute(Rendered),
    #[error(
        "cannot display error message \"{message}\" for wide character with code point {codepoint:#x}"
    )]
    Unrenderable {
        message: &'static str,
        codepoint: u32,
    },
    #[error("error writing output: {0}")]
    Write(#[source] io::Error),
}

impl DecodeError {
    /// The diagnostic as raw bytes, with any offending character in the
    /// locale's own encoding rather than lossily converted.
    pub fn diagnostic(&self) -> Vec<u8> {
        let (message, rendered) = match self {
            Self::InvalidCommand(r) => (INVALID_COMMAND, r),
            Self::InvalidNewlineSubstitute(r) => (INVALID_SUBSTITUTE, r),
            other => return other.to_string().into_bytes(),
        };
        let mut out = Vec::with_capacity(message.len() + rendered.0.len() + 3);
        out.extend_from_slice(message.as_bytes());
        out.extend_from_slice(b" \"");
        out.extend_from_slice(rendered.as_bytes());
        out.push(b'"');
        out
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Decoder state between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeState {
    /// At the start of a line, expecting a command byte.
    #[default]
    ExpectCommand,
    /// Inside an `n` line.
    InNewlineRun,
    /// Inside a `:` line.
    InPayload,
}

/// What a transition writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Nothing,
    /// Write one newline.
    Newline,
    /// Write the character's raw bytes.
    Echo,
}

/// A character the current state does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Command(char),
    Substitute(char),
}

impl DecodeState {
    /// Transition on one character of tagged text.
    pub fn step(self, ch: char) -> Result<(Self, Action), Rejection> {
        match (self, ch) {
            (Self::ExpectCommand, WORD) => Ok((Self::InPayload, Action::Nothing)),
            (Self::ExpectCommand, NEWLINE) => Ok((Self::InNewlineRun, Action::Newline)),
            (Self::ExpectCommand, other) => Err(Rejection::Command(other)),

            (Self::InNewlineRun, SUBSTITUTE) => Ok((Self::InNewlineRun, Action::Newline)),
            (Self::InNewlineRun, END) => Ok((Self::ExpectCommand, Action::Nothing)),
            (Self::InNewlineRun, other) => Err(Rejection::Substitute(other)),

            (Self::InPayload, END) => Ok((Self::ExpectCommand, Action::Nothing)),
            (Self::InPayload, _) => Ok((Self::InPayload, Action::Echo)),
        }
    }
}

// ---------------------------------------------------------------------------
// TagDecoder
// ---------------------------------------------------------------------------

/// Streaming tagged-line decoder writing reconstructed bytes to any `Write`.
pub struct TagDecoder<W: Write> {
    writer: W,
    locale: Locale,
    state: DecodeState,
    lines: u64,
}

impl<W: Write> TagDecoder<W> {
    /// Create a decoder expecting a command byte. `locale` renders
    /// rejected characters in diagnostics.
    pub fn new(writer: W, locale: Locale) -> Self {
        Self {
            writer,
            locale,
            state: DecodeState::ExpectCommand,
            lines: 0,
        }
    }

    /// Feed one character of tagged text.
    pub fn push(&mut self, cp: Codepoint<'_>) -> Result<(), DecodeError> {
        let (next, action) = self
            .state
            .step(cp.value)
            .map_err(|rejection| self.reject(rejection))?;
        log::trace!("decode {:?} {:?} -> {next:?}", self.state, cp.value);

        if self.state == DecodeState::ExpectCommand {
            self.lines += 1;
        }
        match action {
            Action::Nothing => {}
            Action::Newline => self
                .writer
                .write_all(&[LINE_END])
                .map_err(DecodeError::Write)?,
            Action::Echo => self.writer.write_all(cp.raw).map_err(DecodeError::Write)?,
        }
        self.state = next;
        Ok(())
    }

    fn reject(&self, rejection: Rejection) -> DecodeError {
        let (message, ch) = match rejection {
            Rejection::Command(ch) => (INVALID_COMMAND, ch),
            Rejection::Substitute(ch) => (INVALID_SUBSTITUTE, ch),
        };
        let Some(bytes) = self.locale.render(ch) else {
            return DecodeError::Unrenderable {
                message,
                codepoint: u32::from(ch),
            };
        };
        match rejection {
            Rejection::Command(_) => DecodeError::InvalidCommand(Rendered(bytes)),
            Rejection::Substitute(_) => DecodeError::InvalidNewlineSubstitute(Rendered(bytes)),
        }
    }

    /// Current state; `ExpectCommand` between lines.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Number of tagged lines started so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Release the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Decode everything `tokenizer` yields. Returns the number of characters.
pub fn decode_stream<R: Read, W: Write>(
    tokenizer: &mut Tokenizer<R>,
    decoder: &mut TagDecoder<W>,
) -> Result<u64, DecodeError> {
    let mut count = 0u64;
    while let Some(cp) = tokenizer.next_codepoint()? {
        decoder.push(cp)?;
        count += 1;
    }
    Ok(count)
}

/// Decode an in-memory buffer of tagged text.
pub fn decode_all(input: &[u8], locale: Locale) -> Result<Vec<u8>, DecodeError> {
    let mut tokenizer = Tokenizer::new(input, locale);
    let mut decoder = TagDecoder::new(Vec::with_capacity(input.len()), locale);
    decode_stream(&mut tokenizer, &mut decoder)?;
    Ok(decoder.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
