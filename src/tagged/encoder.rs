// Tagged-line encoder.
//
// A four-state machine over classified characters. `EncodeState::step` is a
// pure transition table returning the next state and the ordered output
// actions; `TagEncoder` applies those actions to a writer.

use std::io::{self, Read, Write};

use thiserror::Error;

use super::{CMD_NEWLINE, CMD_WORD, LINE_END, Layout, NL_SUBSTITUTE};
use crate::charset::{Class, Locale, TokenizeError, Tokenizer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("error writing output: {0}")]
    Write(#[source] io::Error),
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Encoder state between two characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeState {
    /// No line is open.
    #[default]
    Start,
    /// An `n` line is open.
    AfterNewline,
    /// A `:` line holding whitespace is open.
    InWhitespaceRun,
    /// A `:` line holding word characters is open.
    InWordRun,
}

/// One output action of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Terminate the open line.
    EndLine,
    /// Start a new line with this command byte.
    Command(u8),
    /// Append one newline substitute to the open `n` line.
    Substitute,
    /// Append the character's raw bytes.
    Payload,
}

const NEWLINE: &[Emit] = &[Emit::Command(CMD_NEWLINE)];
const END_THEN_NEWLINE: &[Emit] = &[Emit::EndLine, Emit::Command(CMD_NEWLINE)];
const SUBSTITUTE: &[Emit] = &[Emit::Substitute];
const PAYLOAD: &[Emit] = &[Emit::Payload];
const OPEN: &[Emit] = &[Emit::Command(CMD_WORD), Emit::Payload];
const END_THEN_OPEN: &[Emit] = &[Emit::EndLine, Emit::Command(CMD_WORD), Emit::Payload];
const PAYLOAD_THEN_END: &[Emit] = &[Emit::Payload, Emit::EndLine];
const OPEN_THEN_END: &[Emit] = &[Emit::Command(CMD_WORD), Emit::Payload, Emit::EndLine];
const END_THEN_OPEN_THEN_END: &[Emit] = &[
    Emit::EndLine,
    Emit::Command(CMD_WORD),
    Emit::Payload,
    Emit::EndLine,
];

impl EncodeState {
    /// Transition on one classified character.
    pub fn step(self, class: Class, layout: Layout) -> (Self, &'static [Emit]) {
        use EncodeState::{AfterNewline, InWhitespaceRun, InWordRun, Start};

        match (self, class, layout) {
            (Start, Class::Newline, _) => (AfterNewline, NEWLINE),
            (AfterNewline, Class::Newline, _) => (AfterNewline, SUBSTITUTE),
            (InWhitespaceRun | InWordRun, Class::Newline, _) => (AfterNewline, END_THEN_NEWLINE),

            (Start, Class::Whitespace, _) => (InWhitespaceRun, OPEN),
            (InWhitespaceRun, Class::Whitespace, _) => (InWhitespaceRun, PAYLOAD),
            (AfterNewline | InWordRun, Class::Whitespace, _) => (InWhitespaceRun, END_THEN_OPEN),

            (Start, Class::WordChar, Layout::WordSplit) => (InWordRun, OPEN),
            (InWordRun, Class::WordChar, Layout::WordSplit) => (InWordRun, PAYLOAD),
            (AfterNewline | InWhitespaceRun, Class::WordChar, Layout::WordSplit) => {
                (InWordRun, END_THEN_OPEN)
            }

            (Start, Class::WordChar, Layout::Compact) => (Start, OPEN_THEN_END),
            // Not reachable from a fresh encoder: compact mode never stays in
            // a word run.
            (InWordRun, Class::WordChar, Layout::Compact) => (Start, PAYLOAD_THEN_END),
            (AfterNewline | InWhitespaceRun, Class::WordChar, Layout::Compact) => {
                (Start, END_THEN_OPEN_THEN_END)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TagEncoder
// ---------------------------------------------------------------------------

/// Streaming tagged-line encoder writing to any `Write`.
pub struct TagEncoder<W: Write> {
    writer: W,
    layout: Layout,
    state: EncodeState,
    lines: u64,
}

impl<W: Write> TagEncoder<W> {
    /// Create an encoder with no line open.
    pub fn new(writer: W, layout: Layout) -> Self {
        Self {
            writer,
            layout,
            state: EncodeState::Start,
            lines: 0,
        }
    }

    /// Feed one character: its class and the bytes it was decoded from.
    pub fn push(&mut self, class: Class, raw: &[u8]) -> io::Result<()> {
        let (next, emits) = self.state.step(class, self.layout);
        log::trace!("encode {:?} {class:?} -> {next:?}", self.state);
        for emit in emits {
            match *emit {
                Emit::EndLine => self.writer.write_all(&[LINE_END])?,
                Emit::Command(cmd) => {
                    self.lines += 1;
                    self.writer.write_all(&[cmd])?;
                }
                Emit::Substitute => self.writer.write_all(&[NL_SUBSTITUTE])?,
                Emit::Payload => self.writer.write_all(raw)?,
            }
        }
        self.state = next;
        Ok(())
    }

    /// Current state; tells which kind of line, if any, is open.
    pub fn state(&self) -> EncodeState {
        self.state
    }

    /// Number of tagged lines started so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Release the writer. Nothing is appended: an open line stays
    /// unterminated, exactly as the input ended.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encode everything `tokenizer` yields. Returns the number of characters.
pub fn encode_stream<R: Read, W: Write>(
    tokenizer: &mut Tokenizer<R>,
    encoder: &mut TagEncoder<W>,
) -> Result<u64, EncodeError> {
    let locale = *tokenizer.locale();
    let mut count = 0u64;
    while let Some(cp) = tokenizer.next_codepoint()? {
        encoder
            .push(locale.classify(cp.value), cp.raw)
            .map_err(EncodeError::Write)?;
        count += 1;
    }
    Ok(count)
}

/// Encode an in-memory buffer.
pub fn encode_all(input: &[u8], locale: Locale, layout: Layout) -> Result<Vec<u8>, EncodeError> {
    let mut tokenizer = Tokenizer::new(input, locale);
    let mut encoder = TagEncoder::new(Vec::with_capacity(input.len() * 2), layout);
    encode_stream(&mut tokenizer, &mut encoder)?;
    Ok(encoder.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
