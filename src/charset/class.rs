// Character classification for the tagging state machines.

use super::Codeset;

/// What a character means to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// U+000A, and nothing else.
    Newline,
    /// Locale whitespace other than newline.
    Whitespace,
    /// Everything else.
    WordChar,
}

impl Class {
    /// Classify `ch` with the whitespace set of `codeset`.
    pub fn of(ch: char, codeset: Codeset) -> Self {
        if ch == '\n' {
            Self::Newline
        } else if codeset.is_space(ch) {
            Self::Whitespace
        } else {
            Self::WordChar
        }
    }
}
