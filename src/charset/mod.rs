// Character set configuration: codesets, locale resolution, classification.
//
// The process locale is resolved once into an explicit `Locale` value that
// the tokenizer and classifier receive at construction. Nothing here reads
// global state after that point.

pub mod class;
pub mod tokenizer;

use std::fmt;

use encoding_rs::{
    DecoderResult, EUC_JP, Encoding, EncoderResult, GB18030, ISO_2022_JP, REPLACEMENT, UTF_8,
};
use thiserror::Error;

pub use class::Class;
pub use tokenizer::{Codepoint, TokenizeError, Tokenizer};

/// Widest multibyte sequence of any supported codeset.
pub const MAX_WIDTH: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The locale cannot be used for multibyte processing.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("unsupported locale codeset \"{0}\"")]
    UnknownCodeset(String),
    #[error("unsupported locale codeset \"{0}\": stateful and wide encodings cannot be tokenized")]
    StatefulCodeset(String),
    #[error("unsupported locale: cannot determine the width of NUL in {0}")]
    NulWidth(Codeset),
}

// ---------------------------------------------------------------------------
// Codeset
// ---------------------------------------------------------------------------

/// Result of decoding the head of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete character. `len` is 0 for NUL, following the C multibyte
    /// convention of reporting the terminator with zero length.
    Char { value: char, len: usize },
    /// The buffer holds a valid but unfinished prefix.
    Incomplete,
    /// The buffer does not start with a valid sequence.
    Invalid,
}

/// A supported character encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codeset {
    /// 7-bit ASCII, the `C`/`POSIX` locale.
    Ascii,
    /// ISO-8859-1, one byte per character.
    Latin1,
    /// UTF-8.
    Utf8,
    /// Any other ASCII-compatible, stateless encoding: the ISO-8859 and
    /// Windows code page families, KOI8, EUC-JP, EUC-KR, Shift_JIS, Big5,
    /// GBK and GB18030.
    Legacy(&'static Encoding),
}

/// glibc codeset names that are not WHATWG labels.
const GLIBC_ALIASES: &[(&str, &str)] = &[
    ("eucjp", "euc-jp"),
    ("koi8r", "koi8-r"),
    ("koi8u", "koi8-u"),
    ("euckr", "euc-kr"),
    ("eucjpms", "euc-jp"),
    ("shiftjis", "shift_jis"),
    ("big5hkscs", "big5"),
    ("tis620", "windows-874"),
];

impl Codeset {
    /// Look up a codeset by name, ignoring case and punctuation.
    pub fn from_name(name: &str) -> Result<Self, LocaleError> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "c" | "posix" | "ascii" | "usascii" | "ansix341968" => return Ok(Self::Ascii),
            "iso88591" | "latin1" | "l1" => return Ok(Self::Latin1),
            "utf8" => return Ok(Self::Utf8),
            _ => {}
        }

        let encoding = Encoding::for_label(name.as_bytes())
            .or_else(|| Encoding::for_label(key.as_bytes()))
            .or_else(|| {
                GLIBC_ALIASES
                    .iter()
                    .find(|(alias, _)| *alias == key)
                    .and_then(|(_, label)| Encoding::for_label(label.as_bytes()))
            })
            .or_else(|| {
                // `windows1251` is a label only as `cp1251`.
                key.strip_prefix("windows")
                    .and_then(|page| Encoding::for_label(format!("cp{page}").as_bytes()))
            })
            .ok_or_else(|| LocaleError::UnknownCodeset(name.to_string()))?;

        if encoding == UTF_8 {
            Ok(Self::Utf8)
        } else if encoding == ISO_2022_JP
            || encoding == REPLACEMENT
            || encoding.output_encoding() != encoding
        {
            Err(LocaleError::StatefulCodeset(name.to_string()))
        } else {
            Ok(Self::Legacy(encoding))
        }
    }

    /// Canonical name, as printed in logs and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ANSI_X3.4-1968",
            Self::Latin1 => "ISO-8859-1",
            Self::Utf8 => "UTF-8",
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// Longest byte sequence one character can occupy.
    pub fn max_width(self) -> usize {
        match self {
            Self::Ascii | Self::Latin1 => 1,
            Self::Utf8 => MAX_WIDTH,
            Self::Legacy(encoding) if encoding.is_single_byte() => 1,
            Self::Legacy(encoding) if encoding == GB18030 => 4,
            Self::Legacy(encoding) if encoding == EUC_JP => 3,
            Self::Legacy(_) => 2,
        }
    }

    /// Decode the character at the head of `bytes`.
    pub fn decode(self, bytes: &[u8]) -> Decoded {
        let Some(&first) = bytes.first() else {
            return Decoded::Incomplete;
        };
        let decoded = match self {
            Self::Ascii if first < 0x80 => Decoded::Char {
                value: char::from(first),
                len: 1,
            },
            Self::Ascii => Decoded::Invalid,
            Self::Latin1 => Decoded::Char {
                value: char::from(first),
                len: 1,
            },
            Self::Utf8 => decode_utf8(bytes),
            Self::Legacy(encoding) => decode_legacy(encoding, bytes),
        };
        match decoded {
            Decoded::Char { value: '\0', .. } => Decoded::Char {
                value: '\0',
                len: 0,
            },
            other => other,
        }
    }

    /// Encode `ch` into `buf`, returning the number of bytes written, or
    /// `None` if the codeset cannot represent it.
    pub fn encode(self, ch: char, buf: &mut [u8; MAX_WIDTH]) -> Option<usize> {
        match self {
            Self::Ascii if ch.is_ascii() => {
                buf[0] = ch as u8;
                Some(1)
            }
            Self::Latin1 if u32::from(ch) <= 0xFF => {
                buf[0] = u32::from(ch) as u8;
                Some(1)
            }
            Self::Ascii | Self::Latin1 => None,
            Self::Utf8 => Some(ch.encode_utf8(buf).len()),
            Self::Legacy(encoding) => {
                let mut utf8 = [0u8; 4];
                let mut encoder = encoding.new_encoder();
                let (result, _, written) = encoder.encode_from_utf8_without_replacement(
                    ch.encode_utf8(&mut utf8),
                    &mut buf[..],
                    true,
                );
                match result {
                    EncoderResult::InputEmpty => Some(written),
                    EncoderResult::OutputFull | EncoderResult::Unmappable(_) => None,
                }
            }
        }
    }

    /// Whitespace predicate of the codeset's locale (newline included).
    pub fn is_space(self, ch: char) -> bool {
        match self {
            Self::Ascii | Self::Latin1 => matches!(ch, '\t'..='\r' | ' '),
            // No-break spaces (U+00A0, U+2007, U+202F) count as word characters.
            Self::Utf8 | Self::Legacy(_) => matches!(
                ch,
                '\t'..='\r'
                    | ' '
                    | '\u{1680}'
                    | '\u{2000}'..='\u{2006}'
                    | '\u{2008}'..='\u{200A}'
                    | '\u{2028}'
                    | '\u{2029}'
                    | '\u{205F}'
                    | '\u{3000}'
            ),
        }
    }
}

impl fmt::Display for Codeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn decode_utf8(bytes: &[u8]) -> Decoded {
    let valid = match std::str::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) if e.valid_up_to() > 0 => match std::str::from_utf8(&bytes[..e.valid_up_to()]) {
            Ok(s) => s,
            Err(_) => return Decoded::Invalid,
        },
        Err(e) => {
            return match e.error_len() {
                None => Decoded::Incomplete,
                Some(_) => Decoded::Invalid,
            };
        }
    };
    match valid.chars().next() {
        Some(value) => Decoded::Char {
            value,
            len: value.len_utf8(),
        },
        None => Decoded::Incomplete,
    }
}

/// Feed `bytes` to a fresh decoder one at a time until it yields a
/// character. Where one sequence decodes to several scalars (a few Big5
/// codes do), the first one stands for the sequence.
fn decode_legacy(encoding: &'static Encoding, bytes: &[u8]) -> Decoded {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut out = [0u8; 16];
    for (i, byte) in bytes.iter().enumerate() {
        let (result, _, written) =
            decoder.decode_to_utf8_without_replacement(std::slice::from_ref(byte), &mut out, false);
        if !matches!(result, DecoderResult::InputEmpty) {
            return Decoded::Invalid;
        }
        if written > 0 {
            return match std::str::from_utf8(&out[..written])
                .ok()
                .and_then(|s| s.chars().next())
            {
                Some(value) => Decoded::Char { value, len: i + 1 },
                None => Decoded::Invalid,
            };
        }
    }
    Decoded::Incomplete
}

// ---------------------------------------------------------------------------
// Locale
// ---------------------------------------------------------------------------

/// Resolved character configuration for one run.
///
/// Carries everything the tokenizer and classifier need: the codeset, its
/// maximum width, and the measured width of the NUL character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    codeset: Codeset,
    nul_width: usize,
}

impl Locale {
    /// Build a locale for `codeset`, measuring the encoded width of NUL.
    pub fn new(codeset: Codeset) -> Result<Self, LocaleError> {
        let mut buf = [0u8; MAX_WIDTH];
        match codeset.encode('\0', &mut buf) {
            Some(nul_width) if nul_width > 0 => Ok(Self { codeset, nul_width }),
            _ => Err(LocaleError::NulWidth(codeset)),
        }
    }

    /// Resolve a POSIX locale name such as `de_DE.UTF-8@euro`.
    ///
    /// Names without a codeset part map to ISO-8859-1, except `C` and
    /// `POSIX` (and the empty name) which map to ASCII.
    pub fn from_locale_name(name: &str) -> Result<Self, LocaleError> {
        let name = name.split('@').next().unwrap_or_default();
        let codeset = match name.split_once('.') {
            Some((_, codeset)) => Codeset::from_name(codeset)?,
            None if name.is_empty() || name == "C" || name == "POSIX" => Codeset::Ascii,
            None => Codeset::Latin1,
        };
        Self::new(codeset)
    }

    /// Resolve the locale from `LC_ALL`, `LC_CTYPE` and `LANG`, in that
    /// order of precedence.
    pub fn from_env() -> Result<Self, LocaleError> {
        let name = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        log::debug!("locale name from environment: {name:?}");
        Self::from_locale_name(&name)
    }

    /// The codeset characters are decoded and rendered with.
    pub fn codeset(&self) -> Codeset {
        self.codeset
    }

    /// Lookahead size the tokenizer fills before each decode.
    pub fn max_width(&self) -> usize {
        self.codeset.max_width()
    }

    /// Encoded width of NUL, used to size zero-length decodes.
    pub fn nul_width(&self) -> usize {
        self.nul_width
    }

    /// Classify a character for the tagging state machines.
    pub fn classify(&self, ch: char) -> Class {
        Class::of(ch, self.codeset)
    }

    /// Render `ch` in this locale's encoding for a diagnostic message.
    pub fn render(&self, ch: char) -> Option<Vec<u8>> {
        let mut buf = [0u8; MAX_WIDTH];
        let len = self.codeset.encode(ch, &mut buf)?;
        Some(buf[..len].to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
