//! diffwcx: word/whitespace tagging for word-level diffs, with exact round trip.
//!
//! The crate provides:
//! - Locale-aware multibyte tokenizing and classification (`charset`)
//! - The tagged-line encoder and decoder (`tagged`)
//! - A byte-per-line hex dump and restore (`hex`)
//! - Stream-level helpers driving all modes (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use diffwcx::charset::{Codeset, Locale};
//! use diffwcx::io::{transcode_bytes, Mode};
//!
//! let locale = Locale::new(Codeset::Utf8).unwrap();
//! let tagged = transcode_bytes(Mode::EncodeWords, locale, b"ab cd\n").unwrap();
//! assert_eq!(tagged, b":ab\n: \n:cd\nn");
//! let restored = transcode_bytes(Mode::DecodeWords, locale, &tagged).unwrap();
//! assert_eq!(restored, b"ab cd\n");
//! ```

pub mod charset;
pub mod hex;
pub mod io;
pub mod tagged;

#[cfg(feature = "cli")]
pub mod cli;
