#![no_main]
use libfuzzer_sys::fuzz_target;
use diffwcx::charset::{Codeset, Locale};
use diffwcx::io::{Mode, transcode_bytes};

fuzz_target!(|data: &[u8]| {
    // Decoders must never panic, only return errors.
    for codeset in [Codeset::Utf8, Codeset::Latin1, Codeset::Ascii] {
        let Ok(locale) = Locale::new(codeset) else {
            continue;
        };
        let _ = transcode_bytes(Mode::DecodeWords, locale, data);
    }

    let ascii = Locale::new(Codeset::Ascii).unwrap();
    let _ = transcode_bytes(Mode::HexRestoreAnnotated, ascii, data);
});
