#![no_main]
use libfuzzer_sys::fuzz_target;
use diffwcx::charset::{Codeset, Locale};
use diffwcx::io::{Mode, transcode_bytes};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, payload)) = data.split_first() else {
        return;
    };

    let codeset = match flags % 4 {
        0 => Codeset::Utf8,
        1 => Codeset::Latin1,
        2 => Codeset::Legacy(encoding_rs::EUC_JP),
        _ => Codeset::Ascii,
    };
    let locale = Locale::new(codeset).unwrap();
    let mode = [
        Mode::EncodeWords,
        Mode::EncodeCompact,
        Mode::HexDumpAnnotated,
        Mode::HexDumpPlain,
    ][usize::from(flags >> 6)];

    // Input the codeset cannot decode is rejected, never mangled.
    let Ok(encoded) = transcode_bytes(mode, locale, payload) else {
        return;
    };
    let decoded = transcode_bytes(mode.inverse(), locale, &encoded).unwrap();
    assert_eq!(decoded, payload);
});
