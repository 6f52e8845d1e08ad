// Command-line interface for diffwcx.
//
// One mode letter selects what happens to the input; the last letter given
// wins. Input is the single optional file operand or standard input, output
// is always standard output.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueHint};
use log::LevelFilter;

use crate::charset::{Codeset, Locale, LocaleError};
use crate::io::{IoError, Mode, Stats, transcode_path};

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Every mode flag overrides every other one, itself included, so the last
/// letter on the command line decides the mode.
const MODE_FLAGS: [&str; 8] = [
    "words",
    "compact",
    "decode_words",
    "decode_compact",
    "hex",
    "hex_plain",
    "unhex",
    "unhex_plain",
];

/// Tag words and whitespace for word-level diffing, and undo the tagging.
#[derive(Parser, Debug)]
#[command(
    name = "diffwcx",
    version,
    about = "Word/whitespace tagging transcoder for word-level diffs"
)]
struct Cli {
    /// Encode, one word or whitespace run per line (default).
    #[arg(short = 'w', overrides_with_all = MODE_FLAGS)]
    words: bool,

    /// Encode, one word character per line.
    #[arg(short = 'c', overrides_with_all = MODE_FLAGS)]
    compact: bool,

    /// Decode the output of -w.
    #[arg(short = 'W', overrides_with_all = MODE_FLAGS)]
    decode_words: bool,

    /// Decode the output of -c.
    #[arg(short = 'C', overrides_with_all = MODE_FLAGS)]
    decode_compact: bool,

    /// Hex dump, one byte per line, with a display character.
    #[arg(short = 'x', overrides_with_all = MODE_FLAGS)]
    hex: bool,

    /// Hex dump, one byte per line.
    #[arg(short = 'b', overrides_with_all = MODE_FLAGS)]
    hex_plain: bool,

    /// Restore the output of -x.
    #[arg(short = 'X', overrides_with_all = MODE_FLAGS)]
    unhex: bool,

    /// Restore the output of -b.
    #[arg(short = 'B', overrides_with_all = MODE_FLAGS)]
    unhex_plain: bool,

    /// Character set to use instead of the locale's (UTF-8, ISO-8859-15, EUC-JP, ...).
    #[arg(long, value_name = "NAME")]
    charset: Option<String>,

    /// Quiet mode (only errors are logged).
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json")]
    json_output: bool,

    /// Input file (default: stdin; `-` also means stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Options {
    mode: Mode,
    input_file: Option<PathBuf>,
    charset: Option<String>,
    quiet: bool,
    verbose: u8,
    json_output: bool,
}

fn resolve_mode(cli: &Cli) -> Mode {
    [
        (cli.words, Mode::EncodeWords),
        (cli.compact, Mode::EncodeCompact),
        (cli.decode_words, Mode::DecodeWords),
        (cli.decode_compact, Mode::DecodeCompact),
        (cli.hex, Mode::HexDumpAnnotated),
        (cli.hex_plain, Mode::HexDumpPlain),
        (cli.unhex, Mode::HexRestoreAnnotated),
        (cli.unhex_plain, Mode::HexRestorePlain),
    ]
    .into_iter()
    .find_map(|(set, mode)| set.then_some(mode))
    .unwrap_or_default()
}

fn resolve_options(cli: Cli) -> Options {
    let mode = resolve_mode(&cli);
    let input_file = cli.file.filter(|path| path.as_os_str() != "-");
    Options {
        mode,
        input_file,
        charset: cli.charset,
        quiet: cli.quiet,
        verbose: cli.verbose.min(3),
        json_output: cli.json_output,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("diffwcx".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Logging and locale setup
// ---------------------------------------------------------------------------

fn init_logging(opts: &Options) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_timestamp(None).format_target(false);
    match (opts.quiet, opts.verbose) {
        (true, _) => {
            builder.filter_level(LevelFilter::Error);
        }
        (false, 0) => {}
        (false, 1) => {
            builder.filter_level(LevelFilter::Info);
        }
        (false, 2) => {
            builder.filter_level(LevelFilter::Debug);
        }
        (false, _) => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

/// Hex modes work on raw bytes and never consult the locale.
fn resolve_locale(opts: &Options) -> Result<Locale, LocaleError> {
    if !opts.mode.uses_locale() {
        return Locale::new(Codeset::Ascii);
    }
    match opts.charset.as_deref() {
        Some(name) => Locale::new(Codeset::from_name(name)?),
        None => Locale::from_env(),
    }
}

// ---------------------------------------------------------------------------
// Transcode command
// ---------------------------------------------------------------------------

fn report(err: &IoError) {
    let mut line = b"diffwcx: ".to_vec();
    line.extend_from_slice(&err.diagnostic());
    line.push(b'\n');
    let _ = io::stderr().lock().write_all(&line);
}

fn print_json(opts: &Options, locale: &Locale, stats: &Stats) {
    let json = serde_json::json!({
        "mode": opts.mode.letter().to_string(),
        "charset": locale.codeset().name(),
        "bytes_in": stats.bytes_in,
        "bytes_out": stats.bytes_out,
        "codepoints": stats.codepoints,
        "lines": stats.lines,
    });
    match serde_json::to_string_pretty(&json) {
        Ok(text) => eprintln!("{text}"),
        Err(e) => log::warn!("cannot serialize stats: {e}"),
    }
}

fn cmd_transcode(opts: &Options) -> i32 {
    let locale = match resolve_locale(opts) {
        Ok(locale) => locale,
        Err(e) => {
            eprintln!("diffwcx: {e}");
            return 1;
        }
    };

    let input = opts.input_file.as_deref();
    match input {
        Some(path) => log::debug!("input: {}", path.display()),
        None => log::debug!("input: <stdin>"),
    }

    match transcode_path(opts.mode, locale, input, io::stdout().lock()) {
        Ok(stats) => {
            if opts.json_output {
                print_json(opts, &locale, &stats);
            }
            0
        }
        Err(e) => {
            report(&e);
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse the command line, run one pass and exit with its status.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);
    init_logging(&opts);
    process::exit(cmd_transcode(&opts));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
