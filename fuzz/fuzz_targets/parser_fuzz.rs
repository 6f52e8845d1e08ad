#![no_main]
use libfuzzer_sys::fuzz_target;

const LETTERS: &[u8] = b"wcWCxbXBqvz";
const WORDS: [&str; 8] = ["--", "-", "--json", "--charset", "UTF-8", "eucJP", "in.txt", "-vq"];

fuzz_target!(|data: &[u8]| {
    // Each byte pair picks a token: a cluster of option letters, a long option,
    // `--`, `-` or an operand.
    let mut args = Vec::<String>::new();
    for chunk in data.chunks(2).take(16) {
        let token = match chunk {
            [kind, bits] if kind % 2 == 0 => {
                let cluster: String = (0..3)
                    .map(|i| LETTERS[usize::from(bits.rotate_left(i * 3)) % LETTERS.len()] as char)
                    .take(1 + usize::from(kind % 3))
                    .collect();
                format!("-{cluster}")
            }
            [kind, ..] => WORDS[usize::from(kind / 2) % WORDS.len()].to_string(),
            [] => continue,
        };
        args.push(token);
    }
    diffwcx::cli::fuzz_try_parse_args(&args);
});
