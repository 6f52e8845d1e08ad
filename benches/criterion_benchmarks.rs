use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use diffwcx::charset::{Codeset, Locale};
use diffwcx::io::{Mode, transcode_bytes};
use diffwcx::tagged::Layout;
use diffwcx::tagged::decoder::decode_all;
use diffwcx::tagged::encoder::encode_all;

const SIZES: [usize; 3] = [64 * 1024, 1024 * 1024, 8 * 1024 * 1024];

/// Pseudo-random prose drawn from `words`, roughly `size` bytes long.
fn gen_text(size: usize, seed: u64, words: &[&str]) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size + 16);
    while out.len() < size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        let word = words[(s >> 33) as usize % words.len()];
        out.extend_from_slice(word.as_bytes());
        out.push(if (s >> 20) % 9 == 0 { b'\n' } else { b' ' });
    }
    out
}

fn ascii_text(size: usize, seed: u64) -> Vec<u8> {
    gen_text(size, seed, &["the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog"])
}

fn cjk_text(size: usize, seed: u64) -> Vec<u8> {
    gen_text(size, seed, &["単語", "差分", "文字", "\u{3000}", "符号化", "🦀", "naïve"])
}

fn utf8() -> Locale {
    Locale::new(Codeset::Utf8).unwrap()
}

fn bench_encode_speed(c: &mut Criterion) {
    for (name, layout) in [
        ("encode_word_split_mb_s", Layout::WordSplit),
        ("encode_compact_mb_s", Layout::Compact),
    ] {
        let mut g = c.benchmark_group(name);
        for size in SIZES {
            let text = ascii_text(size, 1);
            g.throughput(Throughput::Bytes(text.len() as u64));
            g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
                b.iter(|| {
                    let out = encode_all(black_box(&text), utf8(), layout).unwrap();
                    black_box(out);
                });
            });
        }
        g.finish();
    }
}

fn bench_decode_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_speed_vs_tagged");
    for size in SIZES {
        let text = ascii_text(size, 2);
        let tagged = encode_all(&text, utf8(), Layout::WordSplit).unwrap();
        g.throughput(Throughput::Bytes(tagged.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = decode_all(black_box(&tagged), utf8()).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_multibyte(c: &mut Criterion) {
    let mut g = c.benchmark_group("multibyte_roundtrip");
    let text = cjk_text(1024 * 1024, 3);
    g.throughput(Throughput::Bytes(text.len() as u64));
    for (name, codeset) in [("utf8", Codeset::Utf8), ("latin1", Codeset::Latin1)] {
        let locale = Locale::new(codeset).unwrap();
        g.bench_function(name, |b| {
            b.iter(|| {
                let tagged = encode_all(black_box(&text), locale, Layout::WordSplit).unwrap();
                let out = decode_all(&tagged, locale).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_hex(c: &mut Criterion) {
    let mut g = c.benchmark_group("hex_dump_restore");
    let data = cjk_text(1024 * 1024, 4);
    g.throughput(Throughput::Bytes(data.len() as u64));
    for mode in [Mode::HexDumpAnnotated, Mode::HexDumpPlain] {
        let dumped = transcode_bytes(mode, utf8(), &data).unwrap();
        g.bench_function(format!("dump_{}", mode.letter()), |b| {
            b.iter(|| black_box(transcode_bytes(mode, utf8(), black_box(&data)).unwrap()));
        });
        g.bench_function(format!("restore_{}", mode.inverse().letter()), |b| {
            b.iter(|| {
                black_box(transcode_bytes(mode.inverse(), utf8(), black_box(&dumped)).unwrap())
            });
        });
    }
    g.finish();
}

fn bench_output_growth(c: &mut Criterion) {
    let mut g = c.benchmark_group("output_growth_vs_layout");
    let text = ascii_text(1024 * 1024, 5);
    for layout in [Layout::WordSplit, Layout::Compact] {
        g.bench_with_input(
            BenchmarkId::from_parameter(format!("{layout:?}")),
            &layout,
            |b, layout| {
                b.iter(|| {
                    let out = encode_all(&text, utf8(), *layout).unwrap();
                    // Tagged bytes per input byte.
                    let growth = out.len() as f64 / text.len() as f64;
                    black_box(growth);
                });
            },
        );
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_encode_speed,
    bench_decode_speed,
    bench_multibyte,
    bench_hex,
    bench_output_growth
);
criterion_main!(benches);
