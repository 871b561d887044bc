use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use rexgen::{Bound, CharSet, QuantifierKind, Regex, XorShiftRng};

use QuantifierKind::Greedy;

fn hex() -> CharSet {
    CharSet::builder().range('0', '9').range('a', 'f').build().unwrap()
}

fn repeat(node: Regex, n: u32) -> Regex {
    node.quantify(n, n, Greedy).unwrap()
}

fn uuid_pattern() -> Regex {
    Regex::concat(vec![
        repeat(Regex::class(hex()), 8),
        Regex::literal("-"),
        repeat(Regex::class(hex()), 4),
        Regex::literal("-"),
        Regex::class(CharSet::range('0', '5').unwrap()),
        repeat(Regex::class(hex()), 3),
        Regex::literal("-"),
        Regex::class(CharSet::chars("089ab".chars()).unwrap()),
        repeat(Regex::class(hex()), 3),
        Regex::literal("-"),
        repeat(Regex::class(hex()), 12),
    ])
    .unwrap()
}

fn bench_generate(c: &mut Criterion) {
    let uuid = uuid_pattern();
    c.bench_function("generate/uuid", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            uuid.generate(XorShiftRng::new(seed)).unwrap()
        })
    });

    let mut group = c.benchmark_group("generate/repetition");
    for reps in [8u32, 64, 512] {
        let tree = Regex::class(CharSet::range('a', 'z').unwrap())
            .quantify(reps, reps, Greedy)
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(reps), &tree, |b, tree| {
            let mut seed = 0u64;
            b.iter(|| {
                seed = seed.wrapping_add(1);
                tree.generate(XorShiftRng::new(seed)).unwrap()
            })
        });
    }
    group.finish();

    let open_ended = Regex::class(CharSet::range('a', 'z').unwrap())
        .quantify(1, Bound::Unbounded, Greedy)
        .unwrap()
        .sized(64)
        .unwrap();
    c.bench_function("generate/open_ended_sized", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            open_ended.generate(XorShiftRng::new(seed)).unwrap()
        })
    });
}

fn bench_test(c: &mut Criterion) {
    let uuid = uuid_pattern();
    let inputs: Vec<String> = (0..16)
        .map(|seed| uuid.generate(XorShiftRng::new(seed)).unwrap())
        .collect();
    c.bench_function("test/uuid", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % inputs.len();
            uuid.test(&inputs[i])
        })
    });
}

criterion_group!(benches, bench_generate, bench_test);
criterion_main!(benches);
