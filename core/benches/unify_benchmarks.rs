use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use doc_compare::{ReportOptions, UnifyConfig, build_report, fuzz_ratio, unify_texts};
use std::time::Duration;

const MAX_BENCH_TIME_SECS: u64 = 20;
const WARMUP_SECS: u64 = 2;
const SAMPLE_SIZE: usize = 10;

fn synthetic_contract(paragraphs: usize, seed: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "{}. Clause {} obliges party {} to deliver item {} within {} days of notice",
                i + 1,
                i * 7 + seed,
                i % 5,
                i * 13 % 97,
                10 + i % 20
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Same clauses, wrapped at roughly forty chars as a scan would be.
fn rewrapped(text: &str) -> String {
    let mut out = String::new();
    let mut width = 0;
    for word in text.split_whitespace() {
        if width + word.len() > 40 {
            out.push('\n');
            width = 0;
        } else if width > 0 {
            out.push(' ');
        }
        out.push_str(word);
        width += word.len() + 1;
    }
    out
}

fn bench_fuzz_ratio(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuzz_ratio");
    group.sample_size(SAMPLE_SIZE);
    let a = "obliges party to deliver the goods";
    let b = "obliges the party to deliver goods";
    group.bench_function("two_word_tokens", |bench| {
        bench.iter(|| fuzz_ratio(a, b));
    });
    group.finish();
}

fn bench_unify_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("unify_identical");
    group.measurement_time(Duration::from_secs(MAX_BENCH_TIME_SECS));
    group.warm_up_time(Duration::from_secs(WARMUP_SECS));
    group.sample_size(SAMPLE_SIZE);

    for size in [20usize, 80] {
        let text = synthetic_contract(size, 0);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("paragraphs", size), &text, |b, text| {
            b.iter(|| unify_texts(text, text, &UnifyConfig::default()));
        });
    }
    group.finish();
}

fn bench_unify_rewrapped(c: &mut Criterion) {
    let mut group = c.benchmark_group("unify_rewrapped");
    group.measurement_time(Duration::from_secs(MAX_BENCH_TIME_SECS));
    group.warm_up_time(Duration::from_secs(WARMUP_SECS));
    group.sample_size(SAMPLE_SIZE);

    for size in [20usize, 80] {
        let left = synthetic_contract(size, 0);
        let right = rewrapped(&left);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("paragraphs", size),
            &(left, right),
            |b, (left, right)| {
                b.iter(|| unify_texts(left, right, &UnifyConfig::default()));
            },
        );
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let mut group = c.benchmark_group("disagreement_report");
    group.sample_size(SAMPLE_SIZE);
    let left = synthetic_contract(200, 0).replace('\n', "\n\n");
    let right = synthetic_contract(200, 1).replace('\n', "\n\n");
    group.bench_function("blocks_200", |b| {
        b.iter(|| build_report(&left, &right, &ReportOptions::default()));
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_fuzz_ratio,
    bench_unify_identical,
    bench_unify_rewrapped,
    bench_report
);
criterion_main!(benches);
