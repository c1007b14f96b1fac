//! Benchmarks for the conditional resolution pipeline.

#![allow(clippy::format_push_string)] // Benchmark setup code, performance not critical

use std::collections::BTreeSet;

use condroles_core::{Preprocessor, RoleFormat, classify, parse};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

const VALUES: [&str; 3] = ["azure", "aws", "gcp"];

fn values() -> BTreeSet<String> {
    VALUES.iter().map(|v| (*v).to_owned()).collect()
}

/// Generate a document mixing paragraphs, lists, blocks and conditionals.
fn generate_document(sections: usize) -> String {
    let mut doc = String::from("= Installation\n\n");
    for i in 0..sections {
        let value = VALUES[i % VALUES.len()];
        doc.push_str(&format!("== Step {i}\n\n"));
        doc.push_str(&format!("This step applies to\nifdef::{value}[]\n{value} hosts\nendif::[]\nonly.\n\n"));
        doc.push_str(&format!(
            "ifdef::{value}[]\n.Command\n[source,bash]\n----\nrun --step {i}\n----\nendif::[]\n\n"
        ));
        doc.push_str("* Common item\n");
        doc.push_str(&format!("ifndef::{value}[]\n* Other platforms\nendif::[]\n"));
        doc.push_str("* Last item\n+\nWith continuation.\n\n");
    }
    doc
}

fn bench_parse(c: &mut Criterion) {
    let text = generate_document(20);
    let lines: Vec<&str> = text.lines().collect();

    c.bench_function("parse_20_sections", |b| {
        b.iter(|| parse(&lines));
    });
}

fn bench_classify(c: &mut Criterion) {
    let text = generate_document(20);
    let lines: Vec<&str> = text.lines().collect();
    let parsed = parse(&lines).unwrap();
    let values = values();

    c.bench_function("classify_20_sections", |b| {
        b.iter(|| classify(&parsed.document, &values));
    });
}

fn bench_process_varying_sizes(c: &mut Criterion) {
    let preprocessor = Preprocessor::new(values(), RoleFormat::new(Some("platform".to_owned())));
    let mut group = c.benchmark_group("process_by_size");

    for sections in [5, 50, 200] {
        let text = generate_document(sections);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("sections", sections), &text, |b, text| {
            b.iter(|| preprocessor.process_str(text));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_classify, bench_process_varying_sizes);
criterion_main!(benches);
