use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use qnasnap_core::{extract_heading, final_repair, rewrite_protocol_relative_links, slugify};
use scraper::Html;

fn bench_rewrite_links(c: &mut Criterion) {
    let page = std::fs::read_to_string("../../tests/fixtures/question_page.html").unwrap();
    let large = page.repeat(200);

    let mut group = c.benchmark_group("rewrite_links");

    group.bench_with_input(BenchmarkId::new("page", "1x"), &page, |b, html| {
        b.iter(|| rewrite_protocol_relative_links(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("page", "200x"), &large, |b, html| {
        b.iter(|| rewrite_protocol_relative_links(black_box(html)))
    });

    group.finish();
}

fn bench_final_repair(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/solution_page.html").unwrap();

    c.bench_function("final_repair", |b| b.iter(|| final_repair(black_box(&html))));
}

fn bench_heading(c: &mut Criterion) {
    let html = std::fs::read_to_string("../../tests/fixtures/question_page.html").unwrap();

    c.bench_function("extract_heading", |b| {
        b.iter(|| extract_heading(&Html::parse_document(black_box(&html))))
    });
}

fn bench_slugify(c: &mut Criterion) {
    c.bench_function("slugify", |b| {
        b.iter(|| slugify(black_box("Crème Brûlée: Intro to Linear Algebra! -- Chapter 2.1, Problem 5E")))
    });
}

criterion_group!(benches, bench_rewrite_links, bench_final_repair, bench_heading, bench_slugify);
criterion_main!(benches);
