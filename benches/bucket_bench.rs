use criterion::{criterion_group, criterion_main, Criterion};
use paramhunt_rs::analyzer;
use paramhunt_rs::canary::Canary;
use paramhunt_rs::request::BaselineResponse;
use paramhunt_rs::surface::SurfaceTag;

fn sample_baseline(tags: usize) -> BaselineResponse {
    let body = "<html><body>".to_string() + &"<div>x</div>".repeat(tags) + "</body></html>";
    BaselineResponse {
        status: 200,
        headers: vec![("content-type".to_string(), "text/html".to_string())],
        content_type: Some("text/html".to_string()),
        content_length: Some(body.len() as u64),
        body,
    }
}

fn bench_html_tag_count(c: &mut Criterion) {
    let baseline = sample_baseline(200);
    c.bench_function("html_tag_count", |b| b.iter(|| baseline.html_tag_count()));
}

fn bench_analyzer_identical_responses(c: &mut Criterion) {
    let baseline = sample_baseline(50);
    let canary = Canary::generate();
    let probe = paramhunt_rs::executor::ExecutedResponse {
        status: baseline.status,
        headers: baseline.headers.clone(),
        content_type: baseline.content_type.clone(),
        content_length: baseline.content_length,
        body: baseline.body.clone(),
        elapsed: std::time::Duration::from_millis(5),
    };
    let baseline_tag_count = baseline.html_tag_count();
    c.bench_function("analyzer_identical_responses", |b| {
        b.iter(|| analyzer::analyze(&baseline, baseline_tag_count, &probe, &canary, SurfaceTag::Url))
    });
}

criterion_group!(benches, bench_html_tag_count, bench_analyzer_identical_responses);
criterion_main!(benches);
