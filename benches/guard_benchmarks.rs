use criterion::{Criterion, criterion_group, criterion_main};
use rampart::prelude::*;
use std::hint::black_box;
use std::time::Duration;

fn submission(fields: &TokenFields) -> HttpRequest {
    HttpRequest::new("POST", "/items")
        .with_form(&fields.pairs())
        .unwrap()
}

fn bench_token_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf_generate");

    let mut guard = TokenGuard::new(GuardConfig::new("csrf").with_storage_limit(200)).unwrap();
    group.bench_function("memory_bounded", |b| {
        b.iter(|| black_box(guard.generate_token().unwrap()))
    });

    let session = SessionHandle::new(Session::new("bench", Duration::from_secs(3600)));
    let mut guard =
        TokenGuard::with_session(GuardConfig::new("csrf").with_storage_limit(50), session)
            .unwrap();
    group.bench_function("session_bounded", |b| {
        b.iter(|| black_box(guard.generate_token().unwrap()))
    });

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("csrf_validate");

    let mut guard = TokenGuard::new(GuardConfig::new("csrf").persistent()).unwrap();
    let request = submission(&guard.get_token().unwrap());
    group.bench_function("persistent_accept", |b| {
        b.iter(|| black_box(guard.validate(black_box(&request)).unwrap()))
    });

    let mut guard = TokenGuard::new(GuardConfig::new("csrf")).unwrap();
    group.bench_function("single_use_issue_and_accept", |b| {
        b.iter(|| {
            let request = submission(&guard.generate_token().unwrap());
            black_box(guard.validate(&request).unwrap())
        })
    });

    let forged = HttpRequest::new("POST", "/items")
        .with_form(&[("csrf_name", "csrf-forged"), ("csrf_value", "00")])
        .unwrap();
    group.bench_function("reject_forged", |b| {
        b.iter(|| black_box(guard.validate(black_box(&forged)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_token_generation, bench_validation);
criterion_main!(benches);
