use criterion::{criterion_group, criterion_main, Criterion};
use mailprovider_core::{Category, Classifier, DomainIndex, Snapshot};

fn classifier() -> Classifier {
    let free = DomainIndex::from_entries(
        Category::Free,
        (0..10_000).map(|i| (format!("provider{i}.com"), i % 50 + 1)).chain([("gmail.com".to_string(), 500)]),
    );
    let disposable = DomainIndex::from_entries(
        Category::Disposable,
        (0..10_000).map(|i| (format!("trash{i}.net"), i % 20 + 1)).chain([("mailinator.com".to_string(), 80)]),
    );
    Classifier::from_snapshot(Snapshot::new(free, disposable))
}

fn bench_check(c: &mut Criterion) {
    let classifier = classifier();
    c.bench_function("check_subdomain", |b| b.iter(|| classifier.check("user@a.b.mail.gmail.com", false)));
    c.bench_function("check_summarize", |b| b.iter(|| classifier.check("user@x.trash42.net", true)));
}

criterion_group!(benches, bench_check);
criterion_main!(benches);
