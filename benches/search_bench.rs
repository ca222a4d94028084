use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recollect_core::embedder::cosine_similarity;
use recollect_core::model::{FactType, MemoryUnit};
use recollect_core::retrieval::reciprocal_rank_fusion;
use recollect_core::store::{sanitize_fts5_query, Store};

fn bench_cosine_similarity(c: &mut Criterion) {
    let a: Vec<f32> = (0..384).map(|i| (i as f32).sin()).collect();
    let b: Vec<f32> = (0..384).map(|i| (i as f32).cos()).collect();
    c.bench_function("cosine_similarity_384d", |bencher| {
        bencher.iter(|| black_box(cosine_similarity(&a, &b)));
    });
}

fn bench_rrf_fusion(c: &mut Criterion) {
    let lists: Vec<Vec<String>> = (0..4)
        .map(|path| (0..100).map(|i| format!("unit-{}", (i + path * 7) % 150)).collect())
        .collect();
    c.bench_function("rrf_fusion_4x100", |bencher| {
        bencher.iter(|| black_box(reciprocal_rank_fusion(&lists, 60.0)));
    });
}

fn bench_sanitize_fts5_query(c: &mut Criterion) {
    c.bench_function("sanitize_fts5_query", |bencher| {
        bencher.iter(|| black_box(sanitize_fts5_query("hiking \"Yosemite\" OR -weather AND camping")));
    });
}

fn bench_bm25_search(c: &mut Criterion) {
    let store = Store::open_in_memory().unwrap();
    for i in 0..500 {
        let unit = MemoryUnit::new("agent-1", format!("Alice went hiking near Yosemite on trip {i}"), FactType::World, Utc::now());
        store.insert_unit(&unit).unwrap();
    }
    c.bench_function("bm25_search_500_units", |bencher| {
        bencher.iter(|| black_box(store.bm25_search("agent-1", None, "hiking Yosemite", 20).unwrap()));
    });
}

criterion_group!(benches, bench_cosine_similarity, bench_rrf_fusion, bench_sanitize_fts5_query, bench_bm25_search);
criterion_main!(benches);
