use criterion::{Criterion, criterion_group, criterion_main};
use mindmap_bench::util::synthetic_document;
use mindmap_core::{Adjacency, GraphMode, NodeId, reachable_within, search_matches};
use mindmap_graph::emphasis::compute;
use mindmap_graph::{EmphasisConfig, EmphasisInput};
use std::hint::black_box;

fn bench_local_neighborhood(c: &mut Criterion) {
    let document = synthetic_document(40, 25);
    let focus = NodeId::new("s3t10");

    c.bench_function("reachable_within_depth_2_1000_nodes", |b| {
        b.iter(|| black_box(reachable_within(&document.edges, &focus, 2)))
    });

    let adjacency = Adjacency::from_edges(&document.edges);
    c.bench_function("prebuilt_adjacency_depth_3", |b| {
        b.iter(|| black_box(adjacency.within(&focus, 3)))
    });
}

fn bench_search(c: &mut Criterion) {
    let document = synthetic_document(40, 25);

    c.bench_function("search_1000_labels", |b| {
        b.iter(|| black_box(search_matches(&document.nodes, black_box("topic 1"))))
    });
}

fn bench_emphasis(c: &mut Criterion) {
    let document = synthetic_document(40, 25);
    let selected = NodeId::new("s5");
    let config = EmphasisConfig::default();

    c.bench_function("emphasis_selection_1000_nodes", |b| {
        b.iter(|| {
            let emphasis = compute(
                EmphasisInput {
                    nodes: &document.nodes,
                    edges: &document.edges,
                    selected: Some(&selected),
                    mode: &GraphMode::Global,
                    search: None,
                },
                &config,
            );
            black_box(emphasis);
        })
    });
}

criterion_group!(benches, bench_local_neighborhood, bench_search, bench_emphasis);
criterion_main!(benches);
