use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use edge_router::data_plane::correlation::CorrelationTable;
use edge_router::envelope::{GROUP_USER, OP_RESPONSE, SOURCE_ROUTER};
use edge_router::routing::path_matcher::{self, PathTemplate};
use edge_router::{Envelope, Route};
use std::sync::Arc;
use tokio::runtime::Builder;

const TEMPLATE_ROWS: usize = 256;
const CORRELATION_BATCH_OPS: usize = 64;

fn templates(rows: usize) -> Vec<PathTemplate> {
    (0..rows)
        .map(|row| {
            let template = if row % 2 == 0 {
                format!("/{{node_name}}/default/svc{row}/items")
            } else {
                format!("/{{node_name}}/default/svc{row}")
            };
            PathTemplate::compile(&template).expect("benchmark template should compile")
        })
        .collect()
}

fn reply(id: &str) -> Envelope {
    Envelope::new(Route::new(SOURCE_ROUTER, GROUP_USER, "node/n", OP_RESPONSE))
        .parent_id(id)
        .bytes("ok")
        .build()
}

fn router_criterion(c: &mut Criterion) {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("benchmark runtime should build");

    let rows = templates(TEMPLATE_ROWS);
    let mut path_selection_group = c.benchmark_group("path_selection");
    path_selection_group.bench_function("exact_literal", |b| {
        b.iter(|| {
            let chosen = path_matcher::select(&rows, "/edge-1/default/svc128/items");
            black_box(chosen.map(PathTemplate::as_str));
        });
    });
    path_selection_group.bench_function("short_template", |b| {
        b.iter(|| {
            let chosen = path_matcher::select(&rows, "/edge-7/default/svc129");
            black_box(chosen.map(PathTemplate::as_str));
        });
    });
    path_selection_group.bench_function("no_match", |b| {
        b.iter(|| {
            let chosen = path_matcher::select(&rows, "/edge-1/other/svc1");
            black_box(chosen.is_none());
        });
    });
    path_selection_group.finish();

    let mut correlation_group = c.benchmark_group("correlation");
    correlation_group.bench_function("register_complete", |b| {
        b.iter_batched(
            || Arc::new(CorrelationTable::new()),
            |table| {
                for op in 0..CORRELATION_BATCH_OPS {
                    let id = format!("msg-{op}");
                    let mut pending = table.register(id.as_str());
                    let delivered = table.complete(&id, reply(&id));
                    assert!(delivered, "reply should reach its registered waiter");
                    let envelope = runtime.block_on(pending.recv());
                    black_box(envelope.is_ok());
                }
                assert!(table.is_empty(), "completed entries should be removed");
            },
            BatchSize::SmallInput,
        );
    });
    correlation_group.bench_function("register_abandon", |b| {
        b.iter_batched(
            || Arc::new(CorrelationTable::new()),
            |table| {
                for op in 0..CORRELATION_BATCH_OPS {
                    let pending = table.register(format!("msg-{op}"));
                    drop(pending);
                }
                assert!(table.is_empty(), "dropped waiters should release entries");
            },
            BatchSize::SmallInput,
        );
    });
    correlation_group.finish();
}

criterion_group!(benches, router_criterion);
criterion_main!(benches);
